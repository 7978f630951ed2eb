use std::sync::Arc;

use anyhow::Context;

use botwise::bot::{BotRunner, ElectionBot};
use botwise::channels::{ChannelManager, CliChannel, WebChatChannel};
use botwise::config::{BotConfig, RecognizerBackend};
use botwise::dispatch::EntityDispatcher;
use botwise::recognizer::Recognizer;
use botwise::recognizer::keyword::KeywordRecognizer;
use botwise::recognizer::luis::LuisRecognizer;
use botwise::store::{ConversationStore, LibSqlStore, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env().context("invalid configuration")?;

    eprintln!("🗳️  BotWise v{}", env!("CARGO_PKG_VERSION"));

    // ── Reply tables ────────────────────────────────────────────────────
    let dispatcher = match &config.replies_path {
        Some(path) => {
            eprintln!("   Replies: {}", path.display());
            EntityDispatcher::from_json_file(path)
                .with_context(|| format!("failed to load replies from {}", path.display()))?
        }
        None => {
            eprintln!("   Replies: built-in");
            EntityDispatcher::builtin()
        }
    };
    let dispatcher = Arc::new(dispatcher);

    // ── Recognizer ──────────────────────────────────────────────────────
    let recognizer: Arc<dyn Recognizer> = match &config.recognizer {
        RecognizerBackend::Keyword => Arc::new(KeywordRecognizer::from_dispatcher(&dispatcher)),
        RecognizerBackend::Luis(luis) => {
            eprintln!("   LUIS app: {} ({})", luis.app_id, luis.slot);
            Arc::new(LuisRecognizer::new(luis.clone()))
        }
    };
    eprintln!("   Recognizer: {}", recognizer.name());

    // ── Store ───────────────────────────────────────────────────────────
    let store: Arc<dyn ConversationStore> = match &config.db_path {
        Some(path) => {
            let db = LibSqlStore::new_local(path)
                .await
                .with_context(|| format!("failed to open database at {}", path.display()))?;
            eprintln!("   Database: {}", path.display());
            Arc::new(db)
        }
        None => {
            eprintln!("   Database: in-memory");
            Arc::new(MemoryStore::new())
        }
    };

    let bot = ElectionBot::new(
        Arc::clone(&dispatcher),
        recognizer,
        store,
        config.dialog_settings(),
    )
    .context("failed to build dialogs")?;

    // ── Channels ────────────────────────────────────────────────────────
    let mut channels = ChannelManager::new();
    channels.add(Box::new(CliChannel::new()));

    if let Some(port) = config.ws_port {
        let web_channel = WebChatChannel::new();
        let app = web_channel.router();
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
            .await
            .with_context(|| format!("failed to bind web chat port {port}"))?;
        tokio::spawn(async move {
            tracing::info!(port, "Web chat server started");
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Web chat server stopped");
            }
        });
        channels.add(Box::new(web_channel));
        eprintln!("   Chat WS: ws://0.0.0.0:{port}/ws/chat");
    }

    eprintln!("   Channels: {}", channels.names().join(", "));
    eprintln!("   Say 'wake bot' to begin. /restart to start over, /quit to exit.\n");

    BotRunner::new(Arc::new(bot), Arc::new(channels))
        .run()
        .await?;

    Ok(())
}
