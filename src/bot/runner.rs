//! Main loop — pulls messages off every channel and runs bot turns.
//!
//! Each conversation gets its own worker task fed by a queue, so turns for
//! one conversation run in arrival order while different conversations run
//! concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::handler::ElectionBot;
use crate::channels::{ChannelManager, IncomingMessage, OutgoingResponse};
use crate::error::Error;

pub const RESTARTED: &str = "Conversation cleared. Say anything to start again.";
pub const TURN_FAILED: &str = "Sorry, something went wrong. Say anything to start again.";

/// How long a conversation worker waits for input before exiting.
const WORKER_IDLE: Duration = Duration::from_secs(300);

/// What an inbound message asks the runner to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stop the process. Only honoured on the CLI.
    Quit,
    /// Forget the conversation.
    Restart,
    /// A normal dialog turn.
    Say(String),
}

impl Command {
    pub fn parse(msg: &IncomingMessage) -> Self {
        let content = msg.content.trim();
        match content.to_lowercase().as_str() {
            "/quit" | "/exit" if msg.channel == "cli" => Command::Quit,
            "/restart" | "/reset" => Command::Restart,
            _ => Command::Say(content.to_string()),
        }
    }
}

/// Work queued for one conversation.
enum Job {
    Turn { message: IncomingMessage, text: String },
    Restart(IncomingMessage),
}

struct Worker {
    tx: mpsc::UnboundedSender<Job>,
    handle: JoinHandle<()>,
}

/// Drives the bot from the channels until Ctrl+C, `/quit`, or every
/// stream ends.
pub struct BotRunner {
    bot: Arc<ElectionBot>,
    channels: Arc<ChannelManager>,
    workers: HashMap<String, Worker>,
}

impl BotRunner {
    pub fn new(bot: Arc<ElectionBot>, channels: Arc<ChannelManager>) -> Self {
        Self {
            bot,
            channels,
            workers: HashMap::new(),
        }
    }

    pub async fn run(mut self) -> Result<(), Error> {
        let mut message_stream = self.channels.start_all().await?;

        for (name, health) in self.channels.health_check_all().await {
            if let Err(e) = health {
                tracing::warn!(channel = %name, error = %e, "Channel unhealthy after start");
            }
        }

        tracing::info!("BotWise ready and listening");

        let mut interrupted = false;
        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    interrupted = true;
                    break;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("All channel streams ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            let key = message.conversation_key();
            match Command::parse(&message) {
                Command::Quit => {
                    tracing::info!("Quit command received, exiting...");
                    break;
                }
                Command::Restart => self.enqueue(key, Job::Restart(message)),
                Command::Say(text) => self.enqueue(key, Job::Turn { message, text }),
            }
        }

        self.stop_workers(interrupted).await;
        self.channels.shutdown_all().await;
        Ok(())
    }

    /// Queue a job behind everything already queued for its conversation.
    fn enqueue(&mut self, key: String, job: Job) {
        let job = match self.workers.get(&key) {
            Some(worker) => match worker.tx.send(job) {
                Ok(()) => return,
                // The worker went idle and stopped taking jobs.
                Err(mpsc::error::SendError(job)) => job,
            },
            None => job,
        };

        let previous = self.workers.remove(&key).map(|w| w.handle);
        self.workers.retain(|_, w| !w.handle.is_finished());

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(conversation_worker(
            Arc::clone(&self.bot),
            Arc::clone(&self.channels),
            key.clone(),
            rx,
            previous,
        ));
        if tx.send(job).is_err() {
            tracing::warn!(conversation_id = %key, "Conversation worker exited before its first job");
        }
        self.workers.insert(key, Worker { tx, handle });
    }

    /// Let workers finish what is queued, or cancel them on interrupt.
    async fn stop_workers(&mut self, interrupted: bool) {
        for (key, worker) in self.workers.drain() {
            drop(worker.tx);
            if interrupted {
                worker.handle.abort();
            }
            match worker.handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => tracing::error!(conversation_id = %key, error = %e, "Conversation worker panicked"),
            }
        }
    }
}

/// Runs one conversation's jobs in order until its queue closes or it sits
/// idle for [`WORKER_IDLE`].
async fn conversation_worker(
    bot: Arc<ElectionBot>,
    channels: Arc<ChannelManager>,
    key: String,
    mut rx: mpsc::UnboundedReceiver<Job>,
    previous: Option<JoinHandle<()>>,
) {
    // The worker this one replaces may still be draining.
    if let Some(previous) = previous {
        if let Err(e) = previous.await {
            tracing::warn!(conversation_id = %key, error = %e, "Previous conversation worker failed");
        }
    }

    loop {
        match tokio::time::timeout(WORKER_IDLE, rx.recv()).await {
            Ok(Some(job)) => run_job(&bot, &channels, &key, job).await,
            Ok(None) => break,
            Err(_) => {
                rx.close();
                while let Ok(job) = rx.try_recv() {
                    run_job(&bot, &channels, &key, job).await;
                }
                break;
            }
        }
    }
    tracing::debug!(conversation_id = %key, "Conversation worker stopped");
}

async fn run_job(bot: &ElectionBot, channels: &ChannelManager, key: &str, job: Job) {
    match job {
        Job::Turn { message, text } => handle_turn(bot, channels, key, &message, &text).await,
        Job::Restart(message) => match bot.reset(key).await {
            Ok(_) => reply(channels, &message, OutgoingResponse::text(RESTARTED)).await,
            Err(e) => tracing::error!(conversation_id = %key, error = %e, "Reset failed"),
        },
    }
}

/// Run one turn and deliver its messages as they come due.
async fn handle_turn(
    bot: &ElectionBot,
    channels: &ChannelManager,
    key: &str,
    message: &IncomingMessage,
    text: &str,
) {
    tracing::debug!(conversation_id = %key, channel = %message.channel, "Turn received");

    let result = bot
        .on_turn_deliver(key, text, move |out| async move {
            let response = if out.expects_input {
                OutgoingResponse::prompt(out.text)
            } else {
                OutgoingResponse::text(out.text)
            };
            reply(channels, message, response).await;
        })
        .await;

    if let Err(e) = result {
        tracing::error!(conversation_id = %key, error = %e, "Error handling message");
        reply(channels, message, OutgoingResponse::text(TURN_FAILED)).await;
    }
}

async fn reply(channels: &ChannelManager, msg: &IncomingMessage, response: OutgoingResponse) {
    if let Err(e) = channels.respond(msg, response).await {
        tracing::warn!(channel = %msg.channel, error = %e, "Failed to send response");
    }
}
