//! Web chat channel — WebSocket chat for the browser front end.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures::stream;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

pub const WEB_USER: &str = "web-user";

/// Distinct conversation ids one socket may open.
pub const MAX_CONVERSATIONS_PER_SOCKET: usize = 64;

// ── JSON Protocol ───────────────────────────────────────────────────────

/// Client → server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientMessage {
    #[serde(rename = "message")]
    Message {
        content: String,
        conversation_id: Option<String>,
    },
}

/// Server → client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ServerMessage {
    #[serde(rename = "response")]
    Response {
        content: String,
        conversation_id: String,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

// ── Shared State ────────────────────────────────────────────────────────

struct WebChatInner {
    /// WS handlers → `Channel::start` stream.
    incoming_tx: mpsc::UnboundedSender<IncomingMessage>,
    /// `Channel::respond` → WS handlers.
    outgoing_tx: broadcast::Sender<ServerMessage>,
}

#[derive(Clone)]
struct WsState {
    inner: Arc<WebChatInner>,
}

// ── WebChatChannel ──────────────────────────────────────────────────────

/// A WebSocket channel serving any number of browser clients.
///
/// - `start()` returns a stream backed by an mpsc receiver that WS handlers
///   feed.
/// - `respond()` broadcasts to every socket; each socket forwards only the
///   responses for conversations it started.
/// - A client that sends no `conversation_id` gets one per connection.
pub struct WebChatChannel {
    inner: Arc<WebChatInner>,
    incoming_rx: Mutex<Option<mpsc::UnboundedReceiver<IncomingMessage>>>,
}

impl WebChatChannel {
    pub fn new() -> Self {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, _) = broadcast::channel(256);

        Self {
            inner: Arc::new(WebChatInner {
                incoming_tx,
                outgoing_tx,
            }),
            incoming_rx: Mutex::new(Some(incoming_rx)),
        }
    }

    /// Router with `/ws/chat` and `/health`.
    pub fn router(&self) -> Router {
        let state = WsState {
            inner: Arc::clone(&self.inner),
        };

        Router::new()
            .route("/ws/chat", get(ws_chat_handler))
            .route("/health", get(health_handler))
            .with_state(state)
    }
}

impl Default for WebChatChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for WebChatChannel {
    fn name(&self) -> &str {
        "web"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let rx = self
            .incoming_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| ChannelError::StartupFailed {
                name: "web".to_string(),
                reason: "start() already called".to_string(),
            })?;

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let conversation_id = msg.conversation_id.clone().ok_or_else(|| {
            ChannelError::SendFailed {
                name: "web".to_string(),
                reason: "message has no conversation id".to_string(),
            }
        })?;
        // No subscribers just means no client is connected right now.
        let _ = self.inner.outgoing_tx.send(ServerMessage::Response {
            content: response.content,
            conversation_id,
        });
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        if self.inner.incoming_tx.is_closed() {
            return Err(ChannelError::SendFailed {
                name: "web".to_string(),
                reason: "incoming stream dropped".to_string(),
            });
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Conversation ids a single socket has opened.
struct OwnedConversations {
    ids: HashSet<String>,
    limit: usize,
}

impl OwnedConversations {
    fn new(limit: usize) -> Self {
        Self {
            ids: HashSet::new(),
            limit,
        }
    }

    /// Record `id` as belonging to this socket. `false` once the limit is
    /// reached and `id` is new.
    fn claim(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return true;
        }
        if self.ids.len() >= self.limit {
            return false;
        }
        self.ids.insert(id.to_string());
        true
    }

    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }
}

// ── HTTP / WebSocket Handlers ───────────────────────────────────────────

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn ws_chat_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_chat_socket(socket, state.inner))
}

async fn handle_chat_socket(mut socket: WebSocket, inner: Arc<WebChatInner>) {
    let default_conversation = Uuid::new_v4().to_string();
    let mut owned = OwnedConversations::new(MAX_CONVERSATIONS_PER_SOCKET);
    info!(conversation_id = %default_conversation, "Web chat client connected");

    let mut outgoing_rx = inner.outgoing_tx.subscribe();

    loop {
        tokio::select! {
            result = outgoing_rx.recv() => {
                match result {
                    Ok(msg) => {
                        if let ServerMessage::Response { conversation_id, .. } = &msg {
                            if !owned.contains(conversation_id) {
                                continue;
                            }
                        }
                        if !send_json(&mut socket, &msg).await {
                            debug!("Web chat client disconnected during send");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "Web chat client lagged behind broadcast");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(text.as_str()) {
                            Ok(ClientMessage::Message { content, conversation_id }) => {
                                let content = content.trim();
                                if content.is_empty() {
                                    continue;
                                }
                                let conversation_id = conversation_id
                                    .filter(|id| !id.trim().is_empty())
                                    .unwrap_or_else(|| default_conversation.clone());
                                if !owned.claim(&conversation_id) {
                                    warn!(conversation_id = %conversation_id, "Web chat client opened too many conversations");
                                    let error = ServerMessage::Error {
                                        message: format!(
                                            "too many conversations on this connection (limit {MAX_CONVERSATIONS_PER_SOCKET})"
                                        ),
                                    };
                                    if !send_json(&mut socket, &error).await {
                                        break;
                                    }
                                    continue;
                                }
                                let msg = IncomingMessage::new("web", WEB_USER, content)
                                    .with_conversation(&conversation_id);
                                if inner.incoming_tx.send(msg).is_err() {
                                    warn!("Web chat incoming channel closed");
                                    break;
                                }
                            }
                            Err(e) => {
                                debug!(error = %e, "Invalid JSON from web chat client");
                                let error = ServerMessage::Error {
                                    message: format!("invalid message: {e}"),
                                };
                                if !send_json(&mut socket, &error).await {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Web chat client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Web chat WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Serialize and send one frame. Returns `false` if the socket is gone.
async fn send_json(socket: &mut WebSocket, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to encode web chat message");
            true
        }
    }
}
