//! Channel manager — owns every channel and merges their inbound streams.

use std::collections::HashMap;

use futures::stream;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// Registry of active channels, keyed by name.
pub struct ChannelManager {
    channels: HashMap<String, Box<dyn Channel>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
        }
    }

    /// Register a channel. A later channel with the same name replaces the
    /// earlier one.
    pub fn add(&mut self, channel: Box<dyn Channel>) {
        let name = channel.name().to_string();
        tracing::debug!(channel = %name, "Channel registered");
        self.channels.insert(name, channel);
    }

    /// Start every channel and merge their streams into one.
    ///
    /// A channel that fails to start is logged and skipped. Fails only when
    /// nothing started.
    pub async fn start_all(&self) -> Result<MessageStream, ChannelError> {
        let mut streams = Vec::with_capacity(self.channels.len());

        for (name, channel) in &self.channels {
            match channel.start().await {
                Ok(stream) => {
                    tracing::info!(channel = %name, "Channel started");
                    streams.push(stream);
                }
                Err(e) => tracing::error!(channel = %name, error = %e, "Channel failed to start"),
            }
        }

        if streams.is_empty() {
            return Err(ChannelError::StartupFailed {
                name: "all".to_string(),
                reason: "no channel started".to_string(),
            });
        }

        Ok(Box::pin(stream::select_all(streams)))
    }

    /// Send a reply on the channel the message arrived on.
    pub async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let channel = self
            .channels
            .get(&msg.channel)
            .ok_or_else(|| ChannelError::UnknownChannel(msg.channel.clone()))?;
        channel.respond(msg, response).await
    }

    pub async fn health_check_all(&self) -> HashMap<String, Result<(), ChannelError>> {
        let mut results = HashMap::with_capacity(self.channels.len());
        for (name, channel) in &self.channels {
            results.insert(name.clone(), channel.health_check().await);
        }
        results
    }

    pub async fn shutdown_all(&self) {
        for (name, channel) in &self.channels {
            if let Err(e) = channel.shutdown().await {
                tracing::warn!(channel = %name, error = %e, "Channel shutdown failed");
            }
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.channels.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use futures::StreamExt;

    use super::*;

    /// Channel that yields canned messages and records replies.
    struct StubChannel {
        name: &'static str,
        inbound: Vec<&'static str>,
        sent: Arc<Mutex<Vec<String>>>,
        fail_start: bool,
    }

    impl StubChannel {
        fn new(name: &'static str, inbound: Vec<&'static str>) -> Self {
            Self {
                name,
                inbound,
                sent: Arc::new(Mutex::new(Vec::new())),
                fail_start: false,
            }
        }
    }

    #[async_trait]
    impl Channel for StubChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn start(&self) -> Result<MessageStream, ChannelError> {
            if self.fail_start {
                return Err(ChannelError::StartupFailed {
                    name: self.name.into(),
                    reason: "stub".into(),
                });
            }
            let name = self.name;
            let msgs: Vec<_> = self
                .inbound
                .iter()
                .map(|text| IncomingMessage::new(name, "u", text))
                .collect();
            Ok(Box::pin(stream::iter(msgs)))
        }

        async fn respond(
            &self,
            _msg: &IncomingMessage,
            response: OutgoingResponse,
        ) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(response.content);
            Ok(())
        }

        async fn health_check(&self) -> Result<(), ChannelError> {
            Ok(())
        }

        async fn shutdown(&self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn start_all_merges_streams() {
        let mut manager = ChannelManager::new();
        manager.add(Box::new(StubChannel::new("a", vec!["one", "two"])));
        manager.add(Box::new(StubChannel::new("b", vec!["three"])));

        let stream = manager.start_all().await.unwrap();
        let mut contents: Vec<_> = stream.map(|m| m.content).collect().await;
        contents.sort();
        assert_eq!(contents, vec!["one", "three", "two"]);
    }

    #[tokio::test]
    async fn start_all_skips_failed_channel() {
        let mut manager = ChannelManager::new();
        let mut broken = StubChannel::new("broken", vec![]);
        broken.fail_start = true;
        manager.add(Box::new(broken));
        manager.add(Box::new(StubChannel::new("ok", vec!["hi"])));

        let stream = manager.start_all().await.unwrap();
        let got: Vec<_> = stream.collect().await;
        assert_eq!(got.len(), 1);
    }

    #[tokio::test]
    async fn start_all_fails_when_nothing_starts() {
        let mut manager = ChannelManager::new();
        let mut broken = StubChannel::new("broken", vec![]);
        broken.fail_start = true;
        manager.add(Box::new(broken));
        assert!(manager.start_all().await.is_err());
    }

    #[tokio::test]
    async fn respond_routes_by_channel_name() {
        let mut manager = ChannelManager::new();
        let a = StubChannel::new("a", vec![]);
        let b = StubChannel::new("b", vec![]);
        let (a_sent, b_sent) = (Arc::clone(&a.sent), Arc::clone(&b.sent));
        manager.add(Box::new(a));
        manager.add(Box::new(b));

        let msg = IncomingMessage::new("b", "u", "hi");
        manager
            .respond(&msg, OutgoingResponse::text("hello"))
            .await
            .unwrap();
        assert!(a_sent.lock().unwrap().is_empty());
        assert_eq!(*b_sent.lock().unwrap(), vec!["hello".to_string()]);

        let msg = IncomingMessage::new("missing", "u", "hi");
        let err = manager
            .respond(&msg, OutgoingResponse::text("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::UnknownChannel(name) if name == "missing"));
    }

    #[tokio::test]
    async fn health_and_names() {
        let mut manager = ChannelManager::new();
        manager.add(Box::new(StubChannel::new("b", vec![])));
        manager.add(Box::new(StubChannel::new("a", vec![])));
        assert_eq!(manager.names(), vec!["a", "b"]);
        let health = manager.health_check_all().await;
        assert!(health.values().all(|r| r.is_ok()));
        manager.shutdown_all().await;
    }
}
