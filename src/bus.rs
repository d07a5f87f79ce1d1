//! The message bus interface: topic subscription with at-least-once
//! delivery semantics, and publish. A real bus client (Kafka/NATS/etc.) is
//! out of scope — this module defines the trait boundary plus an
//! in-process test double.

use crate::error::ViewResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// A single delivered message: opaque bytes, expected to be JSON.
#[derive(Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub key: Option<String>,
    pub payload: Vec<u8>,
}

#[async_trait]
pub trait EventBus: Send + Sync {
    /// Subscribe to `topic` under `consumer_group`, returning a receiver of
    /// delivered messages. A message is only actually consumed once the
    /// caller's handler succeeds; on a retryable failure the caller must
    /// call [`EventBus::nack`] instead of silently dropping it.
    async fn subscribe(&self, topic: &str, consumer_group: &str) -> ViewResult<mpsc::Receiver<Message>>;

    /// Publish is part of the interface for symmetry, but the consumer loop
    /// never calls it directly in this implementation — only `nack` does.
    async fn publish(&self, topic: &str, key: Option<&str>, payload: &[u8]) -> ViewResult<()>;

    /// Redeliver a message whose handler failed with a retryable error (a
    /// store version conflict): the delivery was never acknowledged, so the
    /// bus redelivers it rather than advancing past it. The default
    /// implementation re-publishes to the message's own topic.
    async fn nack(&self, message: Message) -> ViewResult<()> {
        self.publish(&message.topic, message.key.as_deref(), &message.payload).await
    }
}

/// An in-process bus backed by `tokio::sync::mpsc`, for tests and for
/// running the whole pipeline without a real broker.
#[derive(Default)]
pub struct InMemoryBus {
    topics: Mutex<std::collections::HashMap<String, mpsc::Sender<Message>>>,
}

impl InMemoryBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Test/demo helper: publish directly without going through a consumer
    /// group, delivering to whichever receiver is currently subscribed.
    pub async fn send(&self, topic: &str, payload: Vec<u8>) -> ViewResult<()> {
        self.publish(topic, None, &payload).await
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn subscribe(&self, topic: &str, _consumer_group: &str) -> ViewResult<mpsc::Receiver<Message>> {
        let (tx, rx) = mpsc::channel(256);
        self.topics.lock().await.insert(topic.to_string(), tx);
        Ok(rx)
    }

    async fn publish(&self, topic: &str, key: Option<&str>, payload: &[u8]) -> ViewResult<()> {
        let sender = self.topics.lock().await.get(topic).cloned();
        if let Some(sender) = sender {
            let _ = sender
                .send(Message { topic: topic.to_string(), key: key.map(|s| s.to_string()), payload: payload.to_vec() })
                .await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_then_publish_delivers_message() {
        let bus = InMemoryBus::new();
        let mut rx = bus.subscribe("widgets", "group-a").await.unwrap();
        bus.send("widgets", b"hello".to_vec()).await.unwrap();
        let message = rx.recv().await.unwrap();
        assert_eq!(message.payload, b"hello");
    }

    #[tokio::test]
    async fn publish_to_unsubscribed_topic_is_a_no_op() {
        let bus = InMemoryBus::new();
        bus.send("nobody-listening", b"hello".to_vec()).await.unwrap();
    }

    #[tokio::test]
    async fn nack_redelivers_to_the_same_topic() {
        let bus = InMemoryBus::new();
        let mut rx = bus.subscribe("widgets", "group-a").await.unwrap();
        let message = Message { topic: "widgets".to_string(), key: None, payload: b"hello".to_vec() };
        bus.nack(message).await.unwrap();
        let redelivered = rx.recv().await.unwrap();
        assert_eq!(redelivered.payload, b"hello");
    }
}
