use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use super::{Channel, ChannelError, Subscription};

const CHANNEL_CAPACITY: usize = 256;

/// In-process broadcast hub, one channel per topic.
pub struct ChannelHub {
    topics: DashMap<String, broadcast::Sender<String>>,
    closed: AtomicBool,
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelHub {
    pub fn new() -> Self {
        Self {
            topics: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Tear down: every open subscription ends and later calls fail with `Closed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.topics.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map_or(0, |sender| sender.receiver_count())
    }
}

fn into_subscription(topic: String, rx: broadcast::Receiver<String>) -> Subscription {
    Box::pin(stream::unfold((topic, rx), |(topic, mut rx)| async move {
        loop {
            match rx.recv().await {
                Ok(payload) => return Some((payload, (topic, rx))),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(topic = %topic, skipped, "subscriber lagged, messages dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }))
}

#[async_trait]
impl Channel for ChannelHub {
    /// No-op if nobody is listening.
    async fn publish(&self, topic: &str, payload: String) -> Result<(), ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        if let Some(sender) = self.topics.get(topic) {
            let _ = sender.send(payload);
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        let rx = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe();
        Ok(into_subscription(topic.to_string(), rx))
    }
}
