use std::sync::Arc;
use std::time::Duration;

use crate::channel::{topic_for, Channel, ChannelError};
use crate::model::{Category, EntityType, InvalidationEvent};
use crate::observability::INVALIDATIONS_PUBLISHED_TOTAL;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to encode invalidation event: {0}")]
    Encode(String),
}

/// Sends invalidation events; never touches the cache itself.
///
/// Failures are returned, not retried. The mutation that triggered the
/// publish has already committed and stays committed.
#[derive(Clone)]
pub struct InvalidationPublisher {
    channel: Arc<dyn Channel>,
    timeout: Duration,
}

impl InvalidationPublisher {
    pub fn new(channel: Arc<dyn Channel>, timeout: Duration) -> Self {
        Self { channel, timeout }
    }

    pub async fn publish(&self, entity_type: EntityType, category: Category) -> Result<(), PublishError> {
        self.publish_event(&InvalidationEvent::new(entity_type, category))
            .await
    }

    pub async fn publish_event(&self, event: &InvalidationEvent) -> Result<(), PublishError> {
        let topic = topic_for(event.entity_type);
        let result = self.send(topic, event).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(INVALIDATIONS_PUBLISHED_TOTAL, "topic" => topic, "status" => status)
            .increment(1);
        match &result {
            Ok(()) => tracing::debug!(
                topic,
                category = event.category.as_str(),
                "published invalidation"
            ),
            Err(e) => tracing::warn!(
                topic,
                category = event.category.as_str(),
                error = %e,
                "failed to publish invalidation"
            ),
        }
        result
    }

    async fn send(&self, topic: &'static str, event: &InvalidationEvent) -> Result<(), PublishError> {
        let payload = super::encode(event).map_err(|e| PublishError::Encode(e.to_string()))?;
        tokio::time::timeout(self.timeout, self.channel.publish(topic, payload))
            .await
            .map_err(|_| PublishError::Timeout(self.timeout))??;
        Ok(())
    }
}
