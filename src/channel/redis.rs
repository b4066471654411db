//! Redis pub/sub transport for multi-instance deployments.

use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Pool, Runtime};
use futures::StreamExt;

use super::{Channel, ChannelError, Subscription};

/// Build the process-wide Redis pool. Shared by [`RedisChannel`] and
/// [`crate::cache::RedisCache`].
pub fn connect_pool(redis_url: &str) -> Result<Pool, ChannelError> {
    deadpool_redis::Config::from_url(redis_url)
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| ChannelError::Connection(e.to_string()))
}

/// Publishes through the pool; each subscription gets its own connection,
/// since a connection in SUBSCRIBE mode cannot serve other commands.
pub struct RedisChannel {
    pool: Pool,
    redis_url: String,
}

impl RedisChannel {
    pub fn new(pool: Pool, redis_url: String) -> Self {
        Self { pool, redis_url }
    }
}

#[async_trait]
impl Channel for RedisChannel {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), ChannelError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| ChannelError::Connection(e.to_string()))?;

        let _: () = conn
            .publish(topic, payload)
            .await
            .map_err(|e| ChannelError::Publish(e.to_string()))?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, ChannelError> {
        let client = deadpool_redis::redis::Client::open(self.redis_url.as_str())
            .map_err(|e| ChannelError::Connection(e.to_string()))?;

        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| ChannelError::Connection(e.to_string()))?;

        pubsub
            .subscribe(topic)
            .await
            .map_err(|e| ChannelError::Subscribe(e.to_string()))?;

        let topic = topic.to_string();
        let stream = pubsub.into_on_message().filter_map(move |msg| {
            let payload = msg.get_payload::<String>();
            let topic = topic.clone();
            async move {
                match payload {
                    Ok(payload) => Some(payload),
                    Err(e) => {
                        tracing::warn!(topic = %topic, error = %e, "unreadable pub/sub payload");
                        None
                    }
                }
            }
        });
        Ok(Box::pin(stream))
    }
}
