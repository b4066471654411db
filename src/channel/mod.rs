//! Message channel carrying invalidation events between mutating code and
//! the cache subscribers.
//!
//! A channel handle is built once at startup, shared through `Arc` by every
//! publisher and subscriber, and torn down on shutdown. Nothing here is global.

mod hub;
pub mod redis;

pub use hub::ChannelHub;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::model::EntityType;

pub const ESTATE_TOPIC: &str = "estate-updated";
pub const RESERVATION_TOPIC: &str = "reservation-updated";

pub fn topic_for(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Estate => ESTATE_TOPIC,
        EntityType::Reservation => RESERVATION_TOPIC,
    }
}

pub fn entity_for_topic(topic: &str) -> Option<EntityType> {
    match topic {
        ESTATE_TOPIC => Some(EntityType::Estate),
        RESERVATION_TOPIC => Some(EntityType::Reservation),
        _ => None,
    }
}

/// Payloads delivered on one topic. Ends when the transport drops the subscription.
pub type Subscription = BoxStream<'static, String>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,
    #[error("channel connection error: {0}")]
    Connection(String),
    #[error("channel publish error: {0}")]
    Publish(String),
    #[error("channel subscribe error: {0}")]
    Subscribe(String),
}

#[async_trait]
pub trait Channel: Send + Sync {
    /// Resolves once the transport has accepted the message, not when it is consumed.
    async fn publish(&self, topic: &str, payload: String) -> Result<(), ChannelError>;

    async fn subscribe(&self, topic: &str) -> Result<Subscription, ChannelError>;
}
