//! Cache coherency: committed mutations publish an [`InvalidationEvent`] and
//! one subscriber per topic evicts the affected cache partitions.
//!
//! ```text
//! mutation commits ─▶ InvalidationPublisher ─▶ channel topic ─▶ InvalidationSubscriber ─▶ cache sweep
//! ```
//!
//! Delivery is at-most-once per subscriber and unordered. Eviction is
//! idempotent, so duplicates and reordering are harmless; a lost event leaves
//! cached listing results stale until the next event for the partition.
//! Availability answers never come from the cache, so staleness cannot
//! produce a double booking.

mod publisher;
mod subscriber;

pub use publisher::{InvalidationPublisher, PublishError};
pub use subscriber::{
    spawn_subscribers, EvictionReport, InvalidationSubscriber, SubscriberOptions, SubscriberSet,
    SubscriberState,
};

use serde::{Deserialize, Serialize};

use crate::model::{Category, EntityType, InvalidationEvent};

/// Wire form of an invalidation event. The entity type is implied by the topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

pub fn encode(event: &InvalidationEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(&InvalidationPayload {
        category: Some(event.category.as_str().to_string()),
    })
}

pub fn decode(entity_type: EntityType, payload: &str) -> Result<InvalidationEvent, serde_json::Error> {
    let payload: InvalidationPayload = serde_json::from_str(payload)?;
    Ok(InvalidationEvent::new(
        entity_type,
        Category::from_discriminator(payload.category.as_deref()),
    ))
}
