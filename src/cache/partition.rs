//! Cache partitions. Every cached key starts with exactly one of:
//! `residential:`, `business:`, `residential-reservation:`, `business-reservation:`.

use crate::model::{Category, EntityType};

pub fn prefix(entity_type: EntityType, category: Category) -> &'static str {
    match (entity_type, category) {
        (EntityType::Estate, Category::Residential) => "residential",
        (EntityType::Estate, Category::Business) => "business",
        (EntityType::Reservation, Category::Residential) => "residential-reservation",
        (EntityType::Reservation, Category::Business) => "business-reservation",
    }
}

/// Glob patterns to clear when an entity of this type and category changes.
pub fn patterns_for(entity_type: EntityType, category: Category) -> Vec<String> {
    vec![format!("{}:*", prefix(entity_type, category))]
}

/// Build a key inside a partition.
pub fn key(entity_type: EntityType, category: Category, suffix: &str) -> String {
    format!("{}:{suffix}", prefix(entity_type, category))
}
