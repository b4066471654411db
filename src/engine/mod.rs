mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;

pub use availability::{
    classify, classify_cells, first_conflict, is_range_bookable, overlaps, validate_candidate,
};
pub use error::EngineError;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use ulid::Ulid;

use crate::invalidation::InvalidationPublisher;
use crate::model::*;
use crate::observability::MUTATIONS_TOTAL;

pub type SharedListingState = Arc<RwLock<ListingState>>;

/// Live blocked-interval data per listing, and the mutation entry points that
/// keep the listing cache coherent.
///
/// Every successful mutation publishes exactly one invalidation event after
/// its state change is applied. A failed publish is logged and counted; the
/// mutation still succeeds.
pub struct Engine {
    pub(super) listings: DashMap<Ulid, SharedListingState>,
    /// Reverse lookup: interval (lock/reservation) id → listing id
    pub(super) interval_to_listing: DashMap<Ulid, Ulid>,
    publisher: InvalidationPublisher,
}

impl Engine {
    pub fn new(publisher: InvalidationPublisher) -> Self {
        Self {
            listings: DashMap::new(),
            interval_to_listing: DashMap::new(),
            publisher,
        }
    }

    pub fn get_listing(&self, id: &Ulid) -> Option<SharedListingState> {
        self.listings.get(id).map(|e| e.value().clone())
    }

    pub fn get_listing_for_interval(&self, interval_id: &Ulid) -> Option<Ulid> {
        self.interval_to_listing.get(interval_id).map(|e| *e.value())
    }

    pub(super) fn require_listing(&self, id: &Ulid) -> Result<SharedListingState, EngineError> {
        self.get_listing(id).ok_or(EngineError::NotFound(*id))
    }

    /// Lookup interval → listing, get listing, acquire write lock.
    pub(super) async fn resolve_interval_write(
        &self,
        interval_id: &Ulid,
    ) -> Result<(Ulid, OwnedRwLockWriteGuard<ListingState>), EngineError> {
        let listing_id = self
            .get_listing_for_interval(interval_id)
            .ok_or(EngineError::NotFound(*interval_id))?;
        let ls = self.require_listing(&listing_id)?;
        let guard = ls.write_owned().await;
        Ok((listing_id, guard))
    }

    /// Publish after commit. Never fails the caller.
    pub(super) async fn invalidate(&self, entity_type: EntityType, category: Category) {
        if let Err(e) = self.publisher.publish(entity_type, category).await {
            tracing::warn!(
                entity_type = ?entity_type,
                category = category.as_str(),
                error = %e,
                "mutation committed but cache invalidation was not published"
            );
        }
    }
}

pub(super) fn record_mutation<T>(mutation: &'static str, result: &Result<T, EngineError>) {
    let status = if result.is_ok() { "ok" } else { "error" };
    metrics::counter!(MUTATIONS_TOTAL, "mutation" => mutation, "status" => status).increment(1);
}
