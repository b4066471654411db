//! Read-through views of engine state, served from the partitioned cache.
//!
//! Nothing here decides bookability; availability always reads live engine
//! state. These views go stale only until the next invalidation event for
//! their partition is handled.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::cache::{partition, CacheStore};
use crate::engine::{Engine, EngineError};
use crate::model::{Category, EntityType, ListingInfo, ReservationInfo};
use crate::observability::{partition_label, CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL};

pub struct Catalog {
    engine: Arc<Engine>,
    cache: Arc<dyn CacheStore>,
    ttl: Option<Duration>,
}

impl Catalog {
    pub fn new(engine: Arc<Engine>, cache: Arc<dyn CacheStore>, ttl: Option<Duration>) -> Self {
        Self { engine, cache, ttl }
    }

    pub async fn listings(&self, category: Category) -> Vec<ListingInfo> {
        let key = partition::key(EntityType::Estate, category, "listings");
        let loaded: Result<_, EngineError> = self
            .read_through(EntityType::Estate, category, &key, || async {
                Ok(self.engine.list_listings(Some(category)).await)
            })
            .await;
        loaded.unwrap_or_default()
    }

    pub async fn listing(&self, category: Category, id: Ulid) -> Option<ListingInfo> {
        let key = partition::key(EntityType::Estate, category, &format!("listing:{id}"));
        self.read_through(EntityType::Estate, category, &key, || async {
            self.engine
                .get_listing_info(id)
                .await
                .filter(|l| l.category == category)
                .ok_or(EngineError::NotFound(id))
        })
        .await
        .ok()
    }

    pub async fn reservations(
        &self,
        category: Category,
        listing_id: Ulid,
    ) -> Result<Vec<ReservationInfo>, EngineError> {
        let key = partition::key(EntityType::Reservation, category, &listing_id.to_string());
        self.read_through(EntityType::Reservation, category, &key, || async {
            match self.engine.get_listing_info(listing_id).await {
                Some(info) if info.category == category => {
                    self.engine.get_reservations(listing_id).await
                }
                _ => Err(EngineError::NotFound(listing_id)),
            }
        })
        .await
    }

    /// Serve `key` from the cache, or load it from the engine and populate.
    /// Cache failures degrade to a load; load failures are never cached.
    async fn read_through<T, F, Fut>(
        &self,
        entity_type: EntityType,
        category: Category,
        key: &str,
        load: F,
    ) -> Result<T, EngineError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let label = partition_label(entity_type, category);
        match self.cache.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    metrics::counter!(CACHE_HITS_TOTAL, "partition" => label).increment(1);
                    return Ok(value);
                }
                Err(e) => warn!(key, error = %e, "discarding undecodable cache entry"),
            },
            Ok(None) => {}
            Err(e) => warn!(key, error = %e, "cache read failed, loading from engine"),
        }
        metrics::counter!(CACHE_MISSES_TOTAL, "partition" => label).increment(1);

        let value = load().await?;
        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = self.cache.set(key, raw, self.ttl).await {
                    warn!(key, error = %e, "cache populate failed");
                } else {
                    debug!(key, "cache populated");
                }
            }
            Err(e) => warn!(key, error = %e, "cache entry not encodable"),
        }
        Ok(value)
    }
}
