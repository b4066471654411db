use std::net::SocketAddr;

use crate::model::{Category, EntityType};

// ── Availability ────────────────────────────────────────────────

/// Counter: availability checks. Labels: result (bookable, unavailable, invalid).
pub const AVAILABILITY_CHECKS_TOTAL: &str = "staywatch_availability_checks_total";

/// Counter: engine mutations. Labels: mutation, status.
pub const MUTATIONS_TOTAL: &str = "staywatch_mutations_total";

// ── Invalidation ────────────────────────────────────────────────

/// Counter: invalidation events handed to the channel. Labels: topic, status.
pub const INVALIDATIONS_PUBLISHED_TOTAL: &str = "staywatch_invalidations_published_total";

/// Counter: cache keys evicted by subscribers. Labels: topic.
pub const KEYS_EVICTED_TOTAL: &str = "staywatch_keys_evicted_total";

/// Counter: eviction sweeps that failed. Labels: topic.
pub const EVICTION_FAILURES_TOTAL: &str = "staywatch_eviction_failures_total";

/// Counter: invalidation payloads that could not be decoded. Labels: topic.
pub const MALFORMED_PAYLOADS_TOTAL: &str = "staywatch_malformed_payloads_total";

/// Gauge: subscribers currently in the ACTIVE state.
pub const SUBSCRIBERS_ACTIVE: &str = "staywatch_subscribers_active";

// ── Cache ───────────────────────────────────────────────────────

/// Counter: read-through hits. Labels: partition.
pub const CACHE_HITS_TOTAL: &str = "staywatch_cache_hits_total";

/// Counter: read-through misses (including cache errors). Labels: partition.
pub const CACHE_MISSES_TOTAL: &str = "staywatch_cache_misses_total";

/// Counter: reservations removed by the retention sweeper.
pub const RESERVATIONS_SWEPT_TOTAL: &str = "staywatch_reservations_swept_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Partition label for cache metrics.
pub fn partition_label(entity_type: EntityType, category: Category) -> &'static str {
    crate::cache::partition::prefix(entity_type, category)
}
