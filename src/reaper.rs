use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::calendar;
use crate::engine::Engine;
use crate::model::Ms;
use crate::observability::RESERVATIONS_SWEPT_TOTAL;

/// Remove every reservation that ended before `cutoff`. Each removal is an
/// ordinary cancellation and publishes its own invalidation.
pub async fn sweep_once(engine: &Engine, cutoff: Ms) -> usize {
    let expired = engine.collect_expired_reservations(cutoff).await;
    let mut swept = 0;
    for (reservation_id, listing_id) in expired {
        match engine.cancel_reservation(reservation_id).await {
            Ok(_) => {
                swept += 1;
                tracing::debug!(%reservation_id, %listing_id, "swept reservation past retention");
            }
            // Cancelled concurrently
            Err(e) => tracing::debug!("sweeper skip {reservation_id}: {e}"),
        }
    }
    metrics::counter!(RESERVATIONS_SWEPT_TOTAL).increment(swept as u64);
    swept
}

/// Background task that periodically drops reservations older than `retention`.
pub async fn run_retention_sweeper(
    engine: Arc<Engine>,
    retention: Duration,
    every: Duration,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(every);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }
        let cutoff = calendar::now_ms() - retention.as_millis() as Ms;
        let swept = sweep_once(&engine, cutoff).await;
        if swept > 0 {
            info!(swept, "retention sweep removed reservations");
        }
    }
}
