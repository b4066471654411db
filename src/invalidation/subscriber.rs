use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::cache::{partition, CacheStore};
use crate::channel::{topic_for, Channel};
use crate::model::{EntityType, InvalidationEvent};
use crate::observability::{
    EVICTION_FAILURES_TOTAL, KEYS_EVICTED_TOTAL, MALFORMED_PAYLOADS_TOTAL, SUBSCRIBERS_ACTIVE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    Subscribing,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberOptions {
    /// Bound on a single subscribe attempt.
    pub subscribe_timeout: Duration,
    /// Delay after the first failed attempt; doubles up to `retry_max`.
    pub retry_initial: Duration,
    pub retry_max: Duration,
}

impl Default for SubscriberOptions {
    fn default() -> Self {
        Self {
            subscribe_timeout: Duration::from_secs(2),
            retry_initial: Duration::from_secs(1),
            retry_max: Duration::from_secs(60),
        }
    }
}

/// Outcome of one eviction sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub deleted: usize,
    /// Patterns whose sweep failed. They converge on the next event.
    pub failed_patterns: Vec<String>,
}

/// Long-lived listener for one topic. Runs until cancelled:
/// `SUBSCRIBING` until the channel accepts the subscription, then `ACTIVE`,
/// back to `SUBSCRIBING` whenever the subscription drops.
pub struct InvalidationSubscriber {
    entity_type: EntityType,
    channel: Arc<dyn Channel>,
    cache: Arc<dyn CacheStore>,
    options: SubscriberOptions,
    state: watch::Sender<SubscriberState>,
}

impl InvalidationSubscriber {
    pub fn new(
        entity_type: EntityType,
        channel: Arc<dyn Channel>,
        cache: Arc<dyn CacheStore>,
        options: SubscriberOptions,
    ) -> Self {
        let (state, _) = watch::channel(SubscriberState::Subscribing);
        Self {
            entity_type,
            channel,
            cache,
            options,
            state,
        }
    }

    pub fn topic(&self) -> &'static str {
        topic_for(self.entity_type)
    }

    pub fn state(&self) -> watch::Receiver<SubscriberState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: SubscriberState) {
        let prev = self.state.send_replace(next);
        match (prev, next) {
            (SubscriberState::Subscribing, SubscriberState::Active) => {
                metrics::gauge!(SUBSCRIBERS_ACTIVE).increment(1.0)
            }
            (SubscriberState::Active, SubscriberState::Subscribing) => {
                metrics::gauge!(SUBSCRIBERS_ACTIVE).decrement(1.0)
            }
            _ => {}
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let topic = self.topic();
        let mut backoff = self.options.retry_initial;

        'subscribe: loop {
            self.set_state(SubscriberState::Subscribing);
            let attempt = tokio::select! {
                _ = shutdown.cancelled() => break 'subscribe,
                r = tokio::time::timeout(self.options.subscribe_timeout, self.channel.subscribe(topic)) => r,
            };
            let mut subscription = match attempt {
                Ok(Ok(subscription)) => subscription,
                Ok(Err(e)) => {
                    warn!(topic, error = %e, backoff_ms = backoff.as_millis() as u64, "subscribe failed, retrying");
                    if !sleep_or_cancel(backoff, &shutdown).await {
                        break 'subscribe;
                    }
                    backoff = (backoff * 2).min(self.options.retry_max);
                    continue;
                }
                Err(_) => {
                    warn!(topic, backoff_ms = backoff.as_millis() as u64, "subscribe timed out, retrying");
                    if !sleep_or_cancel(backoff, &shutdown).await {
                        break 'subscribe;
                    }
                    backoff = (backoff * 2).min(self.options.retry_max);
                    continue;
                }
            };

            backoff = self.options.retry_initial;
            self.set_state(SubscriberState::Active);
            info!(topic, "subscribed to invalidation topic");

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break 'subscribe,
                    msg = subscription.next() => match msg {
                        Some(payload) => {
                            self.handle_payload(&payload).await;
                        }
                        None => {
                            warn!(topic, "subscription ended, resubscribing");
                            continue 'subscribe;
                        }
                    },
                }
            }
        }

        self.set_state(SubscriberState::Subscribing);
        info!(topic, "invalidation subscriber stopped");
    }

    /// Decode and evict. Malformed payloads are logged and dropped.
    pub async fn handle_payload(&self, payload: &str) -> Option<EvictionReport> {
        let topic = self.topic();
        match super::decode(self.entity_type, payload) {
            Ok(event) => Some(self.evict(&event).await),
            Err(e) => {
                warn!(topic, error = %e, payload, "dropping malformed invalidation payload");
                metrics::counter!(MALFORMED_PAYLOADS_TOTAL, "topic" => topic).increment(1);
                None
            }
        }
    }

    /// Sweep every partition the event names. Each pattern is independent;
    /// a failed one is logged and left for the next event.
    pub async fn evict(&self, event: &InvalidationEvent) -> EvictionReport {
        let topic = topic_for(event.entity_type);
        let mut report = EvictionReport::default();
        for pattern in partition::patterns_for(event.entity_type, event.category) {
            match self.cache.invalidate_pattern(&pattern).await {
                Ok(deleted) => {
                    debug!(topic, pattern = %pattern, deleted, "evicted cache partition");
                    report.deleted += deleted;
                }
                Err(e) => {
                    error!(topic, pattern = %pattern, error = %e, "cache eviction failed");
                    metrics::counter!(EVICTION_FAILURES_TOTAL, "topic" => topic).increment(1);
                    report.failed_patterns.push(pattern);
                }
            }
        }
        metrics::counter!(KEYS_EVICTED_TOTAL, "topic" => topic).increment(report.deleted as u64);
        report
    }
}

/// False if cancelled before the delay elapsed.
async fn sleep_or_cancel(delay: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Running subscribers, one per topic.
pub struct SubscriberSet {
    subscribers: Vec<(EntityType, watch::Receiver<SubscriberState>, JoinHandle<()>)>,
}

impl SubscriberSet {
    pub fn states(&self) -> Vec<(EntityType, SubscriberState)> {
        self.subscribers
            .iter()
            .map(|(entity, state, _)| (*entity, *state.borrow()))
            .collect()
    }

    /// Resolves once every subscriber is `ACTIVE`.
    pub async fn wait_until_active(&self) {
        for (_, state, _) in &self.subscribers {
            let mut state = state.clone();
            // Err means the task exited; nothing left to wait for.
            let _ = state.wait_for(|s| *s == SubscriberState::Active).await;
        }
    }

    /// Wait for every subscriber task to finish (after the shutdown token fires).
    pub async fn join(self) {
        for (entity, _, handle) in self.subscribers {
            if let Err(e) = handle.await {
                error!(topic = topic_for(entity), error = %e, "subscriber task panicked");
            }
        }
    }
}

/// Spawn one subscriber per entity type on the shared channel and cache.
pub fn spawn_subscribers(
    channel: Arc<dyn Channel>,
    cache: Arc<dyn CacheStore>,
    options: SubscriberOptions,
    shutdown: CancellationToken,
) -> SubscriberSet {
    let subscribers = EntityType::ALL
        .into_iter()
        .map(|entity| {
            let subscriber =
                InvalidationSubscriber::new(entity, channel.clone(), cache.clone(), options);
            let state = subscriber.state();
            let handle = tokio::spawn(subscriber.run(shutdown.clone()));
            (entity, state, handle)
        })
        .collect();
    SubscriberSet { subscribers }
}
