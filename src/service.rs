//! Process assembly: one channel handle and cache store, the engine and its
//! catalog on top of them, the invalidation subscribers and the retention
//! sweeper, all torn down together.

use std::sync::Arc;
use std::time::Duration;

use deadpool_redis::Pool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::{CacheStore, InMemoryCache, RedisCache};
use crate::catalog::Catalog;
use crate::channel::redis::{connect_pool, RedisChannel};
use crate::channel::{Channel, ChannelError, ChannelHub};
use crate::config::Config;
use crate::engine::Engine;
use crate::invalidation::{spawn_subscribers, InvalidationPublisher, SubscriberSet};
use crate::reaper;

/// Where events travel and cached views live.
pub enum Backend {
    InProcess {
        hub: Arc<ChannelHub>,
        cache: Arc<InMemoryCache>,
    },
    Redis {
        pool: Pool,
        url: String,
    },
}

impl Backend {
    /// Redis when `redis_url` is set, otherwise in-process.
    pub fn from_config(config: &Config) -> Result<Self, ChannelError> {
        match &config.redis_url {
            Some(url) => Ok(Self::Redis {
                pool: connect_pool(url)?,
                url: url.clone(),
            }),
            None => Ok(Self::in_process()),
        }
    }

    pub fn in_process() -> Self {
        Self::InProcess {
            hub: Arc::new(ChannelHub::new()),
            cache: Arc::new(InMemoryCache::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::InProcess { .. } => "in-process",
            Self::Redis { .. } => "redis",
        }
    }

    fn handles(&self) -> (Arc<dyn Channel>, Arc<dyn CacheStore>) {
        match self {
            Self::InProcess { hub, cache } => (hub.clone(), cache.clone()),
            Self::Redis { pool, url } => (
                Arc::new(RedisChannel::new(pool.clone(), url.clone())),
                Arc::new(RedisCache::new(pool.clone())),
            ),
        }
    }

    fn close(&self) {
        match self {
            Self::InProcess { hub, .. } => hub.close(),
            Self::Redis { pool, .. } => pool.close(),
        }
    }
}

/// Everything a running process hosts.
pub struct Service {
    pub engine: Arc<Engine>,
    pub catalog: Catalog,
    pub subscribers: SubscriberSet,
    backend: Backend,
    sweeper: JoinHandle<()>,
    shutdown: CancellationToken,
}

impl Service {
    /// Wire every component from `config`. Must be called inside a runtime.
    pub fn start(config: &Config, backend: Backend) -> Self {
        let (channel, cache) = backend.handles();
        let shutdown = CancellationToken::new();

        let publisher = InvalidationPublisher::new(channel.clone(), config.publish_timeout);
        let engine = Arc::new(Engine::new(publisher));
        let catalog = Catalog::new(engine.clone(), cache.clone(), Some(config.cache_ttl));
        let subscribers =
            spawn_subscribers(channel, cache, config.subscriber_options(), shutdown.clone());

        let sweeper = tokio::spawn(reaper::run_retention_sweeper(
            engine.clone(),
            config.retention,
            config.sweep_interval,
            shutdown.clone(),
        ));

        info!(
            backend = backend.name(),
            publish_timeout = ?config.publish_timeout,
            cache_ttl = ?config.cache_ttl,
            retention = ?config.retention,
            sweep_interval = ?config.sweep_interval,
            "staywatch service started"
        );

        Self {
            engine,
            catalog,
            subscribers,
            backend,
            sweeper,
            shutdown,
        }
    }

    /// Cancel background tasks, wait up to `drain` for them, then close the
    /// channel handle or Redis pool.
    pub async fn stop(self, drain: Duration) {
        self.shutdown.cancel();
        let sweeper = self.sweeper;
        let subscribers = self.subscribers;
        let drained = tokio::time::timeout(drain, async move {
            subscribers.join().await;
            if let Err(e) = sweeper.await {
                warn!(error = %e, "retention sweeper task panicked");
            }
        })
        .await;
        if drained.is_err() {
            // Tasks exit at their next await point; don't hang on a wedged one.
            warn!("drain timeout, background tasks still running");
        }
        self.backend.close();
    }
}
