use std::str::FromStr;
use std::time::Duration;

use crate::invalidation::SubscriberOptions;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Process configuration, read from `STAYWATCH_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub metrics_port: Option<u16>,
    /// Unset runs everything in-process.
    pub redis_url: Option<String>,
    pub publish_timeout: Duration,
    pub subscribe_timeout: Duration,
    pub subscribe_retry: Duration,
    pub subscribe_retry_max: Duration,
    pub cache_ttl: Duration,
    pub retention: Duration,
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metrics_port: None,
            redis_url: None,
            publish_timeout: Duration::from_millis(2000),
            subscribe_timeout: Duration::from_millis(2000),
            subscribe_retry: Duration::from_millis(1000),
            subscribe_retry_max: Duration::from_millis(60_000),
            cache_ttl: Duration::from_secs(300),
            retention: Duration::from_secs(30 * 86_400),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let ms = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            Ok(parse(&lookup, key)?.map_or(default, Duration::from_millis))
        };
        let secs = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            Ok(parse(&lookup, key)?.map_or(default, Duration::from_secs))
        };

        Ok(Self {
            metrics_port: parse(&lookup, "STAYWATCH_METRICS_PORT")?,
            redis_url: lookup("STAYWATCH_REDIS_URL").filter(|s| !s.is_empty()),
            publish_timeout: ms("STAYWATCH_PUBLISH_TIMEOUT_MS", defaults.publish_timeout)?,
            subscribe_timeout: ms("STAYWATCH_SUBSCRIBE_TIMEOUT_MS", defaults.subscribe_timeout)?,
            subscribe_retry: ms("STAYWATCH_SUBSCRIBE_RETRY_MS", defaults.subscribe_retry)?,
            subscribe_retry_max: ms(
                "STAYWATCH_SUBSCRIBE_RETRY_MAX_MS",
                defaults.subscribe_retry_max,
            )?,
            cache_ttl: secs("STAYWATCH_CACHE_TTL_SECS", defaults.cache_ttl)?,
            retention: parse::<u64, _>(&lookup, "STAYWATCH_RETENTION_DAYS")?
                .map_or(defaults.retention, |d| Duration::from_secs(d * 86_400)),
            sweep_interval: secs("STAYWATCH_SWEEP_INTERVAL_SECS", defaults.sweep_interval)?,
        })
    }

    pub fn subscriber_options(&self) -> SubscriberOptions {
        SubscriberOptions {
            subscribe_timeout: self.subscribe_timeout,
            retry_initial: self.subscribe_retry,
            retry_max: self.subscribe_retry_max.max(self.subscribe_retry),
        }
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigError::Invalid { key, value }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.publish_timeout, Duration::from_secs(2));
        assert_eq!(config.retention, Duration::from_secs(30 * 86_400));
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(lookup(&[
            ("STAYWATCH_METRICS_PORT", "9102"),
            ("STAYWATCH_REDIS_URL", "redis://cache:6379"),
            ("STAYWATCH_PUBLISH_TIMEOUT_MS", "250"),
            ("STAYWATCH_SUBSCRIBE_RETRY_MS", "50"),
            ("STAYWATCH_SUBSCRIBE_RETRY_MAX_MS", "400"),
            ("STAYWATCH_CACHE_TTL_SECS", "10"),
            ("STAYWATCH_RETENTION_DAYS", "7"),
        ]))
        .unwrap();

        assert_eq!(config.metrics_port, Some(9102));
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.publish_timeout, Duration::from_millis(250));
        assert_eq!(config.cache_ttl, Duration::from_secs(10));
        assert_eq!(config.retention, Duration::from_secs(7 * 86_400));

        let options = config.subscriber_options();
        assert_eq!(options.retry_initial, Duration::from_millis(50));
        assert_eq!(options.retry_max, Duration::from_millis(400));
        assert_eq!(options.subscribe_timeout, Duration::from_secs(2));
    }

    #[test]
    fn garbage_is_rejected_not_defaulted() {
        let err = Config::from_lookup(lookup(&[("STAYWATCH_PUBLISH_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "STAYWATCH_PUBLISH_TIMEOUT_MS",
                value: "soon".into()
            }
        );

        assert!(Config::from_lookup(lookup(&[("STAYWATCH_METRICS_PORT", "70000")])).is_err());
    }

    #[test]
    fn blank_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("STAYWATCH_REDIS_URL", ""),
            ("STAYWATCH_SWEEP_INTERVAL_SECS", "  "),
        ]))
        .unwrap();
        assert!(config.redis_url.is_none());
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn retry_max_never_below_initial() {
        let config = Config {
            subscribe_retry: Duration::from_secs(5),
            subscribe_retry_max: Duration::from_secs(1),
            ..Config::default()
        };
        assert_eq!(config.subscriber_options().retry_max, Duration::from_secs(5));
    }
}
