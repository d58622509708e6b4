//! Runtime configuration, loaded from `DISPATCH_*` environment variables.

use crate::task::adapters::redis::RedisQueueConfig;
use std::time::Duration;

/// Runtime configuration for the dispatch server.
///
/// Every field has a default so the binary starts against local services
/// with no variables set. Unparsable numbers fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8080"`).
    pub bind_address: String,

    /// `PostgreSQL` connection URL.
    pub database_url: String,

    /// Maximum pooled database connections.
    pub db_pool_size: u32,

    /// Apply the bundled schema on startup.
    pub apply_schema: bool,

    /// Durable queue settings.
    pub queue: RedisQueueConfig,

    /// Deadline for publishing a created task.
    pub publish_timeout: Duration,

    /// Time a new connection has to authenticate.
    pub auth_timeout: Duration,

    /// `tracing` filter string, e.g. `"info"` or `"captcha_dispatch=debug"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,
}

impl Config {
    /// Builds [`Config`] from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds [`Config`] from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let queue = RedisQueueConfig::default();
        Self {
            bind_address: env.or("DISPATCH_BIND", "0.0.0.0:8080"),
            database_url: env.or(
                "DISPATCH_DATABASE_URL",
                "postgres://postgres@127.0.0.1:5432/captcha",
            ),
            db_pool_size: env.parse("DISPATCH_DB_POOL_SIZE", 8),
            apply_schema: env.flag("DISPATCH_APPLY_SCHEMA"),
            queue: RedisQueueConfig {
                url: env.or("DISPATCH_REDIS_URL", &queue.url),
                stream_key: env.or("DISPATCH_QUEUE_KEY", &queue.stream_key),
                consumer_group: env.or("DISPATCH_CONSUMER_GROUP", &queue.consumer_group),
                consumer_name: env.or("DISPATCH_CONSUMER_NAME", &queue.consumer_name),
                block: env.millis("DISPATCH_QUEUE_POLL_MS", queue.block),
            },
            publish_timeout: env.millis("DISPATCH_PUBLISH_TIMEOUT_MS", Duration::from_secs(5)),
            auth_timeout: env.millis("DISPATCH_AUTH_TIMEOUT_MS", Duration::from_secs(30)),
            log_level: env.or("DISPATCH_LOG", "info"),
            log_json: env.flag("DISPATCH_LOG_JSON"),
        }
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn or(&self, key: &str, default: &str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_owned())
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        (self.0)(key)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default)
    }

    fn millis(&self, key: &str, default: Duration) -> Duration {
        (self.0)(key)
            .and_then(|value| value.trim().parse().ok())
            .map_or(default, Duration::from_millis)
    }

    fn flag(&self, key: &str) -> bool {
        (self.0)(key).is_some_and(|value| value == "1" || value.eq_ignore_ascii_case("true"))
    }
}
