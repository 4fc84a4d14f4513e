use std::time::Duration;

use lf_pool_api::ConfigSource;
use tracing::debug;

/// Configuration key for the number of worker threads.
pub const THREAD_POOL_SIZE_KEY: &str = "lf_pool.thread_pool_size";

/// Pool size used when nothing (or nothing parsable) is configured.
pub const DEFAULT_THREAD_POOL_SIZE: usize = 5;

/// One leader plus at least one follower.
pub const MIN_THREAD_POOL_SIZE: usize = 2;

/// How long `shutdown()` waits for an orderly drain before forcing.
pub const DEFAULT_SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(1);

pub const DEFAULT_THREAD_NAME_PREFIX: &str = "lf-worker";

/// Configuration for the `LeaderFollowersPool`.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of worker threads. Never below `MIN_THREAD_POOL_SIZE` once
    /// resolved through `from_source` or `with_pool_size`.
    pub pool_size: usize,

    /// Bounded wait for an orderly drain during shutdown.
    pub shutdown_grace_period: Duration,

    /// Worker threads are named `{prefix}-{index}`.
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_THREAD_POOL_SIZE,
            shutdown_grace_period: DEFAULT_SHUTDOWN_GRACE_PERIOD,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
        }
    }
}

impl PoolConfig {
    /// Default configuration with the pool size read from `source`.
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        Self {
            pool_size: resolve_pool_size(source.get(THREAD_POOL_SIZE_KEY).as_deref()),
            ..Self::default()
        }
    }

    /// Sets the pool size, clamped to `MIN_THREAD_POOL_SIZE`.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(MIN_THREAD_POOL_SIZE);
        self
    }

    pub fn with_shutdown_grace_period(mut self, grace_period: Duration) -> Self {
        self.shutdown_grace_period = grace_period;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

/// Turns a raw configured value into an effective pool size.
///
/// The value is read as a 32-bit signed integer. Missing or malformed values
/// fall back to `DEFAULT_THREAD_POOL_SIZE`; anything parsed is clamped to at
/// least `MIN_THREAD_POOL_SIZE`.
pub fn resolve_pool_size(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        return DEFAULT_THREAD_POOL_SIZE;
    };
    match raw.parse::<i32>() {
        Ok(size) => usize::try_from(size)
            .unwrap_or(0)
            .max(MIN_THREAD_POOL_SIZE),
        Err(err) => {
            debug!(key = THREAD_POOL_SIZE_KEY, value = raw, error = %err, "ignoring malformed pool size");
            DEFAULT_THREAD_POOL_SIZE
        }
    }
}
