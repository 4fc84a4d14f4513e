#![doc = " Thread-based Leader/Followers pool."]

pub mod config;
pub mod error;
pub mod pool;
pub mod worker;

pub use config::{
    PoolConfig, DEFAULT_SHUTDOWN_GRACE_PERIOD, DEFAULT_THREAD_POOL_SIZE, MIN_THREAD_POOL_SIZE,
    THREAD_POOL_SIZE_KEY,
};
pub use error::PoolError;
pub use pool::{LeaderFollowersPool, PoolMetrics, PoolState, DISPATCH_FAILURE_MESSAGE};
pub use worker::interrupted;
