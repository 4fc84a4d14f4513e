// Leader/Followers worker pool
//
// A fixed set of prestarted threads takes turns waiting for the next unit of
// work. The boundary types (tasks, the executor trait, configuration lookup)
// live in `lf-pool-api`; this crate provides the thread pool behind them.

pub mod logging;
pub mod thread;

pub use lf_pool_api::{ConfigSource, EnvConfig, Executor, MapConfig, NoConfig, Task};
pub use thread::{LeaderFollowersPool, PoolConfig, PoolError, PoolMetrics, PoolState};
