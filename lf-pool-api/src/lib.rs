//! # Leader/Followers Pool API
//!
//! Boundary types shared between a Leader/Followers worker pool and the code
//! around it: the reactor that produces callback tasks, and the configuration
//! source that tunes the pool.
//!
//! ## Core Components
//!
//! - **Task**: a zero-argument, no-result unit of work
//! - **Executor**: the dispatch surface (`execute`, `promote_leader`, `shutdown`)
//! - **ConfigSource**: a string-valued lookup keyed by a namespaced property name
//!
//! ## Usage Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lf_pool_api::{Executor, Task};
//!
//! fn on_readable(executor: &Arc<dyn Executor>, handler: Task) {
//!     // Hand the event to a fresh leader so this thread can go back to waiting.
//!     executor.promote_leader(handler);
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`task`]: task type and the executor trait
//! - [`config`]: configuration lookup and its stock implementations

pub mod config;
pub mod task;

pub use config::{ConfigSource, EnvConfig, MapConfig, NoConfig};
pub use task::{Executor, Task};
