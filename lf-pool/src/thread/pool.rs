//! # Leader/Followers Pool
//!
//! A fixed set of prestarted worker threads sharing one FIFO task queue.
//! The reactor's current leader claims an event, hands its processing to
//! the pool with [`LeaderFollowersPool::promote_leader`], and an idle
//! follower becomes the next leader by picking it up.
//!
//! ## Sizing
//! The size is read once from `lf_pool.thread_pool_size` (default 5,
//! minimum 2) and never changes. All threads exist before the constructor
//! returns, so the first task never pays for thread creation.
//!
//! ## Queue
//! The queue is unbounded on purpose. Its producers are the pool's own
//! threads plus a bounded number of external flush callers, which keeps the
//! backlog bounded in practice. A bounded queue would turn bursts into
//! rejections.
//!
//! ## Shutdown
//! `Running -> ShuttingDown -> Terminated`, driven once by the first
//! `shutdown()` call. Queued tasks are drained for up to the grace period;
//! after that the pool is interrupted, the remaining backlog is purged and
//! still-running workers are detached.
//!
//! Calling `shutdown()` from one of the pool's own workers always waits out
//! the full grace period, because the calling worker cannot exit while it is
//! still waiting. The pool then takes the forced path.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use flume::{Receiver, RecvTimeoutError, Sender};
use lf_pool_api::{ConfigSource, EnvConfig, Executor, Task};
use tracing::{debug, error, info, warn};

use crate::logging::current_subscriber;
use crate::pool_span;

use super::config::{PoolConfig, MIN_THREAD_POOL_SIZE};
use super::error::PoolError;
use super::worker::{Shared, Worker};

/// Reported once per task the pool failed to accept.
pub const DISPATCH_FAILURE_MESSAGE: &str =
    "Unexpected exception caught in one of the LF thread-pool thread.";

/// Lifecycle of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Accepting and running tasks
    Running = 0,

    /// Closed to new tasks, draining the backlog
    ShuttingDown = 1,

    /// Workers drained or forcibly abandoned
    Terminated = 2,
}

impl PoolState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PoolState::Running,
            1 => PoolState::ShuttingDown,
            _ => PoolState::Terminated,
        }
    }
}

/// Snapshot of the pool's counters.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Configured number of workers
    pub pool_size: usize,

    /// Workers started and not yet exited
    pub live_workers: usize,

    /// Workers currently inside a task
    pub active_workers: usize,

    /// Tasks waiting for a free worker
    pub queued_tasks: usize,

    /// Tasks that returned without panicking
    pub completed_tasks: usize,

    pub state: PoolState,
}

/// Fixed-size Leader/Followers worker pool.
pub struct LeaderFollowersPool {
    config: PoolConfig,

    /// Producer side of the queue. Taken on shutdown to close submissions.
    sender: RwLock<Option<Sender<Task>>>,

    shared: Arc<Shared>,

    /// Disconnects once every worker has exited.
    termination: Receiver<()>,

    handles: Mutex<Vec<JoinHandle<()>>>,

    /// One-shot guard for the shutdown sequence.
    shutdown: AtomicBool,

    state: AtomicU8,
}

impl LeaderFollowersPool {
    /// Creates a pool sized from the process environment.
    pub fn new() -> Result<Self, PoolError> {
        Self::from_source(&EnvConfig)
    }

    /// Creates a pool sized from `source`.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, PoolError> {
        Self::with_config(PoolConfig::from_source(source))
    }

    /// Creates a pool and starts all of its workers.
    ///
    /// Returns only after every worker thread is running.
    pub fn with_config(mut config: PoolConfig) -> Result<Self, PoolError> {
        config.pool_size = config.pool_size.max(MIN_THREAD_POOL_SIZE);
        let pool_size = config.pool_size;

        let (sender, receiver) = flume::unbounded();
        let (termination_tx, termination_rx) = flume::unbounded();
        let (ready_tx, ready_rx) = flume::unbounded();
        let shared = Arc::new(Shared::new(receiver));
        let dispatch = current_subscriber();

        let mut handles = Vec::with_capacity(pool_size);
        for index in 0..pool_size {
            let name = format!("{}-{}", config.thread_name_prefix, index);
            let worker = Worker::new(
                name.clone(),
                Arc::clone(&shared),
                dispatch.clone(),
                ready_tx.clone(),
                termination_tx.clone(),
            );
            match thread::Builder::new().name(name).spawn(move || worker.run()) {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    // Closing the queue lets the workers already started exit on their own.
                    drop(sender);
                    error!(index, error = %source, "failed to spawn LF worker thread");
                    return Err(PoolError::Spawn { index, source });
                }
            }
        }
        drop(ready_tx);
        drop(termination_tx);

        for _ in 0..pool_size {
            if ready_rx.recv().is_err() {
                break;
            }
        }
        debug!(pool_size, "LF thread pool started");

        Ok(Self {
            config,
            sender: RwLock::new(Some(sender)),
            shared,
            termination: termination_rx,
            handles: Mutex::new(handles),
            shutdown: AtomicBool::new(false),
            state: AtomicU8::new(PoolState::Running as u8),
        })
    }

    /// Hands `task` to a new leader. Same dispatch as [`Self::execute`].
    pub fn promote_leader(&self, task: Task) {
        self.execute(task);
    }

    /// Queues `task` for the next free worker.
    ///
    /// Never blocks and never fails from the caller's point of view: a task
    /// the pool cannot accept is reported at error level and dropped.
    pub fn execute(&self, task: Task) {
        if let Err(err) = self.dispatch(task) {
            error!(error = %err, "{}", DISPATCH_FAILURE_MESSAGE);
        }
    }

    /// [`Self::execute`] for any closure.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.execute(Box::new(task));
    }

    /// [`Self::promote_leader`] for any closure.
    pub fn promote<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.promote_leader(Box::new(task));
    }

    fn dispatch(&self, task: Task) -> Result<(), PoolError> {
        let sender = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        let sender = sender.as_ref().ok_or(PoolError::ShutDown)?;
        sender.send(task).map_err(|_| PoolError::Disconnected)
    }

    /// Stops the pool. Only the first call does anything.
    ///
    /// Blocks for at most the grace period (plus the time to purge the
    /// backlog if it elapses).
    pub fn shutdown(&self) {
        if self
            .shutdown
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.state.store(PoolState::ShuttingDown as u8, Ordering::SeqCst);
        let _span = pool_span!("shutdown", pool_size = self.config.pool_size).entered();

        let closed = self.sender.write().unwrap_or_else(PoisonError::into_inner).take();
        drop(closed);

        let deadline = Instant::now() + self.config.shutdown_grace_period;
        match self.termination.recv_deadline(deadline) {
            Err(RecvTimeoutError::Disconnected) => self.finish_drained(),
            Ok(()) | Err(RecvTimeoutError::Timeout) => self.force_stop(),
        }

        self.state.store(PoolState::Terminated as u8, Ordering::SeqCst);
    }

    fn finish_drained(&self) {
        let handles = std::mem::take(&mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            if handle.join().is_err() {
                warn!("LF worker thread exited with a panic");
            }
        }
        info!(
            completed = self.shared.completed.load(Ordering::Relaxed),
            "LF thread pool drained"
        );
    }

    fn force_stop(&self) {
        self.shared.interrupt();
        let purged = self.shared.receiver.drain().count();
        let detached = std::mem::take(&mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner));
        info!(
            grace_period = ?self.config.shutdown_grace_period,
            purged,
            still_running = self.shared.live.load(Ordering::SeqCst),
            detached = detached.len(),
            "LF thread pool did not drain in time, forcing termination"
        );
    }

    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn live_workers(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    pub fn active_workers(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Snapshot; may change by the time it is used.
    pub fn queued_tasks(&self) -> usize {
        self.shared.receiver.len()
    }

    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            pool_size: self.pool_size(),
            live_workers: self.live_workers(),
            active_workers: self.active_workers(),
            queued_tasks: self.queued_tasks(),
            completed_tasks: self.shared.completed.load(Ordering::Relaxed),
            state: self.state(),
        }
    }
}

impl fmt::Debug for LeaderFollowersPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeaderFollowersPool")
            .field("pool_size", &self.config.pool_size)
            .field("state", &self.state())
            .field("shared", &self.shared)
            .finish()
    }
}

impl Executor for LeaderFollowersPool {
    fn execute(&self, task: Task) {
        LeaderFollowersPool::execute(self, task);
    }

    fn promote_leader(&self, task: Task) {
        LeaderFollowersPool::promote_leader(self, task);
    }

    fn shutdown(&self) {
        LeaderFollowersPool::shutdown(self);
    }
}

impl Drop for LeaderFollowersPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn small_pool(size: usize) -> LeaderFollowersPool {
        LeaderFollowersPool::with_config(
            PoolConfig::default()
                .with_pool_size(size)
                .with_shutdown_grace_period(Duration::from_millis(300)),
        )
        .unwrap()
    }

    #[test]
    fn test_state_from_u8() {
        assert_eq!(PoolState::from_u8(0), PoolState::Running);
        assert_eq!(PoolState::from_u8(1), PoolState::ShuttingDown);
        assert_eq!(PoolState::from_u8(2), PoolState::Terminated);
        assert_eq!(PoolState::from_u8(9), PoolState::Terminated);
    }

    #[test]
    fn test_with_config_clamps_unvalidated_size() {
        let config = PoolConfig {
            pool_size: 0,
            ..PoolConfig::default()
        };
        let pool = LeaderFollowersPool::with_config(config).unwrap();
        assert_eq!(pool.pool_size(), 2);
        assert_eq!(pool.live_workers(), 2);
    }

    #[test]
    fn test_workers_are_named() {
        let pool = LeaderFollowersPool::with_config(
            PoolConfig::default().with_pool_size(2).with_thread_name_prefix("named"),
        )
        .unwrap();
        let (tx, rx) = flume::unbounded();
        pool.submit(move || {
            tx.send(thread::current().name().map(str::to_string)).unwrap();
        });
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert!(name == "named-0" || name == "named-1", "unexpected name {name}");
    }

    #[test]
    fn test_dispatch_error_after_shutdown() {
        let pool = small_pool(2);
        pool.shutdown();
        let err = pool.dispatch(Box::new(|| {})).unwrap_err();
        assert!(matches!(err, PoolError::ShutDown));
    }

    #[test]
    fn test_metrics_snapshot() {
        let pool = small_pool(3);
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let done = Arc::clone(&done);
            pool.submit(move || {
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.shutdown();

        let metrics = pool.metrics();
        assert_eq!(metrics.pool_size, 3);
        assert_eq!(metrics.live_workers, 0);
        assert_eq!(metrics.active_workers, 0);
        assert_eq!(metrics.queued_tasks, 0);
        assert_eq!(metrics.completed_tasks, 4);
        assert_eq!(metrics.state, PoolState::Terminated);
        assert_eq!(done.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_promote_runs_closure() {
        let pool = small_pool(2);
        let (tx, rx) = flume::unbounded();
        pool.promote(move || tx.send(7_u32).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
    }

    #[test]
    fn test_debug_format() {
        let pool = small_pool(2);
        let debug = format!("{:?}", pool);
        assert!(debug.contains("LeaderFollowersPool"));
        assert!(debug.contains("Running"));
    }
}
