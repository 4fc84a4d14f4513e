//! # Worker Threads
//!
//! Every worker runs the same loop: block on the shared queue, take the next
//! task, run it, repeat. Whichever idle worker claims the next task is the
//! leader for that cycle, so no leader identity is stored anywhere. While one
//! worker is inside a task the others keep waiting as followers.
//!
//! ## Lifecycle
//! 1. Register as live and report ready to the constructor
//! 2. Receive and run tasks until the queue is closed and empty
//! 3. Drop the termination token so `shutdown()` can observe the exit
//!
//! A worker never dies because of a task: panics are caught and logged, so
//! the thread set keeps its size until shutdown.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use flume::{Receiver, Sender};
use lf_pool_api::Task;
use tracing::{debug, trace, warn, Dispatch};

thread_local! {
    static INTERRUPT: RefCell<Option<Arc<AtomicBool>>> = const { RefCell::new(None) };
}

/// Whether the pool owning the current thread has been forcibly stopped.
///
/// Long-running tasks can poll this to cut their work short once the
/// shutdown grace period has elapsed. Always `false` outside a pool worker.
pub fn interrupted() -> bool {
    INTERRUPT.with(|flag| {
        flag.borrow()
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    })
}

/// State shared by the pool handle and all of its workers.
pub(crate) struct Shared {
    /// Consumer side of the task queue.
    pub(crate) receiver: Receiver<Task>,

    /// Raised once when the grace period elapses.
    pub(crate) interrupt: Arc<AtomicBool>,

    /// Workers that have started and not exited.
    pub(crate) live: AtomicUsize,

    /// Workers currently inside a task.
    pub(crate) active: AtomicUsize,

    /// Tasks that ran to completion without panicking.
    pub(crate) completed: AtomicUsize,
}

impl Shared {
    pub(crate) fn new(receiver: Receiver<Task>) -> Self {
        Self {
            receiver,
            interrupt: Arc::new(AtomicBool::new(false)),
            live: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub(crate) fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Acquire)
    }

    pub(crate) fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Release);
    }
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("queued", &self.receiver.len())
            .field("live", &self.live.load(Ordering::Relaxed))
            .field("active", &self.active.load(Ordering::Relaxed))
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// One of the pool's long-lived threads, before it is spawned.
pub(crate) struct Worker {
    name: String,
    shared: Arc<Shared>,
    dispatch: Dispatch,
    ready: Sender<()>,
    /// Never written to; dropping it tells `shutdown()` this worker is gone.
    _termination: Sender<()>,
}

impl Worker {
    pub(crate) fn new(
        name: String,
        shared: Arc<Shared>,
        dispatch: Dispatch,
        ready: Sender<()>,
        termination: Sender<()>,
    ) -> Self {
        Self {
            name,
            shared,
            dispatch,
            ready,
            _termination: termination,
        }
    }

    /// Thread body.
    pub(crate) fn run(self) {
        let _dispatch = tracing::dispatcher::set_default(&self.dispatch);
        INTERRUPT.with(|flag| *flag.borrow_mut() = Some(Arc::clone(&self.shared.interrupt)));
        self.shared.live.fetch_add(1, Ordering::SeqCst);
        let _live = LiveGuard(&self.shared);

        // The constructor may already have given up on a failed sibling spawn.
        let _ = self.ready.send(());
        debug!(worker = %self.name, "worker started");

        while let Ok(task) = self.shared.receiver.recv() {
            if self.shared.is_interrupted() {
                trace!(worker = %self.name, "discarding task queued before forced shutdown");
                continue;
            }
            self.run_task(task);
        }

        debug!(worker = %self.name, "worker stopped");
    }

    fn run_task(&self, task: Task) {
        self.shared.active.fetch_add(1, Ordering::SeqCst);
        let outcome = panic::catch_unwind(AssertUnwindSafe(task));
        self.shared.active.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            Ok(()) => {
                self.shared.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                warn!(
                    worker = %self.name,
                    panic = %panic_message(payload.as_ref()),
                    "task panicked, worker keeps running"
                );
            }
        }
    }
}

struct LiveGuard<'a>(&'a Shared);

impl Drop for LiveGuard<'_> {
    fn drop(&mut self) {
        self.0.live.fetch_sub(1, Ordering::SeqCst);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
