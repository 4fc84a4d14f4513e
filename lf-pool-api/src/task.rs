//! # Tasks and Executors
//!
//! A task is opaque to whoever runs it: the executor never inspects what it
//! does, it only decides which thread calls it and when.

use std::fmt;

/// A unit of work with no arguments and no result.
///
/// Tasks may fail (panic); catching that is the task's own business unless
/// the executor documents otherwise.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Dispatch surface of a worker pool.
///
/// Every operation absorbs its own failures: nothing here returns an error
/// to the caller. Implementations report dispatch problems through their
/// logging sink instead.
pub trait Executor: fmt::Debug + Send + Sync {
    /// Queue `task` for whichever worker becomes free next.
    ///
    /// Never blocks on capacity and gives no guarantee that the task has
    /// started when this returns.
    fn execute(&self, task: Task);

    /// Hand `task` to a new leader.
    ///
    /// Called by the current leader once it has claimed an event, so that it
    /// can process the event while another idle worker takes over waiting.
    /// Dispatch is identical to [`Executor::execute`]; the separate name only
    /// documents intent at the call site.
    fn promote_leader(&self, task: Task) {
        self.execute(task);
    }

    /// Stop accepting work and tear the workers down.
    ///
    /// Idempotent. Only the first call performs the shutdown sequence.
    fn shutdown(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct InlineExecutor {
        ran: Mutex<usize>,
    }

    impl Executor for InlineExecutor {
        fn execute(&self, task: Task) {
            task();
            *self.ran.lock().unwrap() += 1;
        }

        fn shutdown(&self) {}
    }

    #[test]
    fn test_promote_leader_forwards_to_execute() {
        let executor = InlineExecutor::default();
        executor.promote_leader(Box::new(|| {}));
        executor.execute(Box::new(|| {}));
        assert_eq!(*executor.ran.lock().unwrap(), 2);
    }

    #[test]
    fn test_executor_is_object_safe() {
        let executor: Box<dyn Executor> = Box::new(InlineExecutor::default());
        executor.promote_leader(Box::new(|| {}));
        executor.shutdown();
    }
}
