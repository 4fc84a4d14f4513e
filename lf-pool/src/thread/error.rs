use std::io;
use thiserror::Error;

/// Errors raised inside the Leader/Followers pool.
///
/// Only [`PoolError::Spawn`] ever reaches a caller (from the constructor).
/// Dispatch errors are caught at the submit boundary and logged.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Thread pool is shut down, task rejected")]
    ShutDown,
    #[error("Task queue is disconnected, no worker left to run the task")]
    Disconnected,
    #[error("Failed to spawn worker thread {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_error_display() {
        assert_eq!(PoolError::ShutDown.to_string(), "Thread pool is shut down, task rejected");
        assert_eq!(
            PoolError::Disconnected.to_string(),
            "Task queue is disconnected, no worker left to run the task"
        );
        let spawn = PoolError::Spawn {
            index: 3,
            source: io::Error::new(io::ErrorKind::WouldBlock, "resource temporarily unavailable"),
        };
        assert_eq!(
            spawn.to_string(),
            "Failed to spawn worker thread 3: resource temporarily unavailable"
        );
        assert!(std::error::Error::source(&spawn).is_some());
    }
}
