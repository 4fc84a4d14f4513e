// A toy reactor driven by the Leader/Followers pool.
//
// One pool task at a time is the leader: it blocks on the event source.
// When an event arrives the leader promotes a new leader first and only then
// handles the event, so some thread is always waiting for the next one.
//
// Run with `cargo run --example reactor`; set LF_POOL_THREAD_POOL_SIZE to
// change the number of workers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use flume::Receiver;
use lf_pool::logging::{self, debug, info};
use lf_pool::LeaderFollowersPool;

#[derive(Debug)]
enum Event {
    Readable { connection: usize, bytes: usize },
    Closed { connection: usize },
}

struct Reactor {
    pool: Arc<LeaderFollowersPool>,
    events: Receiver<Event>,
    handled: Arc<AtomicUsize>,
}

impl Reactor {
    fn lead(self) {
        let Ok(event) = self.events.recv() else {
            debug!("event source closed, leader retires");
            return;
        };

        let next = Reactor {
            pool: Arc::clone(&self.pool),
            events: self.events.clone(),
            handled: Arc::clone(&self.handled),
        };
        self.pool.promote_leader(Box::new(move || next.lead()));

        handle(&event);
        self.handled.fetch_add(1, Ordering::Relaxed);
    }
}

fn handle(event: &Event) {
    match event {
        Event::Readable { connection, bytes } => {
            // pretend to parse and answer a request
            thread::sleep(Duration::from_millis((*bytes as u64) % 7));
            debug!(connection, bytes, "request handled");
        }
        Event::Closed { connection } => debug!(connection, "connection closed"),
    }
}

fn main() -> Result<()> {
    logging::init_development();

    let pool = Arc::new(LeaderFollowersPool::new()?);
    info!(workers = pool.pool_size(), "reactor starting");

    let (source, events) = flume::unbounded();
    let handled = Arc::new(AtomicUsize::new(0));
    let first = Reactor {
        pool: Arc::clone(&pool),
        events,
        handled: Arc::clone(&handled),
    };
    pool.promote_leader(Box::new(move || first.lead()));

    let mut expected = 0;
    for connection in 0..20 {
        for request in 0..5 {
            source.send(Event::Readable {
                connection,
                bytes: 64 + connection * 13 + request,
            })?;
        }
        source.send(Event::Closed { connection })?;
        expected += 6;
    }
    drop(source);

    while handled.load(Ordering::Relaxed) < expected {
        thread::sleep(Duration::from_millis(10));
    }
    // the current leader sees the closed source and retires during the drain
    pool.shutdown();

    info!(
        handled = handled.load(Ordering::Relaxed),
        metrics = ?pool.metrics(),
        "reactor stopped"
    );
    Ok(())
}
