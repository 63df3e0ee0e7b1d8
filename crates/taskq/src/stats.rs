//! Queue counters and snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time view of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Tasks waiting in the backlog.
    pub pending: usize,
    /// Tasks handed to the iterator and not yet completed.
    pub workers: usize,
    /// Tasks dispatched since creation.
    pub dispatched: u64,
    /// Tasks completed successfully.
    pub completed: u64,
    /// Tasks that reported an error.
    pub failed: u64,
    /// Completions discarded because the queue had already errored.
    pub dropped: u64,
    /// Whether dispatch is paused.
    pub paused: bool,
    /// Whether the error latch is set.
    pub errored: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    dispatched: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(
        &self,
        pending: usize,
        workers: usize,
        paused: bool,
        errored: bool,
    ) -> QueueStats {
        QueueStats {
            pending,
            workers,
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            paused,
            errored,
        }
    }
}
