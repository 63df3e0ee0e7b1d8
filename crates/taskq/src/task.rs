//! Task entries and completion handles.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

/// Per-task completion callback, shared by every item of one push.
pub type Callback<R, E> = Arc<dyn Fn(&Result<R, E>) + Send + Sync>;

/// A queued task and the callback to run when it completes.
pub(crate) struct Entry<T, R, E> {
    pub(crate) seq: u64,
    pub(crate) task: T,
    pub(crate) callback: Option<Callback<R, E>>,
}

/// Receiver side of a completion, implemented by the queue internals.
pub(crate) trait CompletionSink<R, E>: Send + Sync {
    fn complete(self: Arc<Self>, seq: u64, callback: Option<Callback<R, E>>, result: Result<R, E>);
}

/// Completion handle passed to the iterator with every dispatched task.
///
/// Completing consumes the handle, so a task can report back at most once.
/// Dropping the handle without completing it leaves the task's worker slot
/// occupied, exactly like an iterator call that never returns.
pub struct Done<R, E> {
    seq: u64,
    pending: Option<(Arc<dyn CompletionSink<R, E>>, Option<Callback<R, E>>)>,
}

impl<R, E> Done<R, E> {
    pub(crate) fn new(
        seq: u64,
        sink: Arc<dyn CompletionSink<R, E>>,
        callback: Option<Callback<R, E>>,
    ) -> Self {
        Self {
            seq,
            pending: Some((sink, callback)),
        }
    }

    /// Sequence number of the task this handle belongs to.
    ///
    /// Numbers follow push order, starting at zero for each queue.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Report the task's outcome to the queue.
    pub fn complete(mut self, result: Result<R, E>) {
        if let Some((sink, callback)) = self.pending.take() {
            sink.complete(self.seq, callback, result);
        }
    }

    /// Report success.
    pub fn ok(self, value: R) {
        self.complete(Ok(value));
    }

    /// Report failure. Halts the queue.
    pub fn fail(self, error: E) {
        self.complete(Err(error));
    }
}

impl<R, E> Drop for Done<R, E> {
    fn drop(&mut self) {
        if self.pending.is_some() {
            warn!(
                task = self.seq,
                "Completion handle dropped without completing; worker slot stays occupied"
            );
        }
    }
}

impl<R, E> fmt::Debug for Done<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done")
            .field("seq", &self.seq)
            .field("completed", &self.pending.is_none())
            .finish()
    }
}
