//! Bounded-concurrency FIFO queue.
//!
//! The queue owns the backlog and the worker count. Items are handed to the
//! iterator in push order, never more than `concurrency` at a time, and the
//! first reported error latches the queue so nothing else is dispatched.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace, warn};

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::hooks::{ErrorHook, Hook, Hooks};
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::stats::{Counters, QueueStats};
use crate::task::{Callback, CompletionSink, Done, Entry};

/// Function processing one task. It must complete the [`Done`] handle once.
pub type IteratorFn<T, R, E> = Arc<dyn Fn(T, Done<R, E>) + Send + Sync>;

const DEFAULT_NAME: &str = "queue";

struct State<T, R, E> {
    tasks: VecDeque<Entry<T, R, E>>,
    workers: usize,
    errored: bool,
    paused: bool,
    /// Set while one caller runs the dispatch loop.
    dispatching: bool,
    /// Set by a dispatch, cleared when `drain` fires for the following idle.
    drain_armed: bool,
    next_seq: u64,
}

impl<T, R, E> State<T, R, E> {
    fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
            workers: 0,
            errored: false,
            paused: false,
            dispatching: false,
            drain_armed: false,
            next_seq: 0,
        }
    }
}

pub(crate) struct Inner<T, R, E> {
    name: String,
    concurrency: usize,
    iterator: IteratorFn<T, R, E>,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<State<T, R, E>>,
    hooks: RwLock<Hooks<E>>,
    counters: Counters,
}

/// Resets the dispatching flag if the iterator or a hook panics mid-loop.
struct DispatchGuard<'a, T, R, E>(&'a Inner<T, R, E>);

impl<T, R, E> Drop for DispatchGuard<'_, T, R, E> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.state.lock().dispatching = false;
        }
    }
}

impl<T, R, E> Inner<T, R, E>
where
    T: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    fn process(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.dispatching {
                trace!(queue = %self.name, "Dispatch already in progress");
                return;
            }
            state.dispatching = true;
        }
        let _guard = DispatchGuard(&**self);

        loop {
            let (entry, now_empty, workers) = {
                let mut state = self.state.lock();
                if state.paused || state.errored || state.workers >= self.concurrency {
                    state.dispatching = false;
                    return;
                }
                let Some(entry) = state.tasks.pop_front() else {
                    state.dispatching = false;
                    return;
                };
                state.workers += 1;
                state.drain_armed = true;
                (entry, state.tasks.is_empty(), state.workers)
            };

            if now_empty {
                let hook = self.hooks.read().empty.clone();
                if let Some(hook) = hook {
                    debug!(queue = %self.name, "Backlog empty");
                    hook();
                }
            }

            self.counters.record_dispatched();
            debug!(queue = %self.name, task = entry.seq, workers, "Dispatching task");

            let sink: Arc<dyn CompletionSink<R, E>> = self.clone();
            (self.iterator)(entry.task, Done::new(entry.seq, sink, entry.callback));
        }
    }
}

impl<T, R, E> CompletionSink<R, E> for Inner<T, R, E>
where
    T: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    fn complete(self: Arc<Self>, seq: u64, callback: Option<Callback<R, E>>, result: Result<R, E>) {
        {
            let mut state = self.state.lock();
            state.workers -= 1;
            if state.errored {
                drop(state);
                self.counters.record_dropped();
                debug!(queue = %self.name, task = seq, "Discarding completion after error");
                return;
            }
            if result.is_err() {
                state.errored = true;
            }
        }

        if let Some(callback) = &callback {
            callback(&result);
        }

        if let Err(err) = &result {
            self.counters.record_failed();
            warn!(queue = %self.name, task = seq, "Task failed, halting queue");
            let hook = self.hooks.read().on_error.clone();
            if let Some(hook) = hook {
                hook(err);
            }
            return;
        }

        self.counters.record_completed();
        debug!(queue = %self.name, task = seq, "Task completed");

        let drain = {
            let mut state = self.state.lock();
            if state.tasks.is_empty() && state.workers == 0 && state.drain_armed {
                let hook = self.hooks.read().drain.clone();
                if hook.is_some() {
                    state.drain_armed = false;
                }
                hook
            } else {
                None
            }
        };

        match drain {
            Some(hook) => {
                info!(queue = %self.name, "Queue drained");
                hook();
            }
            None => self.process(),
        }
    }
}

/// Bounded-concurrency FIFO task queue.
///
/// Cloning yields another handle to the same queue.
pub struct Queue<T, R, E> {
    inner: Arc<Inner<T, R, E>>,
}

impl<T, R, E> Clone for Queue<T, R, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, R, E> Queue<T, R, E>
where
    T: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    /// Create a queue with the default concurrency of 10.
    pub fn new<F>(iterator: F) -> Self
    where
        F: Fn(T, Done<R, E>) + Send + Sync + 'static,
    {
        Self::from_parts(
            Arc::new(iterator),
            QueueConfig::default(),
            Arc::new(TokioScheduler),
        )
    }

    /// Create a queue running at most `concurrency` tasks at once.
    pub fn with_concurrency<F>(iterator: F, concurrency: usize) -> QueueResult<Self>
    where
        F: Fn(T, Done<R, E>) + Send + Sync + 'static,
    {
        QueueBuilder::new(iterator).concurrency(concurrency).build()
    }

    /// Start building a queue.
    pub fn builder<F>(iterator: F) -> QueueBuilder<T, R, E>
    where
        F: Fn(T, Done<R, E>) + Send + Sync + 'static,
    {
        QueueBuilder::new(iterator)
    }

    fn from_parts(
        iterator: IteratorFn<T, R, E>,
        config: QueueConfig,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: config.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
                concurrency: config.concurrency,
                iterator,
                scheduler,
                state: Mutex::new(State::new()),
                hooks: RwLock::new(Hooks::default()),
                counters: Counters::default(),
            }),
        }
    }

    /// Queue a single task without a callback.
    pub fn push(&self, item: T) {
        self.enqueue(std::iter::once(item), None, false);
    }

    /// Queue several tasks, in order, without a callback.
    pub fn push_all<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.enqueue(items, None, false);
    }

    /// Queue several tasks and schedule processing for each of them.
    pub fn push_and_process<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.enqueue(items, None, true);
    }

    /// Queue tasks with a completion callback shared by every item.
    ///
    /// The callback receives each task's result unless the queue errored
    /// before that task completed. With `autostart`, a deferred
    /// [`process`](Self::process) call is scheduled after every item has
    /// been queued.
    pub fn push_with<I, C>(&self, items: I, callback: C, autostart: bool)
    where
        I: IntoIterator<Item = T>,
        C: Fn(&Result<R, E>) + Send + Sync + 'static,
    {
        let callback: Callback<R, E> = Arc::new(callback);
        self.enqueue(items, Some(callback), autostart);
    }

    fn enqueue<I>(&self, items: I, callback: Option<Callback<R, E>>, autostart: bool)
    where
        I: IntoIterator<Item = T>,
    {
        let mut pushed = 0usize;
        for task in items {
            pushed += 1;
            let saturated = {
                let mut state = self.inner.state.lock();
                let seq = state.next_seq;
                state.next_seq += 1;
                state.tasks.push_back(Entry {
                    seq,
                    task,
                    callback: callback.clone(),
                });
                debug!(
                    queue = %self.inner.name,
                    task = seq,
                    pending = state.tasks.len(),
                    "Task pushed"
                );
                state.tasks.len() == self.inner.concurrency
            };

            if saturated {
                let hook = self.inner.hooks.read().saturated.clone();
                if let Some(hook) = hook {
                    debug!(queue = %self.inner.name, "Backlog saturated");
                    hook();
                }
            }
        }

        // One deferred pass covers every item, since `process` fills all
        // free slots. It is issued only once the whole input is queued.
        if autostart && pushed > 0 {
            let queue = self.clone();
            self.inner.scheduler.defer(Box::new(move || queue.process()));
        }
    }

    /// Dispatch queued tasks until the concurrency limit is reached.
    ///
    /// Does nothing while paused, after an error, or with an empty backlog.
    pub fn process(&self) {
        self.inner.process();
    }

    /// Stop dispatching new tasks. In-flight tasks still complete.
    pub fn pause(&self) {
        self.inner.state.lock().paused = true;
        info!(queue = %self.inner.name, "Queue paused");
    }

    /// Allow dispatch again. Call [`process`](Self::process) to restart it.
    pub fn resume(&self) {
        self.inner.state.lock().paused = false;
        info!(queue = %self.inner.name, "Queue resumed");
    }

    /// Set the hook called with the error that halts the queue.
    pub fn set_on_error<F>(&self, hook: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let hook: ErrorHook<E> = Arc::new(hook);
        self.inner.hooks.write().on_error = Some(hook);
    }

    /// Set the hook called when a push brings the backlog to the concurrency limit.
    pub fn set_saturated<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let hook: Hook = Arc::new(hook);
        self.inner.hooks.write().saturated = Some(hook);
    }

    /// Set the hook called when a dispatch empties the backlog.
    ///
    /// The dispatched task is already counted in [`workers`](Self::workers)
    /// when the hook runs.
    pub fn set_empty<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let hook: Hook = Arc::new(hook);
        self.inner.hooks.write().empty = Some(hook);
    }

    /// Set the hook called when the queue becomes idle without error.
    pub fn set_drain<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let hook: Hook = Arc::new(hook);
        self.inner.hooks.write().drain = Some(hook);
    }
}

impl<T, R, E> Queue<T, R, E> {
    /// Number of tasks waiting in the backlog.
    pub fn len(&self) -> usize {
        self.inner.state.lock().tasks.len()
    }

    /// Whether the backlog is empty. In-flight tasks are not counted.
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().tasks.is_empty()
    }

    /// Number of tasks currently in flight.
    pub fn workers(&self) -> usize {
        self.inner.state.lock().workers
    }

    /// Maximum number of tasks in flight.
    pub fn concurrency(&self) -> usize {
        self.inner.concurrency
    }

    /// Name used in log records.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// No backlog and nothing in flight.
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock();
        state.tasks.is_empty() && state.workers == 0
    }

    pub fn is_paused(&self) -> bool {
        self.inner.state.lock().paused
    }

    /// Whether a task error has halted the queue.
    pub fn is_errored(&self) -> bool {
        self.inner.state.lock().errored
    }

    pub fn clear_on_error(&self) {
        self.inner.hooks.write().on_error = None;
    }

    pub fn clear_saturated(&self) {
        self.inner.hooks.write().saturated = None;
    }

    pub fn clear_empty(&self) {
        self.inner.hooks.write().empty = None;
    }

    pub fn clear_drain(&self) {
        self.inner.hooks.write().drain = None;
    }

    /// Snapshot of the queue's state and counters.
    pub fn stats(&self) -> QueueStats {
        let state = self.inner.state.lock();
        self.inner
            .counters
            .snapshot(state.tasks.len(), state.workers, state.paused, state.errored)
    }
}

impl<T, R, E> fmt::Debug for Queue<T, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Queue")
            .field("name", &self.inner.name)
            .field("concurrency", &self.inner.concurrency)
            .field("pending", &state.tasks.len())
            .field("workers", &state.workers)
            .field("paused", &state.paused)
            .field("errored", &state.errored)
            .finish()
    }
}

/// Builder for [`Queue`].
pub struct QueueBuilder<T, R, E> {
    iterator: IteratorFn<T, R, E>,
    config: QueueConfig,
    scheduler: Option<Arc<dyn Scheduler>>,
    startup_error: Option<QueueError>,
}

impl<T, R, E> QueueBuilder<T, R, E>
where
    T: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    /// Create a builder around an iterator function.
    pub fn new<F>(iterator: F) -> Self
    where
        F: Fn(T, Done<R, E>) + Send + Sync + 'static,
    {
        Self {
            iterator: Arc::new(iterator),
            config: QueueConfig::default(),
            scheduler: None,
            startup_error: None,
        }
    }

    /// Builder whose `build` reports `err`.
    pub(crate) fn failed(err: QueueError) -> Self {
        let mut builder = Self::new(|_: T, _: Done<R, E>| {});
        builder.startup_error = Some(err);
        builder
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the concurrency limit.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Set the name used in log records.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    /// Use a custom scheduler for autostarted processing.
    pub fn scheduler<S>(mut self, scheduler: S) -> Self
    where
        S: Scheduler + 'static,
    {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    /// Validate the configuration and build the queue.
    pub fn build(self) -> QueueResult<Queue<T, R, E>> {
        if let Some(err) = self.startup_error {
            return Err(err);
        }
        self.config.validate()?;
        let scheduler = self.scheduler.unwrap_or_else(|| Arc::new(TokioScheduler));
        Ok(Queue::from_parts(self.iterator, self.config, scheduler))
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
