//! # taskq
//!
//! Bounded-concurrency task queue.
//!
//! Callers push work items; the queue hands them, in push order, to a
//! processing function (the *iterator*) while keeping at most `concurrency`
//! of them in flight. The iterator reports back through the [`Done`] handle it
//! receives with each task.
//!
//! ## Features
//!
//! - FIFO dispatch with a fixed concurrency ceiling
//! - Per-push completion callbacks
//! - Lifecycle hooks: `saturated`, `empty`, `drain`, `on_error`
//! - Halt on first error: a failed task latches the queue for good
//! - Pause/resume of dispatch
//! - Deferred autostart through a pluggable [`Scheduler`]
//! - Async handlers on tokio via [`TaskHandler`]
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! use taskq::{Done, Queue};
//!
//! let queue = Queue::with_concurrency(|n: u32, done: Done<u32, String>| done.ok(n * 2), 2).unwrap();
//!
//! let total = Arc::new(AtomicU32::new(0));
//! let sum = total.clone();
//! queue.push_with(
//!     vec![1, 2, 3],
//!     move |result: &Result<u32, String>| {
//!         if let Ok(value) = result {
//!             sum.fetch_add(*value, Ordering::SeqCst);
//!         }
//!     },
//!     false,
//! );
//! queue.process();
//!
//! assert_eq!(total.load(Ordering::SeqCst), 12);
//! assert!(queue.is_idle());
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod queue;
pub mod scheduler;
pub mod stats;
pub mod task;

pub use config::{QueueConfig, DEFAULT_CONCURRENCY};
pub use error::{QueueError, QueueResult};
pub use handler::TaskHandler;
pub use hooks::{ErrorHook, Hook};
pub use queue::{IteratorFn, Queue, QueueBuilder};
pub use scheduler::{Job, Scheduler, TickScheduler, TokioScheduler};
pub use stats::QueueStats;
pub use task::{Callback, Done};
