//! Async task handlers.
//!
//! Adapts `async` processing functions to the queue's callback contract: every
//! dispatched task is spawned on a tokio runtime and its output completes
//! the task's [`Done`] handle.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::QueueResult;
use crate::queue::{Queue, QueueBuilder};
use crate::scheduler::runtime_handle;
use crate::task::Done;

/// Asynchronous task processor.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Task payload.
    type Task: Send + 'static;
    /// Value produced on success.
    type Output: Send + 'static;
    /// Error reported on failure.
    type Error: Send + 'static;

    /// Process one task.
    async fn handle(&self, task: Self::Task) -> Result<Self::Output, Self::Error>;
}

impl<T, R, E> QueueBuilder<T, R, E>
where
    T: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    /// Create a builder whose tasks are processed by an async handler.
    ///
    /// Tasks are spawned on the runtime current at this call. Outside one they
    /// go to a shared background runtime; if that cannot start, `build` fails.
    pub fn from_handler<H>(handler: Arc<H>) -> Self
    where
        H: TaskHandler<Task = T, Output = R, Error = E> + 'static,
    {
        match runtime_handle() {
            Ok(runtime) => Self::new(move |task: T, done: Done<R, E>| {
                let handler = handler.clone();
                runtime.spawn(async move {
                    done.complete(handler.handle(task).await);
                });
            }),
            Err(err) => Self::failed(err),
        }
    }

    /// Create a builder whose tasks are processed by an async function.
    ///
    /// Spawns on the same runtime as [`from_handler`](Self::from_handler).
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        match runtime_handle() {
            Ok(runtime) => Self::new(move |task: T, done: Done<R, E>| {
                let fut = f(task);
                runtime.spawn(async move {
                    done.complete(fut.await);
                });
            }),
            Err(err) => Self::failed(err),
        }
    }
}

impl<T, R, E> Queue<T, R, E>
where
    T: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    /// Create a queue processing tasks with an async handler.
    pub fn from_handler<H>(handler: Arc<H>, concurrency: usize) -> QueueResult<Self>
    where
        H: TaskHandler<Task = T, Output = R, Error = E> + 'static,
    {
        QueueBuilder::from_handler(handler)
            .concurrency(concurrency)
            .build()
    }

    /// Create a queue processing tasks with an async function.
    pub fn from_fn<F, Fut>(f: F, concurrency: usize) -> QueueResult<Self>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        QueueBuilder::from_fn(f).concurrency(concurrency).build()
    }
}
