//! Deferred execution for autostarted processing.
//!
//! A push with autostart must not drive dispatch from inside the push call
//! itself. The queue hands a job to its [`Scheduler`], which runs it once the
//! caller's turn has finished.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{error, warn};

use crate::error::{QueueError, QueueResult};

/// Thread name of the background runtime used when no runtime is current.
pub(crate) const BACKGROUND_THREAD: &str = "taskq-runtime";

static BACKGROUND: Mutex<Option<Runtime>> = parking_lot::const_mutex(None);

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs after the current call stack has returned.
pub trait Scheduler: Send + Sync {
    /// Queue a job for a later tick.
    fn defer(&self, job: Job);
}

/// Scheduler backed by the ambient tokio runtime.
///
/// On a current-thread runtime a deferred job runs at the next await point of
/// the caller. Outside any runtime, jobs go to a single background runtime
/// shared by every queue in the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn defer(&self, job: Job) {
        match runtime_handle() {
            Ok(handle) => {
                handle.spawn(async move { job() });
            }
            Err(err) => {
                error!(error = %err, "Dropping deferred job");
            }
        }
    }
}

/// Handle to the current tokio runtime, or to the shared background runtime
/// when the caller is outside one.
pub(crate) fn runtime_handle() -> QueueResult<Handle> {
    if let Ok(handle) = Handle::try_current() {
        return Ok(handle);
    }

    let mut background = BACKGROUND.lock();
    if let Some(runtime) = background.as_ref() {
        return Ok(runtime.handle().clone());
    }

    warn!("No tokio runtime in context, starting background runtime");
    let runtime = Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name(BACKGROUND_THREAD)
        .enable_all()
        .build()
        .map_err(QueueError::Runtime)?;
    let handle = runtime.handle().clone();
    *background = Some(runtime);
    Ok(handle)
}

/// Scheduler with an explicit tick, driven by its owner.
///
/// Jobs accumulate until [`TickScheduler::run_pending`] is called. Jobs
/// deferred while a tick runs wait for the following tick.
#[derive(Clone, Default)]
pub struct TickScheduler {
    pending: Arc<Mutex<VecDeque<Job>>>,
}

impl TickScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs waiting for the next tick.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Run every job queued before this call. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let jobs: Vec<Job> = self.pending.lock().drain(..).collect();
        let count = jobs.len();
        for job in jobs {
            job();
        }
        count
    }
}

impl Scheduler for TickScheduler {
    fn defer(&self, job: Job) {
        self.pending.lock().push_back(job);
    }
}

impl fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}
