//! Pluggable task execution for scans.
//!
//! Scans run sequentially unless a [`TaskExecutor`] is supplied. An executor
//! accepts boxed units of work and hands back a [`TaskHandle`] the caller
//! joins on. [`RayonExecutor`] runs units on a dedicated rayon pool.
//!
//! A process-wide executor can be installed once with [`install_executor`];
//! walkers built from configuration pick it up when parallel scanning is
//! requested.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;

use parking_lot::{const_rwlock, RwLock};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;

/// A unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Failure observed when joining a task.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task was dropped before it completed")]
    Abandoned,
}

/// Runs submitted tasks.
pub trait TaskExecutor: Send + Sync {
    /// Short name used in logs and summaries.
    fn name(&self) -> &str;

    fn submit(&self, task: Task) -> TaskHandle;
}

/// Join handle for a submitted task.
#[derive(Debug)]
pub struct TaskHandle {
    rx: mpsc::Receiver<Result<(), TaskError>>,
}

/// Completion side of a [`TaskHandle`], held by whoever runs the task.
///
/// Dropping it without completing makes the handle report
/// [`TaskError::Abandoned`].
#[derive(Debug)]
pub struct TaskCompletion {
    tx: mpsc::SyncSender<Result<(), TaskError>>,
}

impl TaskHandle {
    pub fn pair() -> (TaskCompletion, TaskHandle) {
        let (tx, rx) = mpsc::sync_channel(1);
        (TaskCompletion { tx }, TaskHandle { rx })
    }

    /// Block until the task finishes.
    pub fn wait(self) -> Result<(), TaskError> {
        self.rx.recv().unwrap_or(Err(TaskError::Abandoned))
    }
}

impl TaskCompletion {
    pub fn complete(self, result: Result<(), TaskError>) {
        // The handle may already be gone; nobody is waiting then.
        let _ = self.tx.send(result);
    }

    /// Run `task`, catching panics, and report the outcome.
    pub fn run(self, task: Task) {
        self.complete(run_catching(task));
    }
}

/// Run a unit of work, turning a panic into [`TaskError::Panicked`].
pub fn run_catching<F: FnOnce()>(task: F) -> Result<(), TaskError> {
    panic::catch_unwind(AssertUnwindSafe(task))
        .map_err(|payload| TaskError::Panicked(panic_message(&*payload)))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Executor backed by a dedicated rayon thread pool.
pub struct RayonExecutor {
    pool: ThreadPool,
}

impl RayonExecutor {
    /// Build a pool with `threads` workers, or rayon's default when `None`.
    pub fn new(threads: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        let mut builder =
            ThreadPoolBuilder::new().thread_name(|index| format!("resource-scan-{}", index));
        if let Some(threads) = threads {
            builder = builder.num_threads(threads);
        }
        Ok(Self {
            pool: builder.build()?,
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl TaskExecutor for RayonExecutor {
    fn name(&self) -> &str {
        "rayon"
    }

    fn submit(&self, task: Task) -> TaskHandle {
        let (completion, handle) = TaskHandle::pair();
        self.pool.spawn(move || completion.run(task));
        handle
    }
}

impl std::fmt::Debug for RayonExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RayonExecutor")
            .field("threads", &self.threads())
            .finish()
    }
}

static INSTALLED_EXECUTOR: RwLock<Option<Arc<dyn TaskExecutor>>> = const_rwlock(None);

/// Install the process-wide executor. The first installation wins; later
/// calls return `false` and leave it unchanged.
pub fn install_executor(executor: Arc<dyn TaskExecutor>) -> bool {
    let mut slot = INSTALLED_EXECUTOR.write();
    if slot.is_some() {
        return false;
    }
    *slot = Some(executor);
    true
}

pub fn installed_executor() -> Option<Arc<dyn TaskExecutor>> {
    INSTALLED_EXECUTOR.read().clone()
}
