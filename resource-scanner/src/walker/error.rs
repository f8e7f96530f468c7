//! Scan error types.

use rayon::ThreadPoolBuildError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::executor::TaskError;
use crate::store::StoreError;
use crate::vfs::VfsError;

/// Result type for scans and queries.
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that reach the caller of a scan or query.
///
/// Failures confined to a single locator are logged and skipped; they never
/// show up here.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Vfs(#[from] VfsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid resource pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A scan unit panicked or was dropped by its executor.
    #[error("scan task for {locator} failed: {source}")]
    TaskFailed {
        locator: String,
        #[source]
        source: TaskError,
    },

    #[error("failed to start scan thread pool: {0}")]
    ThreadPool(#[from] ThreadPoolBuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The shared scanner was requested by a component taking part in the
    /// scan that builds it.
    #[error("shared resource scanner requested while it is being built")]
    ReentrantInstance,
}
