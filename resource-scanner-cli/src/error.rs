//! CLI error type.

use std::io;

use resource_scanner::reader::ReaderError;
use resource_scanner::{ConfigError, ScanError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(
        "no search path configured; pass --path, set RESOURCE_SCANNER_PATH, \
         or run 'resource-scanner config set-path'"
    )]
    NoSearchPath,

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("invalid glob pattern '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}
