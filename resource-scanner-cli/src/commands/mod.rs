//! Command implementations.

pub mod cat;
pub mod config;
pub mod query;
pub mod scan;

use std::path::PathBuf;

use resource_scanner::{ResourceScanner, ScannerConfig};
use tracing::debug;

use crate::error::CliError;

/// Scan settings taken from the global command-line options.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub paths: Vec<PathBuf>,
    pub parallel: bool,
    pub threads: Option<usize>,
}

impl ScanOptions {
    /// Effective configuration: file and environment, then command-line
    /// overrides.
    pub fn config(&self) -> Result<ScannerConfig, CliError> {
        let mut config = ScannerConfig::from_environment()?;
        if !self.paths.is_empty() {
            config.search_path = self.paths.clone();
        }
        if self.parallel {
            config.parallel = true;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
            config.parallel = true;
        }
        Ok(config)
    }

    /// Scan once with the effective configuration.
    pub fn scanner(&self) -> Result<ResourceScanner, CliError> {
        let config = self.config()?;
        if config.search_path.is_empty() && !config.include_deployment_dir {
            return Err(CliError::NoSearchPath);
        }
        debug!(
            roots = config.search_path.len(),
            parallel = config.parallel,
            "Scanning search path"
        );
        Ok(ResourceScanner::from_config(&config)?)
    }
}
