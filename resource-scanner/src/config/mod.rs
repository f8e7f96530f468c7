//! Scanner configuration.
//!
//! Settings come from three layers, later ones overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. The `[scan]` section of an INI file, found at `$RESOURCE_SCANNER_CONFIG`
//!    or `<config dir>/resource-scanner/config.ini`
//! 3. Environment variables (`RESOURCE_SCANNER_PATH`,
//!    `RESOURCE_SCANNER_PARALLEL`, `RESOURCE_SCANNER_THREADS`)
//!
//! ```ini
//! [scan]
//! search_path = /opt/app/classes:/opt/app/lib/core.jar
//! parallel = true
//! threads = 4
//! skip_class_files = true
//! skip_meta_inf = true
//! ```

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ini::Ini;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::walker::PathFilter;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "RESOURCE_SCANNER_CONFIG";
/// Environment variable holding a path list that replaces the search path.
pub const PATH_ENV: &str = "RESOURCE_SCANNER_PATH";
pub const PARALLEL_ENV: &str = "RESOURCE_SCANNER_PARALLEL";
pub const THREADS_ENV: &str = "RESOURCE_SCANNER_THREADS";

const SECTION: &str = "scan";

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("failed to write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("cannot determine the user configuration directory")]
    NoConfigDir,
}

/// Settings for building a [`ResourceWalker`](crate::ResourceWalker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannerConfig {
    /// Directories and archive files forming the application context.
    pub search_path: Vec<PathBuf>,
    /// Also scan the directory holding the running executable.
    pub include_deployment_dir: bool,
    /// Also scan the calling thread's current context, when one is set.
    pub include_current_context: bool,
    pub parallel: bool,
    /// Worker threads for parallel scans; rayon's default when `None`.
    pub threads: Option<usize>,
    pub filter: PathFilter,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            search_path: Vec::new(),
            include_deployment_dir: false,
            include_current_context: true,
            parallel: false,
            threads: None,
            filter: PathFilter::default(),
        }
    }
}

impl ScannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_path<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_path = roots.into_iter().map(Into::into).collect();
        self
    }

    /// Append one root to the search path.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_path.push(root.into());
        self
    }

    pub fn with_deployment_dir(mut self, include: bool) -> Self {
        self.include_deployment_dir = include;
        self
    }

    pub fn with_current_context(mut self, include: bool) -> Self {
        self.include_current_context = include;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    /// `<config dir>/resource-scanner/config.ini`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("resource-scanner").join("config.ini"))
    }

    /// The config file in effect: `$RESOURCE_SCANNER_CONFIG` or the default.
    pub fn config_path() -> Option<PathBuf> {
        env::var_os(CONFIG_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(Self::default_path)
    }

    /// Defaults overlaid with the config file, if present, and the
    /// environment.
    pub fn from_environment() -> ConfigResult<Self> {
        let mut config = Self::default();
        if let Some(path) = Self::config_path().filter(|p| p.is_file()) {
            config.apply_file(&path)?;
        }
        config.apply_vars(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Defaults overlaid with one config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply_file(path)?;
        Ok(config)
    }

    /// Overlay the `[scan]` section of an INI file.
    pub fn apply_file(&mut self, path: &Path) -> ConfigResult<()> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded scanner config file");
        self.apply_ini(&ini)
    }

    fn apply_ini(&mut self, ini: &Ini) -> ConfigResult<()> {
        let Some(section) = ini.section(Some(SECTION)) else {
            return Ok(());
        };

        if let Some(value) = section.get("search_path") {
            self.search_path = env::split_paths(value)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Some(value) = section.get("include_deployment_dir") {
            self.include_deployment_dir = parse_bool("include_deployment_dir", value)?;
        }
        if let Some(value) = section.get("include_current_context") {
            self.include_current_context = parse_bool("include_current_context", value)?;
        }
        if let Some(value) = section.get("parallel") {
            self.parallel = parse_bool("parallel", value)?;
        }
        if let Some(value) = section.get("threads") {
            self.threads = parse_threads("threads", value)?;
        }
        if let Some(value) = section.get("skip_class_files") {
            self.filter.skip_class_files = parse_bool("skip_class_files", value)?;
        }
        if let Some(value) = section.get("skip_meta_inf") {
            self.filter.skip_meta_inf = parse_bool("skip_meta_inf", value)?;
        }
        Ok(())
    }

    /// Overlay environment variables read through `lookup`.
    pub fn apply_vars<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(PATH_ENV) {
            self.search_path = env::split_paths(&value)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Some(value) = lookup(PARALLEL_ENV) {
            self.parallel = parse_bool(PARALLEL_ENV, &value)?;
        }
        if let Some(value) = lookup(THREADS_ENV) {
            self.threads = parse_threads(THREADS_ENV, &value)?;
        }
        Ok(())
    }

    /// Write the settings to `path` as an INI file, creating parent
    /// directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        let search_path = env::join_paths(&self.search_path).map_err(|e| ConfigError::InvalidValue {
            key: "search_path".to_string(),
            value: e.to_string(),
            expected: "paths without the path-list separator",
        })?;

        let mut ini = Ini::new();
        ini.with_section(Some(SECTION))
            .set("search_path", search_path.to_string_lossy())
            .set("include_deployment_dir", self.include_deployment_dir.to_string())
            .set("include_current_context", self.include_current_context.to_string())
            .set("parallel", self.parallel.to_string())
            .set(
                "threads",
                self.threads.map(|t| t.to_string()).unwrap_or_default(),
            )
            .set("skip_class_files", self.filter.skip_class_files.to_string())
            .set("skip_meta_inf", self.filter.skip_meta_inf.to_string());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        ini.write_to_file(path).map_err(write_error)?;
        debug!(path = %path.display(), "Saved scanner config file");
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "a boolean",
        }),
    }
}

/// Empty means "use the default".
fn parse_threads(key: &str, value: &str) -> ConfigResult<Option<usize>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    match value.parse::<usize>() {
        Ok(threads) if threads > 0 => Ok(Some(threads)),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "a positive integer",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ScannerConfig::default();
        assert!(config.search_path.is_empty());
        assert!(!config.include_deployment_dir);
        assert!(config.include_current_context);
        assert!(!config.parallel);
        assert_eq!(config.threads, None);
        assert_eq!(config.filter, PathFilter::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.ini");

        let config = ScannerConfig::new()
            .with_search_path([temp.path().join("classes"), temp.path().join("lib.jar")])
            .with_parallel(true)
            .with_threads(Some(3))
            .with_filter(PathFilter::default().with_skip_meta_inf(false));
        config.save(&path).unwrap();

        assert_eq!(ScannerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[scan]\nparallel = yes\n").unwrap();

        let config = ScannerConfig::load(&path).unwrap();
        assert!(config.parallel);
        assert!(config.include_current_context);
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_invalid_bool_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[scan]\nparallel = sometimes\n").unwrap();

        let err = ScannerConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "parallel"));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let err = ScannerConfig::load(&temp.path().join("absent.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let temp = TempDir::new().unwrap();
        let joined = env::join_paths([temp.path().join("a"), temp.path().join("b")]).unwrap();
        let vars: HashMap<&str, String> = HashMap::from([
            (PATH_ENV, joined.to_string_lossy().into_owned()),
            (PARALLEL_ENV, "true".to_string()),
            (THREADS_ENV, "2".to_string()),
        ]);

        let mut config = ScannerConfig::new().with_root("/ignored");
        config.apply_vars(|key| vars.get(key).cloned()).unwrap();

        assert_eq!(
            config.search_path,
            vec![temp.path().join("a"), temp.path().join("b")]
        );
        assert!(config.parallel);
        assert_eq!(config.threads, Some(2));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let mut config = ScannerConfig::new();
        let result = config.apply_vars(|key| (key == THREADS_ENV).then(|| "0".to_string()));
        assert!(result.is_err());
    }
}
