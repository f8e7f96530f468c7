//! `config` subcommands.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use resource_scanner::{ConfigError, ScannerConfig};

use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration (file plus environment)
    Show,

    /// Print the path of the configuration file
    Path,

    /// Replace the search path stored in the configuration file
    SetPath {
        /// Directories and archives, in search order
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_show(),
        ConfigCommands::Path => run_path(),
        ConfigCommands::SetPath { paths } => run_set_path(paths),
    }
}

fn run_show() -> Result<(), CliError> {
    let config = ScannerConfig::from_environment()?;
    print!("{}", render(&config));
    Ok(())
}

fn run_path() -> Result<(), CliError> {
    let path = ScannerConfig::config_path().ok_or(ConfigError::NoConfigDir)?;
    println!("{}", path.display());
    Ok(())
}

fn run_set_path(paths: Vec<PathBuf>) -> Result<(), CliError> {
    let config_path = ScannerConfig::config_path().ok_or(ConfigError::NoConfigDir)?;
    let config = set_search_path(&config_path, paths)?;

    println!("Set search_path = {}", join(&config.search_path));
    println!("Saved to {}", config_path.display());
    Ok(())
}

/// Load `config_path` if it exists, replace its search path and save it.
fn set_search_path(config_path: &Path, paths: Vec<PathBuf>) -> Result<ScannerConfig, CliError> {
    let mut config = if config_path.is_file() {
        ScannerConfig::load(config_path)?
    } else {
        ScannerConfig::default()
    };

    config.search_path = paths
        .into_iter()
        .map(|p| fs::canonicalize(&p).unwrap_or(p))
        .collect();
    config.save(config_path)?;
    Ok(config)
}

fn render(config: &ScannerConfig) -> String {
    let threads = config
        .threads
        .map(|t| t.to_string())
        .unwrap_or_else(|| "auto".to_string());

    let mut out = String::from("[scan]\n");
    out.push_str(&format!("search_path = {}\n", join(&config.search_path)));
    out.push_str(&format!(
        "include_deployment_dir = {}\n",
        config.include_deployment_dir
    ));
    out.push_str(&format!(
        "include_current_context = {}\n",
        config.include_current_context
    ));
    out.push_str(&format!("parallel = {}\n", config.parallel));
    out.push_str(&format!("threads = {}\n", threads));
    out.push_str(&format!(
        "skip_class_files = {}\n",
        config.filter.skip_class_files
    ));
    out.push_str(&format!("skip_meta_inf = {}\n", config.filter.skip_meta_inf));
    out
}

fn join(paths: &[PathBuf]) -> String {
    env::join_paths(paths)
        .map(|joined| joined.to_string_lossy().into_owned())
        .unwrap_or_else(|_| {
            paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_lists_scan_section() {
        let config = ScannerConfig::default().with_root("/app/classes");
        let text = render(&config);

        assert!(text.starts_with("[scan]\n"));
        assert!(text.contains("search_path = /app/classes\n"));
        assert!(text.contains("threads = auto\n"));
        assert!(text.contains("skip_meta_inf = true\n"));
    }

    #[test]
    fn test_set_search_path_preserves_other_settings() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("nested").join("config.ini");
        let root = dir.path().join("classes");
        fs::create_dir(&root).unwrap();

        ScannerConfig::default()
            .with_parallel(true)
            .with_threads(Some(3))
            .save(&config_path)
            .unwrap();

        let updated = set_search_path(&config_path, vec![root.clone()]).unwrap();
        assert_eq!(updated.search_path, vec![fs::canonicalize(&root).unwrap()]);

        let reloaded = ScannerConfig::load(&config_path).unwrap();
        assert_eq!(reloaded, updated);
        assert!(reloaded.parallel);
        assert_eq!(reloaded.threads, Some(3));
    }

    #[test]
    fn test_set_search_path_keeps_missing_paths_verbatim() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.ini");
        let missing = dir.path().join("not-yet-built.jar");

        let updated = set_search_path(&config_path, vec![missing.clone()]).unwrap();
        assert_eq!(updated.search_path, vec![missing]);
        assert!(config_path.is_file());
    }
}
