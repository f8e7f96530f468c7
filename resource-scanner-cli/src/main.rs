//! Resource Scanner CLI - Command-line interface
//!
//! Scans a search path of directories and archives and answers queries
//! against the resulting index.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use commands::config::ConfigCommands;
use commands::ScanOptions;
use error::CliError;

#[derive(Debug, Parser)]
#[command(
    name = "resource-scanner",
    version,
    about = "Discover and query resources on a search path of directories and archives"
)]
struct Cli {
    /// Directory or archive to scan; repeat for several (overrides the configured search path)
    #[arg(short = 'p', long = "path", value_name = "PATH", global = true)]
    paths: Vec<PathBuf>,

    /// Scan locators in parallel
    #[arg(long, global = true)]
    parallel: bool,

    /// Worker threads for parallel scans
    #[arg(long, value_name = "N", global = true)]
    threads: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scan the search path and print a summary
    Scan {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List resource paths matching a regular expression
    Find {
        /// Pattern matched against whole resource paths
        pattern: String,

        /// Treat the pattern as a shell glob instead
        #[arg(long)]
        glob: bool,
    },

    /// List the origins of resource paths matching a regular expression
    Locate {
        /// Pattern matched against whole resource paths
        pattern: String,
    },

    /// Print whether a resource path exists
    Exists {
        /// Relative resource path
        path: String,
    },

    /// Print whether a resource path exists at exactly one origin
    Unique {
        /// Relative resource path
        path: String,
    },

    /// Write a resource to stdout (classpath:, url:, http(s): or a file path)
    Cat {
        /// Resource to read
        resource: String,
    },

    /// Inspect or change the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `RUST_LOG` takes precedence over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let options = ScanOptions {
        paths: cli.paths,
        parallel: cli.parallel,
        threads: cli.threads,
    };

    match cli.command {
        Commands::Scan { json } => commands::scan::run(&options, json),
        Commands::Find { pattern, glob } => commands::query::find(&options, &pattern, glob),
        Commands::Locate { pattern } => commands::query::locate(&options, &pattern),
        Commands::Exists { path } => commands::query::exists(&options, &path),
        Commands::Unique { path } => commands::query::unique(&options, &path),
        Commands::Cat { resource } => commands::cat::run(&options, &resource),
        Commands::Config(command) => commands::config::run(command),
    }
}
