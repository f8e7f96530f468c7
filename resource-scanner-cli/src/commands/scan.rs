//! `scan` command.

use super::ScanOptions;
use crate::error::CliError;

pub fn run(options: &ScanOptions, json: bool) -> Result<(), CliError> {
    let scanner = options.scanner()?;
    let summary = scanner.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!("{}", summary);
    }
    Ok(())
}
