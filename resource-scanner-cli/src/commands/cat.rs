//! `cat` command.

use std::io::{self, Write};
use std::sync::Arc;

use resource_scanner::reader::CLASSPATH_PREFIX;
use resource_scanner::ResourceUtil;

use super::ScanOptions;
use crate::error::CliError;

pub fn run(options: &ScanOptions, resource: &str) -> Result<(), CliError> {
    let util = if resource.starts_with(CLASSPATH_PREFIX) {
        ResourceUtil::with_scanner(Arc::new(options.scanner()?))
    } else {
        ResourceUtil::new()
    };

    let Some(mut stream) = util.get_stream(resource, None)? else {
        return Err(CliError::NotFound(resource.to_string()));
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    io::copy(&mut stream, &mut out)?;
    out.flush()?;
    Ok(())
}
