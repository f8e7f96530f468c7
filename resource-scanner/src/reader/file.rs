use std::any::Any;
use std::fs::File;
use std::io;
use std::path::Path;

use tracing::debug;

use super::{ReaderError, ReaderResult, ResourceReader, CLASSPATH_PREFIX, URL_PREFIX};
use crate::vfs::FileReader;

pub const FILE_PREFIX: &str = "file:";

/// Plain files, with or without a `file:` prefix. Runs last.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileResourceReader;

fn strip_prefix(path: &str) -> &str {
    match path.get(..FILE_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(FILE_PREFIX) => &path[FILE_PREFIX.len()..],
        _ => path,
    }
}

impl ResourceReader for FileResourceReader {
    fn name(&self) -> &str {
        "file"
    }

    fn order(&self) -> i64 {
        i64::MAX
    }

    fn can_read(&self, path: &str, _context: Option<&dyn Any>) -> bool {
        let lower = path.to_ascii_lowercase();
        !path.starts_with(CLASSPATH_PREFIX)
            && !path.starts_with(URL_PREFIX)
            && !lower.starts_with("http:")
            && !lower.starts_with("https:")
    }

    fn exists(&self, path: &str, _context: Option<&dyn Any>) -> bool {
        let path = Path::new(strip_prefix(path));
        path.is_file() && File::open(path).is_ok()
    }

    fn load(&self, path: &str, _context: Option<&dyn Any>) -> ReaderResult<Option<FileReader>> {
        let path = strip_prefix(path);
        debug!(path, "Opening file");

        match File::open(path) {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ReaderError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }
}
