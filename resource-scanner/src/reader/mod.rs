//! Content access for single resources.
//!
//! Discovery never reads file content. When a caller wants the bytes of one
//! resource, [`ResourceUtil`] picks a [`ResourceReader`] by path prefix:
//!
//! | Prefix | Reader | Order |
//! |--------|--------|-------|
//! | `classpath:` | [`SearchPathResourceReader`] | -50 |
//! | `url:`, `http:`, `https:` | [`UrlResourceReader`] | -20 |
//! | anything else, optional `file:` | [`FileResourceReader`] | last |
//!
//! Readers are tried in ascending order; custom readers default to order 0.
//! Every operation takes an optional context value that is handed to the
//! readers untouched.

mod classpath;
mod file;
mod url;

use std::any::Any;
use std::io;
use std::sync::{Arc, OnceLock};

use thiserror::Error;

use crate::scanner::ResourceScanner;
use crate::vfs::{FileReader, VfsError};
use crate::walker::ScanError;

pub use classpath::{SearchPathResourceReader, CLASSPATH_PREFIX};
pub use file::{FileResourceReader, FILE_PREFIX};
pub use url::{UrlResourceReader, URL_PREFIX};

pub(crate) use url::fetch_url;

/// Result type for resource reads.
pub type ReaderResult<T> = Result<T, ReaderError>;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Vfs(#[from] VfsError),
}

/// Loads resources addressed by a prefixed path.
pub trait ResourceReader: Send + Sync {
    fn name(&self) -> &str;

    /// Position in the reader chain; lower runs first.
    fn order(&self) -> i64 {
        0
    }

    fn can_read(&self, path: &str, context: Option<&dyn Any>) -> bool;

    fn exists(&self, path: &str, context: Option<&dyn Any>) -> bool;

    /// Open the resource, or `Ok(None)` when this reader cannot find it.
    fn load(&self, path: &str, context: Option<&dyn Any>) -> ReaderResult<Option<FileReader>>;
}

/// Ordered chain of resource readers.
pub struct ResourceUtil {
    readers: Vec<Arc<dyn ResourceReader>>,
}

impl ResourceUtil {
    /// The built-in readers; `classpath:` lookups use the process-wide
    /// scanner.
    pub fn new() -> Self {
        Self::with_search_path_reader(SearchPathResourceReader::new())
    }

    /// The built-in readers, answering `classpath:` lookups from `scanner`.
    pub fn with_scanner(scanner: Arc<ResourceScanner>) -> Self {
        Self::with_search_path_reader(SearchPathResourceReader::with_scanner(scanner))
    }

    fn with_search_path_reader(search_path: SearchPathResourceReader) -> Self {
        Self::empty()
            .with_reader(Arc::new(search_path))
            .with_reader(Arc::new(UrlResourceReader))
            .with_reader(Arc::new(FileResourceReader))
    }

    /// A chain without any readers.
    pub fn empty() -> Self {
        Self {
            readers: Vec::new(),
        }
    }

    /// Shared instance with the built-in readers.
    pub fn instance() -> &'static ResourceUtil {
        static INSTANCE: OnceLock<ResourceUtil> = OnceLock::new();
        INSTANCE.get_or_init(ResourceUtil::new)
    }

    /// Add a reader, keeping the chain sorted by order.
    pub fn with_reader(mut self, reader: Arc<dyn ResourceReader>) -> Self {
        self.readers.push(reader);
        self.readers.sort_by_key(|r| r.order());
        self
    }

    pub fn reader_names(&self) -> Vec<String> {
        self.readers.iter().map(|r| r.name().to_string()).collect()
    }

    /// Whether any reader accepts `path`.
    pub fn is_supported(&self, path: &str, context: Option<&dyn Any>) -> bool {
        !path.trim().is_empty() && self.readers.iter().any(|r| r.can_read(path, context))
    }

    pub fn resource_exists(&self, path: &str, context: Option<&dyn Any>) -> bool {
        self.readers.iter().any(|r| r.exists(path, context))
    }

    /// Stream from the first reader that accepts and finds `path`.
    pub fn get_stream(
        &self,
        path: &str,
        context: Option<&dyn Any>,
    ) -> ReaderResult<Option<FileReader>> {
        if path.trim().is_empty() {
            return Ok(None);
        }

        for reader in &self.readers {
            if !reader.can_read(path, context) {
                continue;
            }
            if let Some(stream) = reader.load(path, context)? {
                return Ok(Some(stream));
            }
        }
        Ok(None)
    }
}

impl Default for ResourceUtil {
    fn default() -> Self {
        Self::new()
    }
}
