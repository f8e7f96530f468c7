//! Error types for virtual directories and locator resolution.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use zip::result::ZipError;

use crate::locator::LocatorError;

/// Result type for virtual filesystem operations.
pub type VfsResult<T> = Result<T, VfsError>;

/// Errors raised while resolving locators and walking virtual directories.
#[derive(Debug, Error)]
pub enum VfsError {
    /// No locator type was able to produce a directory for the locator.
    #[error("could not create a virtual directory for '{locator}': no matching locator type was found")]
    UnresolvedLocator { locator: String },

    /// A container path has no verifiable archive boundary.
    #[error("unable to identify the real archive file in path '{path}'")]
    AmbiguousArchivePath { path: String },

    /// A system directory root is missing, not a directory, or unreadable.
    #[error("cannot use directory {}: not an existing, readable directory", path.display())]
    InvalidDirectory { path: PathBuf },

    /// The archive could not be opened or its entries could not be read.
    #[error("archive error in {location}: {source}")]
    Archive {
        location: String,
        #[source]
        source: ZipError,
    },

    /// I/O failure while opening or reading a backing resource.
    #[error("I/O error in {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: io::Error,
    },

    /// A file requested through `open` does not exist in the directory.
    #[error("entry '{entry}' not found in {location}")]
    EntryNotFound { location: String, entry: String },

    /// The host environment does not provide a capability a locator type needs.
    #[error("host capability '{capability}' is not available to resolve '{locator}'")]
    HostUnavailable {
        capability: &'static str,
        locator: String,
    },

    /// Re-entrant resolution went deeper than allowed.
    #[error("resolving '{locator}' exceeded the maximum nesting depth of {depth}")]
    DepthExceeded { locator: String, depth: usize },

    /// A locator string could not be parsed.
    #[error(transparent)]
    InvalidLocator(#[from] LocatorError),
}

impl VfsError {
    pub(crate) fn io(location: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            location: location.into(),
            source,
        }
    }

    pub(crate) fn archive(location: impl Into<String>, source: ZipError) -> Self {
        Self::Archive {
            location: location.into(),
            source,
        }
    }

    /// Whether the resolver must stop instead of trying the next locator type.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousArchivePath { .. } | Self::DepthExceeded { .. }
        )
    }
}
