//! Virtual filesystem abstraction over directories and archives.
//!
//! Every place a resource can live is exposed as a [`VirtualDirectory`]: a
//! lazy sequence of [`VirtualFile`]s with `/`-separated relative paths. The
//! variants are:
//!
//! - [`SystemDirectory`]: a recursive walk of a directory on disk
//! - [`ZipDirectory`]: a random-access archive read through its central
//!   directory, either from a file or from bytes held in memory
//! - [`StreamedArchiveDirectory`]: an archive read sequentially from a byte
//!   stream that cannot seek
//!
//! Directories own their backing resource and release it when dropped.
//! Discovery never reads file content; [`VirtualDirectory::open`] exists for
//! callers that load a single resource afterwards.

mod archive;
mod error;
mod nested;
mod stream;
mod system;

use std::io::Read;

pub use archive::{FileZipDirectory, MemoryZipDirectory, ZipDirectory};
pub use error::{VfsError, VfsResult};
pub use nested::rewrite_nested_archive_path;
pub use stream::StreamedArchiveDirectory;
pub use system::{SystemDirectory, MISSING_DIRECTORY_PATH};

/// Boxed iterator over the files of a directory.
pub type FileIter<'a> = Box<dyn Iterator<Item = VfsResult<VirtualFile>> + 'a>;

/// Boxed byte stream for a single file.
pub type FileReader = Box<dyn Read + Send>;

/// A file discovered inside a [`VirtualDirectory`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualFile {
    name: String,
    relative_path: String,
}

impl VirtualFile {
    /// Create a file from its `/`-separated path relative to the directory root.
    pub fn new(relative_path: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        let name = match relative_path.rfind('/') {
            Some(index) => relative_path[index + 1..].to_string(),
            None => relative_path.clone(),
        };
        Self {
            name,
            relative_path,
        }
    }

    /// The last path segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn into_relative_path(self) -> String {
        self.relative_path
    }
}

/// A walkable collection of files backed by a directory, archive, or stream.
pub trait VirtualDirectory: Send {
    /// Human-readable location of the backing resource, used in logs.
    fn path(&self) -> String;

    /// Enumerate every non-directory file, recursively.
    ///
    /// Entries that fail individually are yielded as errors; callers decide
    /// whether to abort the walk.
    fn files(&mut self) -> VfsResult<FileIter<'_>>;

    /// Open one file by its relative path.
    fn open(&mut self, relative_path: &str) -> VfsResult<FileReader>;
}

impl VirtualDirectory for Box<dyn VirtualDirectory> {
    fn path(&self) -> String {
        (**self).path()
    }

    fn files(&mut self) -> VfsResult<FileIter<'_>> {
        (**self).files()
    }

    fn open(&mut self, relative_path: &str) -> VfsResult<FileReader> {
        (**self).open(relative_path)
    }
}

/// Walk a directory to completion, stopping at the first failing entry.
pub fn collect_files(dir: &mut dyn VirtualDirectory) -> VfsResult<Vec<VirtualFile>> {
    dir.files()?.collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_file_name_is_last_segment() {
        let file = VirtualFile::new("walker/directory/file2.txt");
        assert_eq!(file.name(), "file2.txt");
        assert_eq!(file.relative_path(), "walker/directory/file2.txt");
    }

    #[test]
    fn test_virtual_file_without_directory() {
        let file = VirtualFile::new("top.properties");
        assert_eq!(file.name(), "top.properties");
    }
}
