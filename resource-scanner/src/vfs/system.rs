//! Recursive walker over a directory on disk.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::{FileIter, FileReader, VfsError, VfsResult, VirtualDirectory, VirtualFile};

/// Reported path of a [`SystemDirectory`] created without a root.
pub const MISSING_DIRECTORY_PATH: &str = "/NO-SUCH-DIRECTORY/";

/// A directory on the local filesystem, walked recursively.
///
/// A directory without a root is valid and empty. A directory with a root
/// must point at an existing, readable directory when it is created.
#[derive(Debug, Clone)]
pub struct SystemDirectory {
    root: Option<PathBuf>,
}

impl SystemDirectory {
    pub fn new(root: Option<PathBuf>) -> VfsResult<Self> {
        if let Some(root) = &root {
            if !is_readable_dir(root) {
                return Err(VfsError::InvalidDirectory { path: root.clone() });
            }
        }
        Ok(Self { root })
    }

    /// Shorthand for a directory with a root.
    pub fn at(root: impl Into<PathBuf>) -> VfsResult<Self> {
        Self::new(Some(root.into()))
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

impl VirtualDirectory for SystemDirectory {
    fn path(&self) -> String {
        match &self.root {
            Some(root) => root.to_string_lossy().replace('\\', "/"),
            None => MISSING_DIRECTORY_PATH.to_string(),
        }
    }

    fn files(&mut self) -> VfsResult<FileIter<'_>> {
        let root = match &self.root {
            Some(root) if root.exists() => root.clone(),
            _ => return Ok(Box::new(std::iter::empty())),
        };

        let entries = WalkDir::new(&root)
            .follow_links(true)
            .min_depth(1)
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) if entry.file_type().is_dir() => None,
                Ok(entry) => relative_path(&root, entry.path()).map(|rel| Ok(VirtualFile::new(rel))),
                Err(e) => {
                    debug!(root = %root.display(), error = %e, "Skipping unreadable entry");
                    None
                }
            });

        Ok(Box::new(entries))
    }

    fn open(&mut self, relative_path: &str) -> VfsResult<FileReader> {
        let root = self.root.as_ref().ok_or_else(|| VfsError::EntryNotFound {
            location: MISSING_DIRECTORY_PATH.to_string(),
            entry: relative_path.to_string(),
        })?;

        let path = root.join(relative_path.trim_start_matches('/'));
        if !path.is_file() {
            return Err(VfsError::EntryNotFound {
                location: root.display().to_string(),
                entry: relative_path.to_string(),
            });
        }

        let file = File::open(&path).map_err(|e| VfsError::io(path.display().to_string(), e))?;
        Ok(Box::new(file))
    }
}

fn is_readable_dir(path: &Path) -> bool {
    path.is_dir() && fs::read_dir(path).is_ok()
}

/// `/`-joined path of `path` relative to `root`.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let segments: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}
