//! Random-access archive directories read through the zip central directory.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use super::{FileIter, FileReader, VfsError, VfsResult, VirtualDirectory, VirtualFile};

/// Archive backed by a file on disk.
pub type FileZipDirectory = ZipDirectory<BufReader<File>>;

/// Archive held in memory, typically one nested inside another archive.
pub type MemoryZipDirectory = ZipDirectory<Cursor<Vec<u8>>>;

/// A zip-format archive (`.jar`, `.zip`, `.war`, `.ear`, ...).
///
/// Emits one [`VirtualFile`] per non-directory entry, with the stored entry
/// name as its relative path. A directory scoped with
/// [`with_root`](ZipDirectory::with_root) emits only the entries below that
/// root, relative to it.
pub struct ZipDirectory<R> {
    archive: ZipArchive<R>,
    location: String,
    root: Option<String>,
}

impl FileZipDirectory {
    /// Open an archive file.
    pub fn open_file(path: &Path) -> VfsResult<Self> {
        let location = path.display().to_string();
        let file = File::open(path).map_err(|e| VfsError::io(&location, e))?;
        Self::from_reader(BufReader::new(file), location)
    }
}

impl MemoryZipDirectory {
    /// Read an archive from bytes; `location` names it in logs and errors.
    pub fn from_bytes(bytes: Vec<u8>, location: impl Into<String>) -> VfsResult<Self> {
        Self::from_reader(Cursor::new(bytes), location.into())
    }
}

impl<R: Read + Seek> ZipDirectory<R> {
    pub fn from_reader(reader: R, location: String) -> VfsResult<Self> {
        let archive = ZipArchive::new(reader).map_err(|e| VfsError::archive(&location, e))?;
        Ok(Self {
            archive,
            location,
            root: None,
        })
    }

    /// Scope walking and opening to the entries below the directory `root`.
    pub fn with_root(mut self, root: &str) -> Self {
        let root = root.trim_matches('/');
        self.root = (!root.is_empty()).then(|| format!("{}/", root));
        self
    }

    /// Whether any stored entry lies below the directory `name`.
    pub fn has_directory(&self, name: &str) -> bool {
        let name = name.trim_matches('/');
        if name.is_empty() {
            return true;
        }
        let prefix = format!("{}/", name);
        self.archive.file_names().any(|n| n.starts_with(&prefix))
    }

    /// Number of entries, directories included.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Whether a file entry with this name exists.
    pub fn contains(&mut self, name: &str) -> bool {
        self.archive
            .by_name(name.trim_start_matches('/'))
            .is_ok_and(|entry| !entry.is_dir())
    }

    /// Read an entry fully into memory.
    pub fn read_entry(&mut self, name: &str) -> VfsResult<Vec<u8>> {
        let name = name.trim_start_matches('/');
        let mut entry = self.archive.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => VfsError::EntryNotFound {
                location: self.location.clone(),
                entry: name.to_string(),
            },
            other => VfsError::archive(&self.location, other),
        })?;

        let mut buf = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry
            .read_to_end(&mut buf)
            .map_err(|e| VfsError::io(format!("{}!/{}", self.location, name), e))?;
        Ok(buf)
    }
}

impl<R: Read + Seek + Send> VirtualDirectory for ZipDirectory<R> {
    fn path(&self) -> String {
        match &self.root {
            Some(root) => format!("{}!/{}", self.location, root),
            None => self.location.clone(),
        }
    }

    fn files(&mut self) -> VfsResult<FileIter<'_>> {
        let location = self.location.clone();
        let root = self.root.clone().unwrap_or_default();
        let archive = &mut self.archive;
        let count = archive.len();

        let entries = (0..count).filter_map(move |index| match archive.by_index_raw(index) {
            Ok(entry) if entry.is_dir() => None,
            Ok(entry) => entry
                .name()
                .strip_prefix(root.as_str())
                .filter(|relative| !relative.is_empty())
                .map(|relative| Ok(VirtualFile::new(relative))),
            Err(e) => Some(Err(VfsError::archive(&location, e))),
        });

        Ok(Box::new(entries))
    }

    fn open(&mut self, relative_path: &str) -> VfsResult<FileReader> {
        let bytes = match &self.root {
            Some(root) => {
                let name = format!("{}{}", root, relative_path.trim_start_matches('/'));
                self.read_entry(&name)?
            }
            None => self.read_entry(relative_path)?,
        };
        Ok(Box::new(Cursor::new(bytes)))
    }
}
