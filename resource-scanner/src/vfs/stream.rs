//! Sequential archive reader for byte streams that cannot seek.

use std::collections::HashSet;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use tracing::debug;
use zip::read::read_zipfile_from_stream;
use zip::result::ZipError;

use super::{
    FileIter, FileReader, MemoryZipDirectory, VfsError, VfsResult, VirtualDirectory, VirtualFile,
};
use crate::locator::Locator;
use crate::resolver::StreamSource;

/// An archive read entry by entry from a stream obtained for a locator.
///
/// The stream is opened lazily on each walk. It is drained and closed when
/// the walk ends, fails, or is abandoned.
///
/// Entries whose sizes only follow their data (general purpose flag bit 3)
/// cannot be read sequentially. When one is met, the rest of the stream is
/// buffered and the remaining entries are listed from the central directory.
pub struct StreamedArchiveDirectory {
    locator: Locator,
    source: Arc<dyn StreamSource>,
    stream: Option<RecordingReader>,
}

impl StreamedArchiveDirectory {
    pub fn new(locator: Locator, source: Arc<dyn StreamSource>) -> Self {
        Self {
            locator,
            source,
            stream: None,
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    fn open_stream(&mut self) -> VfsResult<()> {
        self.release();
        let stream = self
            .source
            .open(&self.locator)
            .map_err(|e| VfsError::io(self.locator.external_form(), e))?;
        self.stream = Some(RecordingReader::new(stream));
        Ok(())
    }

    fn release(&mut self) {
        close_stream(&mut self.stream, &self.locator.external_form());
    }

    /// Buffer the whole archive and open `wanted` through its central
    /// directory.
    fn open_buffered(&mut self, wanted: &str, cause: ZipError) -> VfsResult<FileReader> {
        let location = self.locator.external_form();
        let Some(stream) = self.stream.take() else {
            return Err(VfsError::archive(location, cause));
        };
        let mut archive = buffer_archive(stream, &location, cause)?;
        archive.open(wanted)
    }
}

impl Drop for StreamedArchiveDirectory {
    fn drop(&mut self) {
        self.release();
    }
}

impl VirtualDirectory for StreamedArchiveDirectory {
    fn path(&self) -> String {
        self.locator.external_form()
    }

    fn files(&mut self) -> VfsResult<FileIter<'_>> {
        self.open_stream()?;
        Ok(Box::new(StreamEntries {
            slot: &mut self.stream,
            location: self.locator.external_form(),
            emitted: HashSet::new(),
            buffered: None,
        }))
    }

    fn open(&mut self, relative_path: &str) -> VfsResult<FileReader> {
        let wanted = relative_path.trim_start_matches('/').to_string();
        let location = self.locator.external_form();
        self.open_stream()?;

        loop {
            let Some(stream) = self.stream.as_mut() else {
                return Err(VfsError::EntryNotFound {
                    location,
                    entry: wanted,
                });
            };
            let lookup = match read_zipfile_from_stream(stream) {
                Ok(Some(mut entry)) if entry.name() == wanted => {
                    let mut buf = Vec::new();
                    Lookup::Found(
                        entry
                            .read_to_end(&mut buf)
                            .map(|_| buf)
                            .map_err(|e| VfsError::io(&location, e)),
                    )
                }
                Ok(Some(_)) => Lookup::Next,
                Ok(None) => Lookup::End,
                Err(e @ ZipError::UnsupportedArchive(_)) => Lookup::Unsupported(e),
                Err(e) => Lookup::Failed(e),
            };

            match lookup {
                Lookup::Next => continue,
                Lookup::Found(result) => {
                    self.release();
                    return result.map(|buf| Box::new(Cursor::new(buf)) as FileReader);
                }
                Lookup::End => {
                    self.release();
                    return Err(VfsError::EntryNotFound {
                        location,
                        entry: wanted,
                    });
                }
                Lookup::Unsupported(e) => return self.open_buffered(&wanted, e),
                Lookup::Failed(e) => {
                    self.release();
                    return Err(VfsError::archive(location, e));
                }
            }
        }
    }
}

enum Lookup {
    Found(VfsResult<Vec<u8>>),
    Next,
    End,
    Unsupported(ZipError),
    Failed(ZipError),
}

enum Step {
    Directory,
    File(String),
    End,
    Unsupported(ZipError),
    Failed(ZipError),
}

/// Iterator over the local headers of a zip stream.
struct StreamEntries<'a> {
    slot: &'a mut Option<RecordingReader>,
    location: String,
    emitted: HashSet<String>,
    buffered: Option<std::vec::IntoIter<VfsResult<VirtualFile>>>,
}

impl StreamEntries<'_> {
    /// Switch to the central directory for the entries not yet emitted.
    fn switch_to_buffered(&mut self, cause: ZipError) -> Option<VfsResult<VirtualFile>> {
        let stream = self.slot.take()?;
        debug!(
            location = %self.location,
            error = %cause,
            "Buffering archive stream for central directory listing"
        );

        let emitted = &self.emitted;
        let remaining = buffer_archive(stream, &self.location, cause).and_then(|mut archive| {
            let files: Vec<_> = archive
                .files()?
                .filter(|file| {
                    file.as_ref()
                        .map_or(true, |f| !emitted.contains(f.relative_path()))
                })
                .collect();
            Ok(files)
        });

        match remaining {
            Ok(files) => {
                let mut files = files.into_iter();
                let next = files.next();
                self.buffered = Some(files);
                next
            }
            Err(e) => Some(Err(e)),
        }
    }
}

impl Iterator for StreamEntries<'_> {
    type Item = VfsResult<VirtualFile>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(buffered) = self.buffered.as_mut() {
            return buffered.next();
        }

        loop {
            let stream = self.slot.as_mut()?;
            let step = match read_zipfile_from_stream(stream) {
                Ok(Some(entry)) if entry.is_dir() => Step::Directory,
                Ok(Some(entry)) => Step::File(entry.name().to_string()),
                Ok(None) => Step::End,
                Err(e @ ZipError::UnsupportedArchive(_)) => Step::Unsupported(e),
                Err(e) => Step::Failed(e),
            };

            match step {
                Step::Directory => continue,
                Step::File(name) => {
                    self.emitted.insert(name.clone());
                    return Some(Ok(VirtualFile::new(name)));
                }
                Step::End => {
                    close_stream(self.slot, &self.location);
                    return None;
                }
                Step::Unsupported(e) => return self.switch_to_buffered(e),
                Step::Failed(e) => {
                    close_stream(self.slot, &self.location);
                    return Some(Err(VfsError::archive(&self.location, e)));
                }
            }
        }
    }
}

/// A stream that keeps a copy of every byte read through it.
struct RecordingReader {
    inner: FileReader,
    recorded: Vec<u8>,
}

impl RecordingReader {
    fn new(inner: FileReader) -> Self {
        Self {
            inner,
            recorded: Vec::new(),
        }
    }

    /// Read the rest of the stream and return everything seen.
    fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        io::copy(&mut self, &mut io::sink())?;
        Ok(self.recorded)
    }
}

impl Read for RecordingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.recorded.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

/// Drain and drop the stream in `slot`, if any.
fn close_stream(slot: &mut Option<RecordingReader>, location: &str) {
    if let Some(mut stream) = slot.take() {
        if let Err(e) = io::copy(&mut stream.inner, &mut io::sink()) {
            debug!(location = location, error = %e, "Failed to drain archive stream");
        }
    }
}

/// Buffer the rest of `stream` and open it as a random-access archive.
///
/// Reports `cause` when the buffered bytes are not a readable archive either.
fn buffer_archive(
    stream: RecordingReader,
    location: &str,
    cause: ZipError,
) -> VfsResult<MemoryZipDirectory> {
    let bytes = stream
        .into_bytes()
        .map_err(|e| VfsError::io(location, e))?;
    MemoryZipDirectory::from_bytes(bytes, location)
        .map_err(|_| VfsError::archive(location, cause))
}
