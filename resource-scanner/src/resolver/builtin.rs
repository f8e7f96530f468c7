//! Built-in locator types, in resolution priority order.

use std::fs;
use std::io::{Read, Seek};
use std::path::Path;
use std::sync::Arc;

use super::{DirectoryResult, LocatorType, ResolveContext};
use crate::locator::{Locator, MANIFEST_PATH};
use crate::vfs::{
    rewrite_nested_archive_path, StreamedArchiveDirectory, SystemDirectory, VfsError, ZipDirectory,
};

pub(super) fn builtin_types() -> Vec<Arc<dyn LocatorType>> {
    vec![
        Arc::new(LocalArchiveType),
        Arc::new(ArchiveUrlType),
        Arc::new(DirectoryType),
        Arc::new(ContainerVfsType),
        Arc::new(ContainerZippedType),
        Arc::new(BundleType),
        Arc::new(StreamedArchiveType),
    ]
}

/// `file:` locators naming an archive, optionally followed by `!…`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalArchiveType;

impl LocatorType for LocalArchiveType {
    fn name(&self) -> &str {
        "local-archive"
    }

    fn matches(&self, locator: &Locator) -> bool {
        locator.is_file_scheme() && locator.has_archive_in_path()
    }

    fn create_dir(&self, locator: &Locator, _ctx: &ResolveContext<'_>) -> DirectoryResult {
        match locator.backing_file() {
            Some(path) if path.is_file() => Ok(Some(Box::new(ZipDirectory::open_file(&path)?))),
            _ => Ok(None),
        }
    }
}

/// `jar:`, `zip:` and `wsjar:` locators, including nested archive chains.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveUrlType;

impl LocatorType for ArchiveUrlType {
    fn name(&self) -> &str {
        "archive-url"
    }

    fn matches(&self, locator: &Locator) -> bool {
        locator.is_archive_scheme()
    }

    fn create_dir(&self, locator: &Locator, _ctx: &ResolveContext<'_>) -> DirectoryResult {
        let Some(chain) = locator.archive_chain() else {
            return Ok(None);
        };

        let archive = if chain.archive.is_file() {
            chain.archive
        } else {
            match locator.backing_file() {
                Some(path) if path.is_file() => path,
                _ => return Ok(None),
            }
        };

        open_nested(&archive, &chain.nested, chain.entry.as_deref())
    }
}

/// Open `archive` and descend through `nested` entry names.
///
/// Inner archives are read into memory. When `entry` names a directory of the
/// innermost archive only that directory is walked; any other entry (such as
/// the manifest probe) leaves the whole archive in scope.
fn open_nested(archive: &Path, nested: &[String], entry: Option<&str>) -> DirectoryResult {
    let mut outer = ZipDirectory::open_file(archive)?;
    let Some((first, rest)) = nested.split_first() else {
        return Ok(Some(Box::new(scope_to_entry(outer, entry))));
    };

    let mut location = format!("{}!/{}", archive.display(), first);
    let mut bytes = outer.read_entry(first)?;
    drop(outer);

    for name in rest {
        let mut inner = ZipDirectory::from_bytes(bytes, location.clone())?;
        bytes = inner.read_entry(name)?;
        location = format!("{}!/{}", location, name);
    }

    let inner = ZipDirectory::from_bytes(bytes, location)?;
    Ok(Some(Box::new(scope_to_entry(inner, entry))))
}

fn scope_to_entry<R: Read + Seek>(dir: ZipDirectory<R>, entry: Option<&str>) -> ZipDirectory<R> {
    match entry {
        Some(entry) if dir.has_directory(entry) => dir.with_root(entry),
        _ => dir,
    }
}

/// `file:` locators of existing directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryType;

impl LocatorType for DirectoryType {
    fn name(&self) -> &str {
        "directory"
    }

    fn matches(&self, locator: &Locator) -> bool {
        locator.is_file_scheme() && !locator.has_archive_in_path() && locator.to_file_path().is_dir()
    }

    fn create_dir(&self, locator: &Locator, _ctx: &ResolveContext<'_>) -> DirectoryResult {
        Ok(Some(Box::new(SystemDirectory::at(locator.to_file_path())?)))
    }
}

/// Container `vfs:` locators, mapped to physical files by the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerVfsType;

impl LocatorType for ContainerVfsType {
    fn name(&self) -> &str {
        "container-vfs"
    }

    fn matches(&self, locator: &Locator) -> bool {
        locator.scheme() == "vfs"
    }

    /// The manifest probe is reported next to the root probe of the same
    /// location; only the root is scanned.
    fn no_scan_needed(&self, locator: &Locator) -> bool {
        locator.path().ends_with(MANIFEST_PATH)
    }

    fn create_dir(&self, locator: &Locator, ctx: &ResolveContext<'_>) -> DirectoryResult {
        let backing = ctx
            .host()
            .container
            .physical_backing(locator)
            .map_err(|e| VfsError::io(locator.external_form(), e))?;

        let sibling = backing
            .physical
            .parent()
            .map(|parent| parent.join(&backing.name))
            .filter(|candidate| is_readable(candidate));
        let target = sibling.unwrap_or(backing.physical);

        if target.is_dir() {
            Ok(Some(Box::new(SystemDirectory::at(target)?)))
        } else if target.is_file() {
            Ok(Some(Box::new(ZipDirectory::open_file(&target)?)))
        } else {
            Ok(None)
        }
    }
}

fn is_readable(path: &Path) -> bool {
    if path.is_dir() {
        fs::read_dir(path).is_ok()
    } else {
        fs::File::open(path).is_ok()
    }
}

/// Container `vfsfile:` and `vfszip:` locators.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerZippedType;

impl LocatorType for ContainerZippedType {
    fn name(&self) -> &str {
        "container-zipped"
    }

    fn matches(&self, locator: &Locator) -> bool {
        matches!(locator.scheme(), "vfszip" | "vfsfile")
    }

    fn create_dir(&self, locator: &Locator, ctx: &ResolveContext<'_>) -> DirectoryResult {
        if locator.scheme() == "vfsfile" {
            return ctx.resolve(&locator.with_scheme("file"));
        }

        let path = locator.to_file_path();
        if path.is_file() {
            return Ok(Some(Box::new(ZipDirectory::open_file(&path)?)));
        }

        let rewritten = rewrite_nested_archive_path(locator.path())?;
        ctx.resolve(&rewritten)
    }
}

/// Module-system `bundle*:` locators, delegated to the bundle host.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleType;

impl LocatorType for BundleType {
    fn name(&self) -> &str {
        "bundle"
    }

    fn matches(&self, locator: &Locator) -> bool {
        locator.scheme().starts_with("bundle")
    }

    fn create_dir(&self, locator: &Locator, ctx: &ResolveContext<'_>) -> DirectoryResult {
        let host = ctx
            .host()
            .bundles
            .as_ref()
            .ok_or_else(|| VfsError::HostUnavailable {
                capability: "bundle",
                locator: locator.external_form(),
            })?;

        let resolved = host
            .resolve(locator)
            .map_err(|e| VfsError::io(locator.external_form(), e))?;
        ctx.resolve(&resolved)
    }
}

/// Last resort: any locator mentioning an archive, read as a stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamedArchiveType;

impl LocatorType for StreamedArchiveType {
    fn name(&self) -> &str {
        "streamed-archive"
    }

    fn matches(&self, locator: &Locator) -> bool {
        locator.contains_archive_marker()
    }

    fn create_dir(&self, locator: &Locator, ctx: &ResolveContext<'_>) -> DirectoryResult {
        Ok(Some(Box::new(StreamedArchiveDirectory::new(
            locator.clone(),
            ctx.host().streams.clone(),
        ))))
    }
}
