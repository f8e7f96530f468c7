//! Resource-lookup contexts.
//!
//! A context answers "where can this relative resource path be found?" with a
//! list of [`Locator`]s, the way a class loader answers a resource lookup.
//! The scan orchestrator probes every context with the empty path (the
//! roots themselves) and with the manifest path (archives that carry one).
//!
//! [`SearchPathContext`] covers a list of directories and archive files.
//! A per-thread current context can be installed with
//! [`set_current_context`] and is picked up by walkers built from
//! configuration.

use std::cell::RefCell;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::locator::{has_archive_extension, Locator};
use crate::vfs::ZipDirectory;

/// Something that can locate resources by relative path.
pub trait ResourceContext: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Every location where `probe` exists. The empty probe lists the roots.
    fn find(&self, probe: &str) -> io::Result<Vec<Locator>>;
}

/// A context over an ordered list of directories and archive files.
#[derive(Debug, Clone)]
pub struct SearchPathContext {
    name: String,
    roots: Vec<PathBuf>,
}

impl SearchPathContext {
    pub fn new<I, P>(name: impl Into<String>, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            name: name.into(),
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    /// Context from a path-list environment variable, if it is set.
    pub fn from_env(var: &str) -> Option<Self> {
        let value = std::env::var_os(var)?;
        Some(Self::new(var, std::env::split_paths(&value)))
    }

    /// Context over the directory holding the running executable.
    pub fn deployment() -> io::Result<Self> {
        let exe = std::env::current_exe()?;
        let dir = exe.parent().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("executable {} has no parent directory", exe.display()),
            )
        })?;
        Ok(Self::new("deployment", [dir.to_path_buf()]))
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn find_in_archive(archive: &Path, probe: &str) -> Option<Locator> {
        match ZipDirectory::open_file(archive) {
            Ok(mut dir) => dir
                .contains(probe)
                .then(|| Locator::archive_entry(archive, probe)),
            Err(e) => {
                warn!(archive = %archive.display(), error = %e, "Cannot read search path archive");
                None
            }
        }
    }
}

impl ResourceContext for SearchPathContext {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, probe: &str) -> io::Result<Vec<Locator>> {
        let probe = probe.trim_start_matches('/');
        let mut found = Vec::new();

        for root in &self.roots {
            if root.is_dir() {
                let candidate = if probe.is_empty() {
                    root.clone()
                } else {
                    root.join(probe)
                };
                if candidate.exists() {
                    found.push(Locator::from_path(&candidate));
                }
            } else if root.is_file() && has_archive_extension(root) {
                if probe.is_empty() {
                    continue;
                }
                found.extend(Self::find_in_archive(root, probe));
            } else {
                debug!(context = %self.name, root = %root.display(), "Ignoring search path entry");
            }
        }

        Ok(found)
    }
}

thread_local! {
    static CURRENT_CONTEXT: RefCell<Option<Arc<dyn ResourceContext>>> = const { RefCell::new(None) };
}

/// The context installed for the calling thread, if any.
pub fn current_context() -> Option<Arc<dyn ResourceContext>> {
    CURRENT_CONTEXT.with(|current| current.borrow().clone())
}

/// Install `context` for the calling thread until the guard is dropped.
pub fn set_current_context(context: Arc<dyn ResourceContext>) -> CurrentContextGuard {
    let previous = CURRENT_CONTEXT.with(|current| current.borrow_mut().replace(context));
    CurrentContextGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// Restores the previously installed current context on drop.
#[must_use = "the context is uninstalled when the guard is dropped"]
pub struct CurrentContextGuard {
    previous: Option<Arc<dyn ResourceContext>>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for CurrentContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_CONTEXT.with(|current| *current.borrow_mut() = previous);
    }
}
