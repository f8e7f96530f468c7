//! Capabilities supplied by the hosting environment.
//!
//! Some locator schemes only make sense inside a particular runtime: a
//! container that maps `vfs:` locations to physical files, or a module system
//! that hands out `bundle:` locations. The resolver reaches those runtimes
//! through the traits here. Defaults cover plain local files.

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::locator::Locator;
use crate::reader::fetch_url;
use crate::vfs::FileReader;

/// Opens the raw byte stream behind a locator.
pub trait StreamSource: Send + Sync {
    fn open(&self, locator: &Locator) -> io::Result<FileReader>;
}

/// Default stream source: `http`/`https` locators are fetched, everything
/// else is opened through its local backing file.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStreamSource;

impl StreamSource for DefaultStreamSource {
    fn open(&self, locator: &Locator) -> io::Result<FileReader> {
        if matches!(locator.scheme(), "http" | "https") {
            return fetch_url(&locator.external_form());
        }

        match locator.backing_file() {
            Some(path) if path.is_file() => Ok(Box::new(File::open(path)?)),
            _ => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no local file backs {}", locator),
            )),
        }
    }
}

/// Physical location of a container-managed resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalBacking {
    /// The file or directory the container materialized on disk.
    pub physical: PathBuf,
    /// The resource's own name inside the container.
    pub name: String,
}

/// Maps container `vfs:` locators to physical files.
pub trait ContainerHost: Send + Sync {
    fn physical_backing(&self, locator: &Locator) -> io::Result<PhysicalBacking>;
}

/// Treats the `vfs:` path as a local path.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathContainerHost;

impl ContainerHost for PathContainerHost {
    fn physical_backing(&self, locator: &Locator) -> io::Result<PhysicalBacking> {
        let name = locator.file_name().unwrap_or_default().to_string();
        Ok(PhysicalBacking {
            physical: locator.to_file_path(),
            name,
        })
    }
}

/// Converts module-system `bundle*:` locators into resolvable ones.
pub trait BundleHost: Send + Sync {
    fn resolve(&self, locator: &Locator) -> io::Result<Locator>;
}

/// The set of host capabilities a resolver uses.
#[derive(Clone)]
pub struct HostServices {
    pub streams: Arc<dyn StreamSource>,
    pub container: Arc<dyn ContainerHost>,
    pub bundles: Option<Arc<dyn BundleHost>>,
}

impl HostServices {
    pub fn with_stream_source(mut self, streams: Arc<dyn StreamSource>) -> Self {
        self.streams = streams;
        self
    }

    pub fn with_container_host(mut self, container: Arc<dyn ContainerHost>) -> Self {
        self.container = container;
        self
    }

    pub fn with_bundle_host(mut self, bundles: Arc<dyn BundleHost>) -> Self {
        self.bundles = Some(bundles);
        self
    }
}

impl Default for HostServices {
    fn default() -> Self {
        Self {
            streams: Arc::new(DefaultStreamSource),
            container: Arc::new(PathContainerHost),
            bundles: None,
        }
    }
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices")
            .field("bundles", &self.bundles.is_some())
            .finish_non_exhaustive()
    }
}
