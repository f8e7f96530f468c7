//! Locator-type resolution.
//!
//! A [`LocatorResolver`] turns a [`Locator`] into a [`VirtualDirectory`] by
//! trying an ordered chain of [`LocatorType`] strategies. Custom types are
//! placed ahead of the built-ins, so a registered type for an existing
//! scheme overrides the default handling.
//!
//! # Resolution rules
//!
//! - Types are tried in order; only types whose `matches` accepts the
//!   locator are considered.
//! - A matching type that reports `no_scan_needed` ends resolution with
//!   [`Resolution::Skip`].
//! - A factory that returns `Ok(None)` or a non-fatal error hands the
//!   locator to the next matching type.
//! - A fatal error (see [`VfsError::is_fatal`]) stops the chain.
//! - When nothing produces a directory the result is
//!   [`VfsError::UnresolvedLocator`].
//!
//! Factories may re-enter the resolver through [`ResolveContext::resolve`],
//! for example after rewriting a container locator into an archive one.

mod builtin;
mod host;

use std::fmt;
use std::sync::Arc;

use parking_lot::{const_rwlock, RwLock};
use tracing::debug;

use crate::locator::Locator;
use crate::vfs::{VfsError, VfsResult, VirtualDirectory};

pub use builtin::{
    ArchiveUrlType, BundleType, ContainerVfsType, ContainerZippedType, DirectoryType,
    LocalArchiveType, StreamedArchiveType,
};
pub use host::{
    BundleHost, ContainerHost, DefaultStreamSource, HostServices, PathContainerHost,
    PhysicalBacking, StreamSource,
};

/// Maximum nesting of re-entrant resolution.
pub const MAX_RESOLUTION_DEPTH: usize = 8;

/// Result of a factory: a directory, or `None` to let the next type try.
pub type DirectoryResult = VfsResult<Option<Box<dyn VirtualDirectory>>>;

/// Outcome of resolving a locator.
pub enum Resolution {
    Directory(Box<dyn VirtualDirectory>),
    /// The locator is known but has nothing worth indexing.
    Skip,
}

impl Resolution {
    pub fn into_directory(self) -> Option<Box<dyn VirtualDirectory>> {
        match self {
            Self::Directory(dir) => Some(dir),
            Self::Skip => None,
        }
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(dir) => f.debug_tuple("Directory").field(&dir.path()).finish(),
            Self::Skip => f.write_str("Skip"),
        }
    }
}

/// A strategy that recognizes a family of locators and opens them.
pub trait LocatorType: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn matches(&self, locator: &Locator) -> bool;

    /// Whether a matched locator should be skipped without scanning.
    fn no_scan_needed(&self, _locator: &Locator) -> bool {
        false
    }

    fn create_dir(&self, locator: &Locator, ctx: &ResolveContext<'_>) -> DirectoryResult;
}

/// Handle given to factories for host access and re-entrant resolution.
pub struct ResolveContext<'a> {
    resolver: &'a LocatorResolver,
    depth: usize,
}

impl ResolveContext<'_> {
    pub fn host(&self) -> &HostServices {
        &self.resolver.host
    }

    /// Current re-entry depth; zero for a top-level resolution.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Resolve another locator through the whole chain.
    ///
    /// A nested [`Resolution::Skip`] comes back as `Ok(None)`.
    pub fn resolve(&self, locator: &Locator) -> DirectoryResult {
        self.resolver
            .resolve_at(locator, self.depth + 1)
            .map(Resolution::into_directory)
    }
}

/// Ordered chain of locator types.
pub struct LocatorResolver {
    types: RwLock<Vec<Arc<dyn LocatorType>>>,
    host: HostServices,
}

impl LocatorResolver {
    /// Resolver with default host services.
    pub fn new() -> Self {
        Self::with_host(HostServices::default())
    }

    /// Resolver with the given host services.
    ///
    /// The chain is every globally registered type (most recent first)
    /// followed by the built-ins.
    pub fn with_host(host: HostServices) -> Self {
        let mut types = REGISTERED_TYPES.read().clone();
        types.extend(builtin::builtin_types());
        Self {
            types: RwLock::new(types),
            host,
        }
    }

    /// Add a locator type ahead of all existing ones.
    pub fn register(&self, locator_type: Arc<dyn LocatorType>) {
        debug!(locator_type = locator_type.name(), "Registering locator type");
        self.types.write().insert(0, locator_type);
    }

    /// Names of the chain in priority order.
    pub fn type_names(&self) -> Vec<String> {
        self.types
            .read()
            .iter()
            .map(|t| t.name().to_string())
            .collect()
    }

    pub fn host(&self) -> &HostServices {
        &self.host
    }

    /// Resolve a locator to a directory or a skip signal.
    ///
    /// # Errors
    ///
    /// [`VfsError::UnresolvedLocator`] when no type produces a directory, or
    /// the first fatal error raised by a type.
    pub fn resolve(&self, locator: &Locator) -> VfsResult<Resolution> {
        self.resolve_at(locator, 0)
    }

    fn resolve_at(&self, locator: &Locator, depth: usize) -> VfsResult<Resolution> {
        if depth > MAX_RESOLUTION_DEPTH {
            return Err(VfsError::DepthExceeded {
                locator: locator.external_form(),
                depth: MAX_RESOLUTION_DEPTH,
            });
        }

        // Snapshot so factories can re-enter without holding the lock.
        let types = self.types.read().clone();
        let ctx = ResolveContext {
            resolver: self,
            depth,
        };

        for locator_type in types.iter().filter(|t| t.matches(locator)) {
            if locator_type.no_scan_needed(locator) {
                debug!(
                    locator = %locator,
                    locator_type = locator_type.name(),
                    "No scan needed"
                );
                return Ok(Resolution::Skip);
            }

            match locator_type.create_dir(locator, &ctx) {
                Ok(Some(dir)) => {
                    debug!(
                        locator = %locator,
                        locator_type = locator_type.name(),
                        directory = %dir.path(),
                        "Resolved locator"
                    );
                    return Ok(Resolution::Directory(dir));
                }
                Ok(None) => {
                    debug!(
                        locator = %locator,
                        locator_type = locator_type.name(),
                        "Locator type produced no directory, trying next"
                    );
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!(
                        locator = %locator,
                        locator_type = locator_type.name(),
                        error = %e,
                        "Locator type failed, trying next"
                    );
                }
            }
        }

        Err(VfsError::UnresolvedLocator {
            locator: locator.external_form(),
        })
    }
}

impl Default for LocatorResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LocatorResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocatorResolver")
            .field("types", &self.type_names())
            .field("host", &self.host)
            .finish()
    }
}

static REGISTERED_TYPES: RwLock<Vec<Arc<dyn LocatorType>>> = const_rwlock(Vec::new());

/// Register a locator type for every resolver created afterwards.
///
/// Resolvers that already exist are unaffected; use
/// [`LocatorResolver::register`] for those.
pub fn register_locator_type(locator_type: Arc<dyn LocatorType>) {
    REGISTERED_TYPES.write().insert(0, locator_type);
}

type Matcher = Box<dyn Fn(&Locator) -> bool + Send + Sync>;
type Factory = Box<dyn Fn(&Locator, &ResolveContext<'_>) -> DirectoryResult + Send + Sync>;

/// A locator type assembled from closures.
pub struct CustomLocatorType {
    name: String,
    matcher: Matcher,
    factory: Factory,
    no_scan: Option<Matcher>,
}

impl CustomLocatorType {
    pub fn new<M, F>(name: impl Into<String>, matcher: M, factory: F) -> Self
    where
        M: Fn(&Locator) -> bool + Send + Sync + 'static,
        F: Fn(&Locator, &ResolveContext<'_>) -> DirectoryResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            matcher: Box::new(matcher),
            factory: Box::new(factory),
            no_scan: None,
        }
    }

    /// Skip matched locators for which `predicate` holds.
    pub fn with_no_scan<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Locator) -> bool + Send + Sync + 'static,
    {
        self.no_scan = Some(Box::new(predicate));
        self
    }
}

impl LocatorType for CustomLocatorType {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, locator: &Locator) -> bool {
        (self.matcher)(locator)
    }

    fn no_scan_needed(&self, locator: &Locator) -> bool {
        self.no_scan.as_ref().is_some_and(|p| p(locator))
    }

    fn create_dir(&self, locator: &Locator, ctx: &ResolveContext<'_>) -> DirectoryResult {
        (self.factory)(locator, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::{collect_files, SystemDirectory, VirtualFile};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn empty_dir() -> DirectoryResult {
        Ok(Some(Box::new(SystemDirectory::new(None)?)))
    }

    fn walk(resolution: Resolution) -> Vec<String> {
        let mut dir = resolution.into_directory().unwrap();
        let mut paths: Vec<_> = collect_files(&mut dir)
            .unwrap()
            .into_iter()
            .map(VirtualFile::into_relative_path)
            .collect();
        paths.sort();
        paths
    }

    #[test]
    fn test_builtin_order() {
        let resolver = LocatorResolver::new();
        let names = resolver.type_names();
        let builtins: Vec<_> = names
            .iter()
            .skip_while(|n| n.as_str() != "local-archive")
            .map(String::as_str)
            .collect();
        assert_eq!(
            builtins,
            vec![
                "local-archive",
                "archive-url",
                "directory",
                "container-vfs",
                "container-zipped",
                "bundle",
                "streamed-archive",
            ]
        );
    }

    #[test]
    fn test_resolves_directory_locator() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), b"a").unwrap();

        let resolver = LocatorResolver::new();
        let resolution = resolver.resolve(&Locator::from_path(temp.path())).unwrap();
        assert_eq!(walk(resolution), vec!["a.txt"]);
    }

    #[test]
    fn test_unmatched_locator_is_unresolved() {
        let resolver = LocatorResolver::new();
        let err = resolver
            .resolve(&Locator::new("gopher", "//nowhere/thing"))
            .unwrap_err();
        assert!(
            matches!(err, VfsError::UnresolvedLocator { ref locator } if locator == "gopher://nowhere/thing")
        );
    }

    #[test]
    fn test_custom_type_overrides_builtin() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("real.txt"), b"r").unwrap();

        let resolver = LocatorResolver::new();
        resolver.register(Arc::new(CustomLocatorType::new(
            "override-file",
            |l: &Locator| l.is_file_scheme(),
            |_: &Locator, _: &ResolveContext<'_>| empty_dir(),
        )));

        let resolution = resolver.resolve(&Locator::from_path(temp.path())).unwrap();
        assert!(walk(resolution).is_empty());
        assert_eq!(resolver.type_names()[0], "override-file");
    }

    #[test]
    fn test_failing_type_falls_through() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kept.txt"), b"k").unwrap();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let resolver = LocatorResolver::new();
        resolver.register(Arc::new(CustomLocatorType::new(
            "broken",
            |l: &Locator| l.is_file_scheme(),
            move |l: &Locator, _: &ResolveContext<'_>| {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(VfsError::io(
                    l.external_form(),
                    std::io::Error::new(std::io::ErrorKind::Other, "boom"),
                ))
            },
        )));
        resolver.register(Arc::new(CustomLocatorType::new(
            "nothing",
            |l: &Locator| l.is_file_scheme(),
            |_: &Locator, _: &ResolveContext<'_>| Ok(None),
        )));

        let resolution = resolver.resolve(&Locator::from_path(temp.path())).unwrap();
        assert_eq!(walk(resolution), vec!["kept.txt"]);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fatal_error_stops_chain() {
        let temp = TempDir::new().unwrap();
        let resolver = LocatorResolver::new();
        resolver.register(Arc::new(CustomLocatorType::new(
            "ambiguous",
            |l: &Locator| l.is_file_scheme(),
            |l: &Locator, _: &ResolveContext<'_>| {
                Err(VfsError::AmbiguousArchivePath {
                    path: l.path().to_string(),
                })
            },
        )));

        let err = resolver
            .resolve(&Locator::from_path(temp.path()))
            .unwrap_err();
        assert!(matches!(err, VfsError::AmbiguousArchivePath { .. }));
    }

    #[test]
    fn test_no_scan_returns_skip() {
        let resolver = LocatorResolver::new();
        resolver.register(Arc::new(
            CustomLocatorType::new(
                "probe",
                |l: &Locator| l.scheme() == "probe",
                |_: &Locator, _: &ResolveContext<'_>| empty_dir(),
            )
            .with_no_scan(|l: &Locator| l.path().ends_with("MANIFEST.MF")),
        ));

        let skipped = resolver
            .resolve(&Locator::new("probe", "/x/META-INF/MANIFEST.MF"))
            .unwrap();
        assert!(matches!(skipped, Resolution::Skip));

        let scanned = resolver.resolve(&Locator::new("probe", "/x/")).unwrap();
        assert!(matches!(scanned, Resolution::Directory(_)));
    }

    #[test]
    fn test_reentry_is_depth_limited() {
        let resolver = LocatorResolver::new();
        resolver.register(Arc::new(CustomLocatorType::new(
            "loop",
            |l: &Locator| l.scheme() == "loop",
            |l: &Locator, ctx: &ResolveContext<'_>| ctx.resolve(l),
        )));

        let err = resolver
            .resolve(&Locator::new("loop", "/again"))
            .unwrap_err();
        assert!(matches!(
            err,
            VfsError::DepthExceeded {
                depth: MAX_RESOLUTION_DEPTH,
                ..
            }
        ));
    }

    #[test]
    fn test_global_registration_applies_to_new_resolvers() {
        register_locator_type(Arc::new(CustomLocatorType::new(
            "global-test-scheme",
            |l: &Locator| l.scheme() == "globaltest",
            |_: &Locator, _: &ResolveContext<'_>| empty_dir(),
        )));

        let resolver = LocatorResolver::new();
        assert!(resolver
            .type_names()
            .iter()
            .any(|n| n == "global-test-scheme"));
        assert!(resolver
            .resolve(&Locator::new("globaltest", "/anything"))
            .is_ok());
    }
}
