//! Scan orchestration.
//!
//! A [`ResourceWalker`] gathers candidate locators from its resource
//! contexts, resolves each one to a virtual directory, walks it, and records
//! every accepted relative path in a [`ResourceStore`].
//!
//! # Flow
//!
//! 1. Every context is probed with the empty path and with
//!    `META-INF/MANIFEST.MF`; results are de-duplicated by external form,
//!    keeping first-seen order.
//! 2. Each locator is resolved. Resolution errors are logged and the locator
//!    is skipped; a skip signal is counted and ignored.
//! 3. The directory is walked to completion before anything is inserted, so
//!    a walk that fails halfway leaves no entries behind.
//!
//! Without an executor locators are scanned in order on the calling thread.
//! With one, every locator becomes a task and the walker joins them all. In
//! both modes a unit that panics fails the scan with
//! [`ScanError::TaskFailed`].

mod error;
mod filter;
mod summary;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::ScannerConfig;
use crate::context::{current_context, ResourceContext, SearchPathContext};
use crate::executor::{installed_executor, run_catching, RayonExecutor, TaskExecutor};
use crate::locator::{Locator, MANIFEST_PATH};
use crate::resolver::{LocatorResolver, Resolution};
use crate::store::ResourceStore;
use crate::vfs::collect_files;

pub use error::{ScanError, ScanResult};
pub use filter::PathFilter;
pub use summary::ScanSummary;

/// Probes sent to every context when gathering candidates.
pub const CANDIDATE_PROBES: [&str; 2] = ["", MANIFEST_PATH];

/// Scans resource contexts into a store.
#[derive(Clone)]
pub struct ResourceWalker {
    contexts: Vec<Arc<dyn ResourceContext>>,
    resolver: Arc<LocatorResolver>,
    executor: Option<Arc<dyn TaskExecutor>>,
    filter: PathFilter,
}

impl ResourceWalker {
    pub fn builder() -> ResourceWalkerBuilder {
        ResourceWalkerBuilder::new()
    }

    /// Build a walker from configuration.
    ///
    /// Contexts are, in order: the configured search path, the calling
    /// thread's current context (if enabled and installed), and the
    /// deployment directory (if enabled). Parallel scans use the installed
    /// process-wide executor, or a new [`RayonExecutor`].
    pub fn from_config(config: &ScannerConfig) -> ScanResult<Self> {
        let mut builder = Self::builder().with_filter(config.filter);

        if !config.search_path.is_empty() {
            builder = builder.with_search_path(config.search_path.clone());
        }

        if config.include_current_context {
            if let Some(context) = current_context() {
                builder = builder.with_context(context);
            }
        }

        if config.include_deployment_dir {
            match SearchPathContext::deployment() {
                Ok(context) => builder = builder.with_context(Arc::new(context)),
                Err(e) => warn!(error = %e, "Cannot determine deployment directory"),
            }
        }

        if config.parallel {
            let executor = match installed_executor() {
                Some(executor) => executor,
                None => Arc::new(RayonExecutor::new(config.threads)?),
            };
            builder = builder.with_executor(executor);
        }

        Ok(builder.build())
    }

    pub fn contexts(&self) -> &[Arc<dyn ResourceContext>] {
        &self.contexts
    }

    pub fn resolver(&self) -> &Arc<LocatorResolver> {
        &self.resolver
    }

    pub fn executor(&self) -> Option<&Arc<dyn TaskExecutor>> {
        self.executor.as_ref()
    }

    pub fn filter(&self) -> PathFilter {
        self.filter
    }

    /// Candidate locators from every context, de-duplicated in first-seen
    /// order.
    pub fn candidate_locators(&self) -> Vec<Locator> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for context in &self.contexts {
            for probe in CANDIDATE_PROBES {
                match context.find(probe) {
                    Ok(found) => {
                        for locator in found {
                            if seen.insert(locator.external_form()) {
                                candidates.push(locator);
                            }
                        }
                    }
                    Err(e) => {
                        warn!(
                            context = context.name(),
                            probe = probe,
                            error = %e,
                            "Resource lookup failed"
                        );
                    }
                }
            }
        }

        debug!(count = candidates.len(), "Gathered candidate locators");
        candidates
    }

    /// Scan every candidate locator into a new store.
    pub fn scan(&self) -> ScanResult<ResourceStore> {
        let store = ResourceStore::new();
        self.scan_into(&store)?;
        Ok(store)
    }

    /// Scan every candidate locator into `store`.
    pub fn scan_into(&self, store: &ResourceStore) -> ScanResult<ScanSummary> {
        let locators = self.candidate_locators();
        self.scan_locators(&locators, store)
    }

    /// Scan the given locators into `store`.
    ///
    /// # Errors
    ///
    /// Only [`ScanError::TaskFailed`]; per-locator failures are logged and
    /// counted in the summary.
    pub fn scan_locators(
        &self,
        locators: &[Locator],
        store: &ResourceStore,
    ) -> ScanResult<ScanSummary> {
        let started = Instant::now();
        let counters = Arc::new(ScanCounters::default());

        match &self.executor {
            None => self.scan_sequentially(locators, store, &counters)?,
            Some(executor) => {
                self.scan_with_executor(executor.as_ref(), locators, store, &counters)?;
            }
        }

        let summary = ScanSummary {
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            locators_found: locators.len(),
            locators_scanned: counters.scanned.load(Ordering::Relaxed),
            locators_skipped: counters.skipped.load(Ordering::Relaxed),
            locators_failed: counters.failed.load(Ordering::Relaxed),
            keys: store.len(),
            values: store.value_count(),
            executor: self.executor.as_ref().map(|e| e.name().to_string()),
        };

        info!(
            elapsed_ms = summary.elapsed_ms,
            locators = summary.locators_found,
            scanned = summary.locators_scanned,
            skipped = summary.locators_skipped,
            failed = summary.locators_failed,
            keys = summary.keys,
            values = summary.values,
            executor = summary.executor.as_deref().unwrap_or("sequential"),
            "Resource scan complete"
        );

        Ok(summary)
    }

    /// Scan in order on the calling thread, stopping at the first unit that
    /// panics.
    fn scan_sequentially(
        &self,
        locators: &[Locator],
        store: &ResourceStore,
        counters: &ScanCounters,
    ) -> ScanResult<()> {
        for locator in locators {
            run_catching(|| scan_locator(&self.resolver, locator, store, self.filter, counters))
                .map_err(|e| {
                    warn!(locator = %locator, error = %e, "Scan unit failed");
                    ScanError::TaskFailed {
                        locator: locator.external_form(),
                        source: e,
                    }
                })?;
        }
        Ok(())
    }

    fn scan_with_executor(
        &self,
        executor: &dyn TaskExecutor,
        locators: &[Locator],
        store: &ResourceStore,
        counters: &Arc<ScanCounters>,
    ) -> ScanResult<()> {
        let handles: Vec<_> = locators
            .iter()
            .map(|locator| {
                let resolver = Arc::clone(&self.resolver);
                let store = store.clone();
                let counters = Arc::clone(counters);
                let filter = self.filter;
                let task_locator = locator.clone();
                let handle = executor.submit(Box::new(move || {
                    scan_locator(&resolver, &task_locator, &store, filter, &counters);
                }));
                (locator, handle)
            })
            .collect();

        // Join everything before reporting the first failure.
        let mut failure = None;
        for (locator, handle) in handles {
            if let Err(e) = handle.wait() {
                warn!(locator = %locator, error = %e, "Scan task failed");
                if failure.is_none() {
                    failure = Some(ScanError::TaskFailed {
                        locator: locator.external_form(),
                        source: e,
                    });
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ResourceWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let contexts: Vec<_> = self.contexts.iter().map(|c| c.name().to_string()).collect();
        f.debug_struct("ResourceWalker")
            .field("contexts", &contexts)
            .field("resolver", &self.resolver)
            .field("executor", &self.executor.as_ref().map(|e| e.name().to_string()))
            .field("filter", &self.filter)
            .finish()
    }
}

#[derive(Debug, Default)]
struct ScanCounters {
    scanned: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

/// Resolve and walk one locator, recording its paths.
fn scan_locator(
    resolver: &LocatorResolver,
    locator: &Locator,
    store: &ResourceStore,
    filter: PathFilter,
    counters: &ScanCounters,
) {
    debug!(locator = %locator, "Scanning locator");

    let mut dir = match resolver.resolve(locator) {
        Ok(Resolution::Directory(dir)) => dir,
        Ok(Resolution::Skip) => {
            counters.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        Err(e) => {
            warn!(locator = %locator, error = %e, "Cannot resolve locator, skipping");
            counters.failed.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let files = match collect_files(&mut dir) {
        Ok(files) => files,
        Err(e) => {
            warn!(
                locator = %locator,
                directory = %dir.path(),
                error = %e,
                "Failed to walk locator, skipping"
            );
            counters.failed.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    drop(dir);

    let origin = locator.external_form();
    let mut recorded = 0usize;
    for file in files {
        if filter.accepts(file.relative_path()) {
            store.put(file.into_relative_path(), origin.clone());
            recorded += 1;
        }
    }

    debug!(locator = %locator, recorded, "Scanned locator");
    counters.scanned.fetch_add(1, Ordering::Relaxed);
}

/// Builder for [`ResourceWalker`].
#[derive(Default)]
pub struct ResourceWalkerBuilder {
    contexts: Vec<Arc<dyn ResourceContext>>,
    resolver: Option<Arc<LocatorResolver>>,
    executor: Option<Arc<dyn TaskExecutor>>,
    filter: PathFilter,
}

impl ResourceWalkerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource context; contexts are probed in insertion order.
    pub fn with_context(mut self, context: Arc<dyn ResourceContext>) -> Self {
        self.contexts.push(context);
        self
    }

    /// Add a [`SearchPathContext`] over `roots`.
    pub fn with_search_path<I, P>(self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.with_context(Arc::new(SearchPathContext::new("search-path", roots)))
    }

    pub fn with_resolver(mut self, resolver: Arc<LocatorResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn build(self) -> ResourceWalker {
        ResourceWalker {
            contexts: self.contexts,
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(LocatorResolver::new())),
            executor: self.executor,
            filter: self.filter,
        }
    }
}
