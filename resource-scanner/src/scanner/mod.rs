//! Query facade over a completed scan.
//!
//! [`ResourceScanner`] owns the store produced by one scan and answers
//! existence, uniqueness and pattern queries against it. The process-wide
//! instance returned by [`ResourceScanner::instance`] is built on first use
//! from [`ScannerConfig::from_environment`] and shared afterwards.

use std::cell::Cell;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::{const_mutex, Mutex};
use regex::Regex;

use crate::config::ScannerConfig;
use crate::locator::Locator;
use crate::store::{ResourceStore, StoreResult};
use crate::walker::{ResourceWalker, ScanError, ScanResult, ScanSummary};

/// A regular expression matched against whole resource paths.
#[derive(Debug, Clone)]
pub struct ResourcePattern {
    source: String,
    regex: Regex,
}

impl ResourcePattern {
    pub fn new(pattern: &str) -> ScanResult<Self> {
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| {
            ScanError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl FromStr for ResourcePattern {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

static INSTANCE: Mutex<Option<Arc<ResourceScanner>>> = const_mutex(None);

thread_local! {
    static BUILDING_INSTANCE: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as building the shared instance until dropped.
struct BuildingInstance;

impl BuildingInstance {
    fn enter() -> Self {
        BUILDING_INSTANCE.with(|building| building.set(true));
        Self
    }
}

impl Drop for BuildingInstance {
    fn drop(&mut self) {
        BUILDING_INSTANCE.with(|building| building.set(false));
    }
}

/// Read-only view over a resource index.
#[derive(Debug, Clone)]
pub struct ResourceScanner {
    store: ResourceStore,
    summary: ScanSummary,
}

impl ResourceScanner {
    /// Run `walker` once and keep the result.
    pub fn scan(walker: &ResourceWalker) -> ScanResult<Self> {
        let store = ResourceStore::new();
        let summary = walker.scan_into(&store)?;
        Ok(Self { store, summary })
    }

    pub fn from_config(config: &ScannerConfig) -> ScanResult<Self> {
        Self::scan(&ResourceWalker::from_config(config)?)
    }

    /// Wrap an already populated store.
    pub fn from_store(store: ResourceStore) -> Self {
        let summary = ScanSummary {
            keys: store.len(),
            values: store.value_count(),
            ..ScanSummary::default()
        };
        Self { store, summary }
    }

    /// The process-wide scanner, scanning on first use.
    ///
    /// Concurrent first calls block until the single scan finishes and then
    /// share its result. A failed initialization is not cached.
    ///
    /// The scan runs while the instance lock is held, and the lock is not
    /// reentrant. A call from the building thread during that scan (from a
    /// resource context, say) fails with [`ScanError::ReentrantInstance`]. A
    /// call from an executor thread working for that scan deadlocks; build
    /// such components on an explicit [`ResourceScanner`] instead.
    pub fn instance() -> ScanResult<Arc<Self>> {
        if BUILDING_INSTANCE.with(Cell::get) {
            return Err(ScanError::ReentrantInstance);
        }

        let mut slot = INSTANCE.lock();
        if let Some(scanner) = slot.as_ref() {
            return Ok(Arc::clone(scanner));
        }

        let _building = BuildingInstance::enter();
        let config = ScannerConfig::from_environment()?;
        let scanner = Arc::new(Self::from_config(&config)?);
        *slot = Some(Arc::clone(&scanner));
        Ok(scanner)
    }

    /// Drop the process-wide scanner so the next [`instance`](Self::instance)
    /// call scans again.
    pub fn reset_instance() {
        INSTANCE.lock().take();
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn summary(&self) -> &ScanSummary {
        &self.summary
    }

    /// Resource paths matching `pattern`.
    pub fn matching(&self, pattern: &ResourcePattern) -> HashSet<String> {
        self.store
            .keys()
            .into_iter()
            .filter(|key| pattern.is_match(key))
            .collect()
    }

    /// Origin locators of every resource path matching `pattern`.
    pub fn locations_matching(&self, pattern: &ResourcePattern) -> HashSet<String> {
        self.store
            .filter(|key| pattern.is_match(key))
            .into_iter()
            .flat_map(|(_, origins)| origins)
            .collect()
    }

    /// Resource paths matching a shell-style glob.
    pub fn matching_glob(&self, pattern: &glob::Pattern) -> HashSet<String> {
        self.store
            .keys()
            .into_iter()
            .filter(|key| pattern.matches(key))
            .collect()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.store.contains(path)
    }

    /// Whether `path` was found at exactly one origin.
    pub fn is_unique(&self, path: &str) -> bool {
        self.store.count(path) == 1
    }

    /// Origin locator strings of `path`, in scan order.
    pub fn locations(&self, path: &str) -> StoreResult<Vec<String>> {
        self.store.get(path)
    }

    /// Origins of `path` as parsed locators.
    pub fn locators(&self, path: &str) -> ScanResult<Vec<Locator>> {
        self.store
            .get(path)?
            .iter()
            .map(|origin| Locator::parse(origin).map_err(|e| ScanError::Vfs(e.into())))
            .collect()
    }
}
