//! Build-once index of relative resource paths to their origins.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

/// Result type for store lookups.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The key was never recorded by a scan.
    #[error("resource '{key}' is not configured")]
    NotConfigured { key: String },
}

/// Multimap from relative resource path to origin locator strings.
///
/// Cloning shares the underlying map. Values for a key keep insertion order
/// and are never de-duplicated; appends to one key are atomic, so concurrent
/// walkers can populate the store directly.
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    entries: Arc<DashMap<String, Vec<String>>>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `path` was found at `locator`.
    pub fn put(&self, path: impl Into<String>, locator: impl Into<String>) {
        self.entries
            .entry(path.into())
            .or_default()
            .push(locator.into());
    }

    /// Every origin recorded for `path`.
    pub fn get(&self, path: &str) -> StoreResult<Vec<String>> {
        self.entries
            .get(path)
            .map(|values| values.clone())
            .ok_or_else(|| StoreError::NotConfigured {
                key: path.to_string(),
            })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of origins recorded for `path`; zero when absent.
    pub fn count(&self, path: &str) -> usize {
        self.entries.get(path).map_or(0, |values| values.len())
    }

    /// Snapshot of all keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Keys accepted by `predicate`, with their origins.
    pub fn filter<F>(&self, mut predicate: F) -> Vec<(String, Vec<String>)>
    where
        F: FnMut(&str) -> bool,
    {
        self.entries
            .iter()
            .filter(|entry| predicate(entry.key().as_str()))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of recorded (path, origin) pairs.
    pub fn value_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.value().len()).sum()
    }
}
