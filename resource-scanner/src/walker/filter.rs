//! Path filter applied before paths are indexed.

use serde::Serialize;

/// Decides which relative paths are recorded in the store.
///
/// By default compiled `.class` files and everything under `META-INF/` are
/// left out of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PathFilter {
    pub skip_class_files: bool,
    pub skip_meta_inf: bool,
}

impl PathFilter {
    /// A filter that accepts every path.
    pub fn accept_all() -> Self {
        Self {
            skip_class_files: false,
            skip_meta_inf: false,
        }
    }

    pub fn with_skip_class_files(mut self, skip: bool) -> Self {
        self.skip_class_files = skip;
        self
    }

    pub fn with_skip_meta_inf(mut self, skip: bool) -> Self {
        self.skip_meta_inf = skip;
        self
    }

    pub fn accepts(&self, path: &str) -> bool {
        if self.skip_class_files && path.ends_with(".class") {
            return false;
        }
        if self.skip_meta_inf && path.starts_with("META-INF/") {
            return false;
        }
        true
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self {
            skip_class_files: true,
            skip_meta_inf: true,
        }
    }
}
