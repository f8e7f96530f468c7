use std::any::Any;
use std::sync::Arc;

use tracing::debug;

use super::{ReaderResult, ResourceReader};
use crate::resolver::{LocatorResolver, Resolution};
use crate::scanner::ResourceScanner;
use crate::vfs::{FileReader, VirtualDirectory};
use crate::walker::ScanError;

pub const CLASSPATH_PREFIX: &str = "classpath:";

/// `classpath:` resources, located through a scan index.
///
/// The index comes from, in order: an `Arc<ResourceScanner>` passed as the
/// context, the scanner given at construction, or the process-wide
/// instance. The first origin that can open the resource wins.
pub struct SearchPathResourceReader {
    scanner: Option<Arc<ResourceScanner>>,
    resolver: Arc<LocatorResolver>,
}

impl SearchPathResourceReader {
    pub fn new() -> Self {
        Self {
            scanner: None,
            resolver: Arc::new(LocatorResolver::new()),
        }
    }

    pub fn with_scanner(scanner: Arc<ResourceScanner>) -> Self {
        Self {
            scanner: Some(scanner),
            ..Self::new()
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<LocatorResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    fn scanner_for(&self, context: Option<&dyn Any>) -> ReaderResult<Arc<ResourceScanner>> {
        if let Some(scanner) = context.and_then(|c| c.downcast_ref::<Arc<ResourceScanner>>()) {
            return Ok(Arc::clone(scanner));
        }
        match &self.scanner {
            Some(scanner) => Ok(Arc::clone(scanner)),
            None => Ok(ResourceScanner::instance()?),
        }
    }

    fn relative_path(path: &str) -> &str {
        path.strip_prefix(CLASSPATH_PREFIX)
            .unwrap_or(path)
            .trim_start_matches('/')
    }
}

impl Default for SearchPathResourceReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceReader for SearchPathResourceReader {
    fn name(&self) -> &str {
        "classpath"
    }

    fn order(&self) -> i64 {
        -50
    }

    fn can_read(&self, path: &str, _context: Option<&dyn Any>) -> bool {
        path.starts_with(CLASSPATH_PREFIX)
    }

    fn exists(&self, path: &str, context: Option<&dyn Any>) -> bool {
        self.can_read(path, context)
            && self
                .scanner_for(context)
                .is_ok_and(|scanner| scanner.exists(Self::relative_path(path)))
    }

    fn load(&self, path: &str, context: Option<&dyn Any>) -> ReaderResult<Option<FileReader>> {
        if !self.can_read(path, context) {
            return Ok(None);
        }

        let relative = Self::relative_path(path);
        let scanner = self.scanner_for(context)?;
        let locators = match scanner.locators(relative) {
            Ok(locators) => locators,
            Err(ScanError::Store(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        for locator in locators {
            debug!(resource = relative, locator = %locator, "Opening resource from search path");
            let mut dir = match self.resolver.resolve(&locator) {
                Ok(Resolution::Directory(dir)) => dir,
                Ok(Resolution::Skip) => continue,
                Err(e) => {
                    debug!(locator = %locator, error = %e, "Cannot resolve resource origin");
                    continue;
                }
            };
            match dir.open(relative) {
                Ok(stream) => return Ok(Some(stream)),
                Err(e) => debug!(locator = %locator, error = %e, "Resource not readable at origin"),
            }
        }
        Ok(None)
    }
}
