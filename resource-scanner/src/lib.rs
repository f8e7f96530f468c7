//! Resource Scanner - resource discovery over directories and archives
//!
//! This library enumerates every resource reachable from a program's lookup
//! locations (directories, jar/zip archives, archives nested in archives, and
//! container-managed virtual filesystems) and indexes them by relative path.
//!
//! ```no_run
//! use resource_scanner::{ResourcePattern, ResourceScanner, ResourceWalker};
//!
//! # fn main() -> Result<(), resource_scanner::ScanError> {
//! let walker = ResourceWalker::builder()
//!     .with_search_path(["target/classes", "lib/core.jar"])
//!     .build();
//! let scanner = ResourceScanner::scan(&walker)?;
//!
//! for path in scanner.matching(&ResourcePattern::new("config/.*\\.properties")?) {
//!     println!("{} unique={}", path, scanner.is_unique(&path));
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod executor;
pub mod locator;
pub mod reader;
pub mod resolver;
pub mod scanner;
pub mod store;
pub mod vfs;
pub mod walker;

pub use config::{ConfigError, ConfigResult, ScannerConfig};
pub use context::{current_context, set_current_context, ResourceContext, SearchPathContext};
pub use executor::{install_executor, RayonExecutor, TaskExecutor, TaskHandle};
pub use locator::{Locator, LocatorError};
pub use reader::{ReaderError, ResourceReader, ResourceUtil};
pub use resolver::{
    register_locator_type, CustomLocatorType, LocatorResolver, LocatorType, Resolution,
};
pub use scanner::{ResourcePattern, ResourceScanner};
pub use store::{ResourceStore, StoreError, StoreResult};
pub use vfs::{VfsError, VfsResult, VirtualDirectory, VirtualFile};
pub use walker::{PathFilter, ResourceWalker, ScanError, ScanResult, ScanSummary};
