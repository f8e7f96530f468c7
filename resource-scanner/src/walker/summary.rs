//! Scan statistics.

use std::fmt;

use serde::Serialize;

/// Advisory statistics for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub elapsed_ms: u64,
    /// Candidate locators handed to the scan.
    pub locators_found: usize,
    pub locators_scanned: usize,
    /// Locators resolved to "no scan needed".
    pub locators_skipped: usize,
    /// Locators that could not be resolved or walked.
    pub locators_failed: usize,
    /// Distinct resource paths in the store after the scan.
    pub keys: usize,
    /// Total (path, origin) pairs in the store after the scan.
    pub values: usize,
    /// Executor name, or `None` for a sequential scan.
    pub executor: Option<String>,
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned {} of {} locators ({} skipped, {} failed): {} resources at {} locations in {} ms",
            self.locators_scanned,
            self.locators_found,
            self.locators_skipped,
            self.locators_failed,
            self.keys,
            self.values,
            self.elapsed_ms,
        )?;
        match &self.executor {
            Some(executor) => write!(f, " [{}]", executor),
            None => f.write_str(" [sequential]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let summary = ScanSummary {
            elapsed_ms: 12,
            locators_found: 4,
            locators_scanned: 2,
            locators_skipped: 1,
            locators_failed: 1,
            keys: 10,
            values: 11,
            executor: Some("rayon".to_string()),
        };
        assert_eq!(
            summary.to_string(),
            "scanned 2 of 4 locators (1 skipped, 1 failed): 10 resources at 11 locations in 12 ms [rayon]"
        );
    }

    #[test]
    fn test_serializes_sequential_executor_as_null() {
        let summary = ScanSummary {
            locators_found: 1,
            locators_scanned: 1,
            keys: 3,
            values: 3,
            ..ScanSummary::default()
        };
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["keys"], 3);
        assert_eq!(json["locators_failed"], 0);
        assert!(json["executor"].is_null());
    }
}
