//! Duplicate-row detection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

use super::Severity;

/// Duplicated-row share above which the issue is a warning.
const WARN_THRESHOLD_PCT: f64 = 10.0;

/// Duplicated-row share above which the issue is reported at all.
const INFO_THRESHOLD_PCT: f64 = 1.0;

/// A duplicate-rows observation for one profiled file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateIssue {
    pub severity: Severity,
    /// Rows that repeat an earlier row.
    pub duplicate_rows: u64,
    /// Distinct row values that occur more than once.
    pub duplicate_groups: u64,
    /// Share of all rows that are repeats, as a percentage.
    pub percentage: f64,
    pub message: String,
}

/// Streaming whole-row duplicate detector.
///
/// Rows are reduced to a 64-bit hash over their cells with a field
/// separator, so memory stays one map entry per distinct row rather than a
/// copy of the row itself. Hash collisions can in principle conflate two
/// distinct rows; at 64 bits that is negligible next to the sketch error
/// elsewhere in a profile.
#[derive(Debug, Clone, Default)]
pub struct DuplicateDetector {
    seen: HashMap<u64, u64>,
    rows: u64,
}

impl DuplicateDetector {
    /// Create an empty detector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one row.
    pub fn record(&mut self, cells: &[&str]) {
        let mut hasher = Xxh3::new();
        for cell in cells {
            hasher.update(cell.as_bytes());
            // Separator keeps ["ab",""] distinct from ["a","b"].
            hasher.update(&[0x1f]);
        }
        *self.seen.entry(hasher.digest()).or_insert(0) += 1;
        self.rows += 1;
    }

    /// Rows recorded so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Report duplicate issues, if the duplicated share crosses a threshold.
    pub fn finalize(&self) -> Vec<DuplicateIssue> {
        if self.rows == 0 {
            return Vec::new();
        }

        let duplicate_rows: u64 = self
            .seen
            .values()
            .filter(|&&c| c > 1)
            .map(|&c| c - 1)
            .sum();
        if duplicate_rows == 0 {
            return Vec::new();
        }

        let duplicate_groups = self.seen.values().filter(|&&c| c > 1).count() as u64;
        let percentage = duplicate_rows as f64 / self.rows as f64 * 100.0;

        let severity = if percentage > WARN_THRESHOLD_PCT {
            Severity::Warning
        } else if percentage > INFO_THRESHOLD_PCT {
            Severity::Info
        } else {
            return Vec::new();
        };

        vec![DuplicateIssue {
            severity,
            duplicate_rows,
            duplicate_groups,
            percentage,
            message: format!(
                "{duplicate_rows} duplicate rows ({percentage:.1}% of {total}) across \
                 {duplicate_groups} repeated row values",
                total = self.rows
            ),
        }]
    }
}
