//! Finished profile of one scanned file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::correlate::{CorrelationAccumulator, CorrelationMatrix};
use crate::error::Result;
use crate::quality::{DuplicateIssue, Severity};

use super::column::ColumnProfile;

/// Immutable output of one completed profiling pass.
///
/// Everything downstream (display, export, merging, comparison) consumes
/// this structure; nothing re-reads raw rows after it exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResult {
    pub column_profiles: Vec<ColumnProfile>,
    /// Rows fed during the scan, including fully-missing ones.
    pub total_rows: u64,
    /// When the scan (or merge) finished.
    pub generated_at: DateTime<Utc>,
    /// Wall-clock duration of the scan (or merge) in milliseconds.
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_matrix: Option<CorrelationMatrix>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub duplicate_issues: Vec<DuplicateIssue>,
    /// Pairwise sums behind the correlation matrix, carried so finished
    /// results can merge without re-scanning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_state: Option<CorrelationAccumulator>,
}

impl ProfileResult {
    /// Look up one column's profile by name.
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.column_profiles.iter().find(|c| c.name == name)
    }

    /// All column names, in profile order.
    pub fn column_names(&self) -> Vec<&str> {
        self.column_profiles.iter().map(|c| c.name.as_str()).collect()
    }

    /// Names of columns that finalized as numeric, in profile order.
    pub fn numeric_column_names(&self) -> Vec<String> {
        self.column_profiles
            .iter()
            .filter(|c| c.base_stats.inferred_type.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Aggregate one-screen view of the profile.
    pub fn summary(&self) -> ProfileSummary {
        let column_count = self.column_profiles.len();
        let numeric_columns = self
            .column_profiles
            .iter()
            .filter(|c| c.base_stats.inferred_type.is_numeric())
            .count();
        let mean_health_score = if column_count == 0 {
            0.0
        } else {
            self.column_profiles.iter().map(|c| c.health_score).sum::<f64>()
                / column_count as f64
        };

        let mut error_notes = 0;
        let mut warning_notes = 0;
        let mut info_notes = 0;
        for note in self
            .column_profiles
            .iter()
            .flat_map(|c| c.notes.iter().map(|n| n.severity))
            .chain(self.duplicate_issues.iter().map(|d| d.severity))
        {
            match note {
                Severity::Error => error_notes += 1,
                Severity::Warning => warning_notes += 1,
                Severity::Info => info_notes += 1,
            }
        }

        ProfileSummary {
            total_rows: self.total_rows,
            column_count,
            numeric_columns,
            mean_health_score,
            error_notes,
            warning_notes,
            info_notes,
        }
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON produced by [`ProfileResult::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Roll-up counts over a [`ProfileResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub total_rows: u64,
    pub column_count: usize,
    pub numeric_columns: usize,
    /// Mean of per-column health scores, in [0, 1].
    pub mean_health_score: f64,
    pub error_notes: usize,
    pub warning_notes: usize,
    pub info_notes: usize,
}
