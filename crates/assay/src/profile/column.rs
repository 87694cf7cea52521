//! Per-column profile types and their assembly from accumulator state.

use serde::{Deserialize, Serialize};

use crate::quality::{PiiFinding, PiiTracker, QualityNote};
use crate::stats::{Accumulator, Histogram, TopValue};
use crate::value::{InferredType, ValueTypeFamily};

/// Minority share of non-null values above which a column is `Mixed`.
pub const MIXED_TYPE_THRESHOLD: f64 = 0.05;

/// Missing-rate above which a warning note is attached.
const MISSING_WARN_RATE: f64 = 0.10;

/// Missing-rate above which the note escalates to an error.
const MISSING_ERROR_RATE: f64 = 0.50;

/// Distinct ratio above which a string column looks identifier-like.
const HIGH_CARDINALITY_RATIO: f64 = 0.9;

/// Minimum non-null values before the high-cardinality note applies.
const HIGH_CARDINALITY_MIN_COUNT: u64 = 20;

/// Numeric share of non-null values for the "mostly numeric" note.
const MOSTLY_NUMERIC_RATIO: f64 = 0.9;

/// Per-family value tallies for one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyCounts {
    pub integer: u64,
    pub numeric: u64,
    pub boolean: u64,
    pub date: u64,
    pub string: u64,
    pub null: u64,
}

impl FamilyCounts {
    /// Record one classified cell.
    pub fn tally(&mut self, family: ValueTypeFamily) {
        match family {
            ValueTypeFamily::Integer => self.integer += 1,
            ValueTypeFamily::Numeric => self.numeric += 1,
            ValueTypeFamily::Boolean => self.boolean += 1,
            ValueTypeFamily::Date => self.date += 1,
            ValueTypeFamily::String => self.string += 1,
            ValueTypeFamily::Null => self.null += 1,
        }
    }

    /// Total cells tallied, including nulls.
    pub fn total(&self) -> u64 {
        self.integer + self.numeric + self.boolean + self.date + self.string + self.null
    }

    /// Non-null cells tallied.
    pub fn non_null(&self) -> u64 {
        self.total() - self.null
    }

    /// Integer and floating-point cells together.
    ///
    /// Integers are a subfamily of numeric for inference purposes: a column
    /// of mostly-integers with a few floats is `Numeric`, not `Mixed`.
    pub fn numeric_pool(&self) -> u64 {
        self.integer + self.numeric
    }

    /// Add another column's tallies.
    pub fn merge(&mut self, other: &Self) {
        self.integer += other.integer;
        self.numeric += other.numeric;
        self.boolean += other.boolean;
        self.date += other.date;
        self.string += other.string;
        self.null += other.null;
    }

    /// Infer the column type from the tallies.
    pub fn infer_type(&self, mixed_threshold: f64) -> InferredType {
        let non_null = self.non_null();
        if non_null == 0 {
            return InferredType::Empty;
        }

        let pools = [
            (self.numeric_pool(), 0u8),
            (self.date, 1),
            (self.boolean, 2),
            (self.string, 3),
        ];
        let &(majority_count, majority_tag) =
            pools.iter().max_by_key(|&&(count, _)| count).unwrap();

        let minority = non_null - majority_count;
        if minority as f64 > mixed_threshold * non_null as f64 {
            return InferredType::Mixed;
        }

        match majority_tag {
            0 => {
                if self.numeric == 0 {
                    InferredType::Integer
                } else {
                    InferredType::Numeric
                }
            }
            1 => InferredType::Date,
            2 => InferredType::Boolean,
            _ => InferredType::String,
        }
    }

    /// Fraction of non-null values in the majority family, in [0, 1].
    pub fn majority_fraction(&self) -> f64 {
        let non_null = self.non_null();
        if non_null == 0 {
            return 1.0;
        }
        let majority = self
            .numeric_pool()
            .max(self.date)
            .max(self.boolean)
            .max(self.string);
        majority as f64 / non_null as f64
    }
}

/// Counts and type for one column, always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseStats {
    /// Cells observed, including missing ones.
    pub count: u64,
    /// Missing (null-family) cells.
    pub missing: u64,
    /// Estimated distinct non-null values.
    pub distinct_estimate: u64,
    pub inferred_type: InferredType,
}

/// Descriptive statistics for numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sum: f64,
    /// Numeric values observed (excludes missing and non-numeric cells).
    pub count: u64,
    pub std_dev: f64,
    pub variance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skewness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kurtosis: Option<f64>,
    pub median: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Frequency statistics for string-family values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStats {
    pub top_values: Vec<TopValue>,
    pub unique_count: u64,
    /// True when the distinct-value tracking cap was exceeded, making
    /// `unique_count` a lower bound.
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

/// Mergeable accumulator state carried alongside a finished column profile.
///
/// This is what lets two finished `ProfileResult`s combine without
/// re-scanning raw data: additive statistics merge losslessly and the
/// sketches merge within their documented error bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeState {
    pub families: FamilyCounts,
    pub accumulators: Vec<Accumulator>,
    pub outlier_count: u64,
    pub pii: PiiTracker,
}

impl MergeState {
    /// Combine another column's state into this one.
    pub fn merge(&mut self, other: &Self) -> crate::error::Result<()> {
        if self.accumulators.len() != other.accumulators.len() {
            return Err(crate::error::AssayError::IncompatibleMerge(format!(
                "accumulator set mismatch: {} vs {}",
                self.accumulators.len(),
                other.accumulators.len()
            )));
        }
        for (mine, theirs) in self.accumulators.iter_mut().zip(&other.accumulators) {
            mine.merge(theirs)?;
        }
        self.families.merge(&other.families);
        self.outlier_count += other.outlier_count;
        self.pii.merge(&other.pii);
        Ok(())
    }
}

/// Row indices flagged during a scan, each capped by configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlaggedRows {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub missing: Vec<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub outliers: Vec<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub pii: Vec<usize>,
}

/// Complete profile of one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub base_stats: BaseStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_stats: Option<NumericStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categorical_stats: Option<CategoricalStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histogram: Option<Histogram>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sample_values: Vec<String>,
    pub flagged_rows: FlaggedRows,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pii_finding: Option<PiiFinding>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<QualityNote>,
    /// Composite quality indicator in [0, 1].
    pub health_score: f64,
    pub merge_state: MergeState,
}

impl ColumnProfile {
    /// Assemble a profile from accumulated state.
    ///
    /// Shared by the end-of-scan finalize path and the merge coordinator,
    /// so a merged profile is derived exactly the way a single-pass profile
    /// would be.
    pub(crate) fn from_state(
        name: String,
        mut state: MergeState,
        sample_values: Vec<String>,
        flagged_rows: FlaggedRows,
        top_k: usize,
    ) -> Self {
        let families = state.families;
        let count = families.total();
        let missing = families.null;
        let non_null = families.non_null();
        let inferred_type = families.infer_type(MIXED_TYPE_THRESHOLD);

        let mut distinct_estimate = 0;
        let mut numeric_stats = None;
        let mut categorical_stats = None;
        let mut histogram = None;

        let mut moments_snapshot = None;
        let mut quantile_snapshot = None;
        for acc in &mut state.accumulators {
            match acc {
                Accumulator::Distinct(sketch) => {
                    // The estimator can overshoot; the truth never exceeds
                    // the non-null count.
                    distinct_estimate = sketch.estimate().min(non_null);
                }
                Accumulator::Moments(m) => {
                    if !m.is_empty() {
                        moments_snapshot = Some(m.clone());
                    }
                }
                Accumulator::Quantile(q) => {
                    if !q.is_empty() {
                        quantile_snapshot = Some(q.clone());
                    }
                }
                Accumulator::Frequency(freq) => {
                    if !freq.is_empty() {
                        categorical_stats = Some(CategoricalStats {
                            top_values: freq.top_k(top_k),
                            unique_count: freq.unique_count(),
                            truncated: freq.is_truncated(),
                            min_length: freq.min_length(),
                            max_length: freq.max_length(),
                        });
                    }
                }
                Accumulator::Histogram(h) => {
                    if inferred_type.is_numeric() {
                        histogram = h.finalize();
                    }
                }
            }
        }

        if inferred_type.is_numeric() {
            if let (Some(m), Some(mut q)) = (moments_snapshot, quantile_snapshot) {
                numeric_stats = Some(NumericStats {
                    min: m.min().unwrap_or(0.0),
                    max: m.max().unwrap_or(0.0),
                    mean: m.mean().unwrap_or(0.0),
                    sum: m.sum(),
                    count: m.count(),
                    std_dev: m.std_dev(),
                    variance: m.variance(),
                    skewness: m.skewness(),
                    kurtosis: m.kurtosis(),
                    median: q.percentile(50.0).unwrap_or(0.0),
                    p25: q.percentile(25.0).unwrap_or(0.0),
                    p75: q.percentile(75.0).unwrap_or(0.0),
                    p90: q.percentile(90.0).unwrap_or(0.0),
                    p95: q.percentile(95.0).unwrap_or(0.0),
                    p99: q.percentile(99.0).unwrap_or(0.0),
                });
            }
        }

        let pii_finding = state.pii.finalize(&name);
        let notes = build_notes(
            &families,
            inferred_type,
            distinct_estimate,
            pii_finding.as_ref(),
        );
        let health_score = health_score(
            &families,
            inferred_type,
            distinct_estimate,
            state.outlier_count,
        );

        Self {
            name,
            base_stats: BaseStats {
                count,
                missing,
                distinct_estimate,
                inferred_type,
            },
            numeric_stats,
            categorical_stats,
            histogram,
            sample_values,
            flagged_rows,
            pii_finding,
            notes,
            health_score,
            merge_state: state,
        }
    }

    /// Missing share of all cells, as a percentage.
    pub fn null_rate(&self) -> f64 {
        if self.base_stats.count == 0 {
            0.0
        } else {
            self.base_stats.missing as f64 / self.base_stats.count as f64 * 100.0
        }
    }
}

fn build_notes(
    families: &FamilyCounts,
    inferred_type: InferredType,
    distinct_estimate: u64,
    pii_finding: Option<&PiiFinding>,
) -> Vec<QualityNote> {
    let mut notes = Vec::new();
    let count = families.total();
    let non_null = families.non_null();

    if count > 0 {
        let missing_rate = families.null as f64 / count as f64;
        if missing_rate > MISSING_ERROR_RATE {
            notes.push(QualityNote::error(format!(
                "High missing rate: {:.1}% of values are missing",
                missing_rate * 100.0
            )));
        } else if missing_rate > MISSING_WARN_RATE {
            notes.push(QualityNote::warning(format!(
                "Elevated missing rate: {:.1}% of values are missing",
                missing_rate * 100.0
            )));
        }
    }

    if non_null > 0 && distinct_estimate <= 1 {
        notes.push(QualityNote::info(
            "Column is constant: every non-missing value is identical",
        ));
    }

    if inferred_type == InferredType::String
        && non_null >= HIGH_CARDINALITY_MIN_COUNT
        && distinct_estimate as f64 / non_null as f64 > HIGH_CARDINALITY_RATIO
    {
        notes.push(QualityNote::info(
            "Nearly all values are distinct; column may be an identifier",
        ));
    }

    if inferred_type == InferredType::Mixed && non_null > 0 {
        let numeric_share = families.numeric_pool() as f64 / non_null as f64;
        if numeric_share >= MOSTLY_NUMERIC_RATIO {
            let exceptions = non_null - families.numeric_pool();
            notes.push(QualityNote::info(format!(
                "Mostly numeric: {exceptions} non-numeric values prevent a numeric classification"
            )));
        }
    }

    if let Some(finding) = pii_finding {
        notes.push(QualityNote::new(
            finding.pii_type.severity(),
            format!(
                "Possible {} values detected ({:.0}% of sampled values)",
                finding.pii_type.label(),
                finding.percentage
            ),
        ));
    }

    notes
}

/// Weighted composite health score in [0, 1].
fn health_score(
    families: &FamilyCounts,
    inferred_type: InferredType,
    distinct_estimate: u64,
    outlier_count: u64,
) -> f64 {
    let count = families.total();
    if count == 0 {
        return 0.0;
    }

    let completeness = 1.0 - families.null as f64 / count as f64;
    let type_consistency = if inferred_type == InferredType::Mixed {
        families.majority_fraction()
    } else {
        1.0
    };
    let uniqueness = (distinct_estimate as f64 / count as f64).min(1.0);
    let outlier_rate = (outlier_count as f64 / count as f64).min(1.0);

    0.4 * completeness + 0.3 * type_consistency + 0.2 * uniqueness + 0.1 * (1.0 - outlier_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(
        integer: u64,
        numeric: u64,
        boolean: u64,
        date: u64,
        string: u64,
        null: u64,
    ) -> FamilyCounts {
        FamilyCounts {
            integer,
            numeric,
            boolean,
            date,
            string,
            null,
        }
    }

    #[test]
    fn test_infer_integer_column() {
        let c = counts(95, 0, 0, 0, 0, 5);
        assert_eq!(c.infer_type(MIXED_TYPE_THRESHOLD), InferredType::Integer);
    }

    #[test]
    fn test_integers_with_floats_are_numeric() {
        let c = counts(80, 20, 0, 0, 0, 0);
        assert_eq!(c.infer_type(MIXED_TYPE_THRESHOLD), InferredType::Numeric);
    }

    #[test]
    fn test_minority_over_threshold_is_mixed() {
        // 3 integers + 1 string: 25% minority exceeds the 5% threshold.
        let c = counts(3, 0, 0, 0, 1, 0);
        assert_eq!(c.infer_type(MIXED_TYPE_THRESHOLD), InferredType::Mixed);
    }

    #[test]
    fn test_small_minority_tolerated() {
        let c = counts(97, 0, 0, 0, 3, 0);
        assert_eq!(c.infer_type(MIXED_TYPE_THRESHOLD), InferredType::Integer);
    }

    #[test]
    fn test_all_null_is_empty() {
        let c = counts(0, 0, 0, 0, 0, 10);
        assert_eq!(c.infer_type(MIXED_TYPE_THRESHOLD), InferredType::Empty);
    }

    #[test]
    fn test_inference_is_idempotent() {
        let c = counts(40, 5, 0, 0, 2, 3);
        let first = c.infer_type(MIXED_TYPE_THRESHOLD);
        assert_eq!(first, c.infer_type(MIXED_TYPE_THRESHOLD));
    }

    #[test]
    fn test_health_score_perfect_column() {
        // Complete, consistent, fully unique, no outliers.
        let c = counts(100, 0, 0, 0, 0, 0);
        let score = health_score(&c, InferredType::Integer, 100, 0);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_health_score_penalizes_missing() {
        let full = counts(100, 0, 0, 0, 0, 0);
        let holey = counts(50, 0, 0, 0, 0, 50);
        let a = health_score(&full, InferredType::Integer, 50, 0);
        let b = health_score(&holey, InferredType::Integer, 50, 0);
        assert!(b < a);
    }

    #[test]
    fn test_missing_rate_notes() {
        let c = counts(4, 0, 0, 0, 0, 6);
        let notes = build_notes(&c, InferredType::Integer, 4, None);
        assert!(notes.iter().any(|n| n.message.contains("missing")));
        assert_eq!(notes[0].severity, crate::quality::Severity::Error);
    }
}
