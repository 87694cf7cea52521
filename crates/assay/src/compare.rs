//! Baseline-vs-N profile comparison and trend classification.
//!
//! The comparator never touches raw rows. It diffs finished profiles
//! column by column against one designated baseline, then classifies how
//! each tracked metric moved across all comparison files. Metrics with an
//! inherent quality direction (a falling null rate is better) classify as
//! improving or degrading; direction-free metrics only report whether they
//! moved.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AssayError, Result};
use crate::profile::{ColumnProfile, ProfileResult};

/// Tracked per-column metrics, compared between baseline and current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    NullRate,
    DistinctCount,
    Mean,
    StdDev,
    Min,
    Max,
}

/// All tracked metrics, in report order.
pub const ALL_METRICS: [Metric; 6] = [
    Metric::NullRate,
    Metric::DistinctCount,
    Metric::Mean,
    Metric::StdDev,
    Metric::Min,
    Metric::Max,
];

impl Metric {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::NullRate => "null rate",
            Metric::DistinctCount => "distinct count",
            Metric::Mean => "mean",
            Metric::StdDev => "std dev",
            Metric::Min => "min",
            Metric::Max => "max",
        }
    }

    /// Whether movement in this metric has an inherent quality direction.
    ///
    /// Only the null rate does: less missing data is better. A shifting
    /// mean or min is information, not improvement.
    pub fn is_directional(&self) -> bool {
        matches!(self, Metric::NullRate)
    }

    /// Extract this metric's value from a column profile, if defined.
    fn extract(&self, column: &ColumnProfile) -> Option<f64> {
        match self {
            Metric::NullRate => Some(column.null_rate()),
            Metric::DistinctCount => Some(column.base_stats.distinct_estimate as f64),
            Metric::Mean => column.numeric_stats.as_ref().map(|s| s.mean),
            Metric::StdDev => column.numeric_stats.as_ref().map(|s| s.std_dev),
            Metric::Min => column.numeric_stats.as_ref().map(|s| s.min),
            Metric::Max => column.numeric_stats.as_ref().map(|s| s.max),
        }
    }
}

/// Schema status of one column in one comparison file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnStatus {
    /// Present in the comparison file but not the baseline.
    Added,
    /// Present in the baseline but not the comparison file.
    Removed,
    /// Present in both with a type change or a material metric shift.
    Modified,
    Unchanged,
}

/// One metric's movement between baseline and one comparison file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub metric: Metric,
    pub baseline: f64,
    pub current: f64,
    pub delta: f64,
    /// `delta / baseline * 100`; absent when the baseline is zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_change: Option<f64>,
}

impl MetricDelta {
    fn new(metric: Metric, baseline: f64, current: f64) -> Self {
        let delta = current - baseline;
        let percent_change = if baseline == 0.0 {
            None
        } else {
            Some(delta / baseline * 100.0)
        };
        Self {
            metric,
            baseline,
            current,
            delta,
            percent_change,
        }
    }

    /// Whether the shift clears the materiality threshold.
    ///
    /// A nonzero move away from a zero baseline has no percent change but
    /// is always material.
    fn is_material(&self, materiality_pct: f64) -> bool {
        match self.percent_change {
            Some(pct) => pct.abs() >= materiality_pct,
            None => self.delta != 0.0,
        }
    }
}

/// Diff of one column against the baseline, within one comparison file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnComparison {
    pub name: String,
    pub status: ColumnStatus,
    /// True when the inferred type differs from the baseline.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub type_changed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub deltas: Vec<MetricDelta>,
}

/// Diff of one comparison file against the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileComparison {
    /// Position of the comparison file in the input order.
    pub file_index: usize,
    pub columns: Vec<ColumnComparison>,
}

/// How one column+metric moved across all comparison files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// Directional metric moved in the quality-improving direction.
    Improving,
    /// Directional metric moved in the quality-degrading direction.
    Degrading,
    /// Directional metric stayed within epsilon everywhere.
    Stable,
    /// Delta signs disagree across comparison files.
    Volatile,
    /// Direction-free metric moved materially somewhere.
    Changed,
    /// Direction-free metric stayed within epsilon everywhere.
    Unchanged,
}

/// Aggregated movement of one column+metric across the comparison set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTrend {
    pub column: String,
    pub metric: Metric,
    pub direction: TrendDirection,
    /// Per-file deltas, in input order, for files where the metric was
    /// defined on both sides.
    pub deltas: Vec<f64>,
}

/// Full output of an N-way comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub file_comparisons: Vec<FileComparison>,
    pub trends: Vec<MetricTrend>,
}

/// Thresholds for schema-diff and trend classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Percent change at or above which a metric shift marks a column
    /// modified.
    pub materiality_pct: f64,
    /// Percent change below which a metric is considered unmoved.
    pub epsilon_pct: f64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            materiality_pct: 5.0,
            epsilon_pct: 0.5,
        }
    }
}

/// Compare N profiles against a baseline with default thresholds.
pub fn compare_profiles(
    baseline: &ProfileResult,
    others: &[ProfileResult],
) -> Result<ComparisonResult> {
    compare_profiles_with(baseline, others, &CompareConfig::default())
}

/// Compare N profiles against a baseline.
///
/// Every comparison file must share at least one column with the baseline;
/// a file with zero overlap is an [`AssayError::IncompatibleMerge`], since
/// it cannot be the same logical dataset.
pub fn compare_profiles_with(
    baseline: &ProfileResult,
    others: &[ProfileResult],
    config: &CompareConfig,
) -> Result<ComparisonResult> {
    if others.is_empty() {
        return Err(AssayError::EmptyInput(
            "comparison requires at least one non-baseline profile".to_string(),
        ));
    }
    debug!(files = others.len(), "comparing profiles against baseline");

    let mut file_comparisons = Vec::with_capacity(others.len());
    for (file_index, other) in others.iter().enumerate() {
        let overlap = other
            .column_profiles
            .iter()
            .filter(|c| baseline.column(&c.name).is_some())
            .count();
        if overlap == 0 {
            return Err(AssayError::IncompatibleMerge(format!(
                "comparison file {file_index} shares no columns with the baseline"
            )));
        }
        file_comparisons.push(FileComparison {
            file_index,
            columns: diff_columns(baseline, other, config),
        });
    }

    let trends = classify_trends(baseline, &file_comparisons, config);
    Ok(ComparisonResult {
        file_comparisons,
        trends,
    })
}

fn diff_columns(
    baseline: &ProfileResult,
    other: &ProfileResult,
    config: &CompareConfig,
) -> Vec<ColumnComparison> {
    let mut columns = Vec::new();

    for base_column in &baseline.column_profiles {
        match other.column(&base_column.name) {
            None => columns.push(ColumnComparison {
                name: base_column.name.clone(),
                status: ColumnStatus::Removed,
                type_changed: false,
                deltas: Vec::new(),
            }),
            Some(current) => {
                let deltas: Vec<MetricDelta> = ALL_METRICS
                    .iter()
                    .filter_map(|metric| {
                        let b = metric.extract(base_column)?;
                        let c = metric.extract(current)?;
                        Some(MetricDelta::new(*metric, b, c))
                    })
                    .collect();
                let type_changed =
                    base_column.base_stats.inferred_type != current.base_stats.inferred_type;
                let modified = type_changed
                    || deltas.iter().any(|d| d.is_material(config.materiality_pct));
                columns.push(ColumnComparison {
                    name: base_column.name.clone(),
                    status: if modified {
                        ColumnStatus::Modified
                    } else {
                        ColumnStatus::Unchanged
                    },
                    type_changed,
                    deltas,
                });
            }
        }
    }

    for current in &other.column_profiles {
        if baseline.column(&current.name).is_none() {
            columns.push(ColumnComparison {
                name: current.name.clone(),
                status: ColumnStatus::Added,
                type_changed: false,
                deltas: Vec::new(),
            });
        }
    }

    columns
}

fn classify_trends(
    baseline: &ProfileResult,
    file_comparisons: &[FileComparison],
    config: &CompareConfig,
) -> Vec<MetricTrend> {
    let mut trends = Vec::new();

    for base_column in &baseline.column_profiles {
        for metric in ALL_METRICS {
            let observations: Vec<&MetricDelta> = file_comparisons
                .iter()
                .flat_map(|f| &f.columns)
                .filter(|c| c.name == base_column.name)
                .flat_map(|c| &c.deltas)
                .filter(|d| d.metric == metric)
                .collect();
            if observations.is_empty() {
                continue;
            }

            let direction = classify(&observations, metric, config.epsilon_pct);
            trends.push(MetricTrend {
                column: base_column.name.clone(),
                metric,
                direction,
                deltas: observations.iter().map(|d| d.delta).collect(),
            });
        }
    }

    trends
}

fn classify(observations: &[&MetricDelta], metric: Metric, epsilon_pct: f64) -> TrendDirection {
    let within_epsilon = |d: &MetricDelta| match d.percent_change {
        Some(pct) => pct.abs() < epsilon_pct,
        None => d.delta == 0.0,
    };
    if observations.iter().all(|d| within_epsilon(d)) {
        return if metric.is_directional() {
            TrendDirection::Stable
        } else {
            TrendDirection::Unchanged
        };
    }

    let any_up = observations.iter().any(|d| d.delta > 0.0);
    let any_down = observations.iter().any(|d| d.delta < 0.0);
    if any_up && any_down {
        return TrendDirection::Volatile;
    }

    if metric.is_directional() {
        // For the null rate, down is the improving direction.
        if any_down {
            TrendDirection::Improving
        } else {
            TrendDirection::Degrading
        }
    } else {
        TrendDirection::Changed
    }
}
