//! Assay: streaming statistical profiling for tabular data.
//!
//! Assay builds a complete statistical picture of a dataset in one pass over
//! its rows, in bounded memory: per-column type inference, moments and
//! quantiles, cardinality and frequency sketches, histograms, pairwise
//! correlation, and data-quality observations (missing data, outliers,
//! duplicate rows, likely PII).
//!
//! # Core Principles
//!
//! - **Single pass**: every statistic is computed online; rows are never
//!   buffered or revisited
//! - **Bounded memory**: peak usage scales with columns and sketch sizes,
//!   not with row count
//! - **Composable results**: profiles of row chunks merge into the profile
//!   of the whole, and finished profiles compare against a baseline
//!
//! # Example
//!
//! ```
//! use assay::{FileProfileBuilder, ProfileConfig};
//!
//! let columns = vec!["id".to_string(), "amount".to_string()];
//! let mut builder = FileProfileBuilder::new(columns, ProfileConfig::default()).unwrap();
//!
//! builder.feed_row(&["1", "9.90"]).unwrap();
//! builder.feed_row(&["2", "14.50"]).unwrap();
//!
//! let result = builder.finish().unwrap();
//! println!("Rows: {}", result.total_rows);
//! println!("Columns: {}", result.column_profiles.len());
//! ```

pub mod compare;
pub mod correlate;
pub mod error;
pub mod merge;
pub mod profile;
pub mod quality;
pub mod stats;
pub mod value;

pub use compare::{
    compare_profiles, compare_profiles_with, ColumnComparison, ColumnStatus, CompareConfig,
    ComparisonResult, FileComparison, Metric, MetricDelta, MetricTrend, TrendDirection,
};
pub use correlate::{CorrelationAccumulator, CorrelationMatrix};
pub use error::{AssayError, Result};
pub use merge::merge_profiles;
pub use profile::{
    ColumnProfile, FileProfileBuilder, ProfileConfig, ProfileResult, ProfileSummary,
};
pub use quality::{DuplicateIssue, PiiFinding, PiiType, QualityNote, Severity};
pub use value::{InferredType, ValueClassifier, ValueTypeFamily};
