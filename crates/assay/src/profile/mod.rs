//! Streaming profile construction and its result types.

pub mod builder;
pub mod column;
pub mod profiler;
pub mod result;

pub use builder::{FileProfileBuilder, ProfileConfig, ProgressCallback};
pub use column::{
    BaseStats, CategoricalStats, ColumnProfile, FamilyCounts, FlaggedRows, MergeState,
    NumericStats,
};
pub use profiler::ColumnProfiler;
pub use result::{ProfileResult, ProfileSummary};
