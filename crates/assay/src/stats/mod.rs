//! Streaming statistic accumulators.
//!
//! Every accumulator shares the same contract: `update` accepts one cell and
//! silently ignores values outside its domain (domain misses are tallied by
//! the owning column profiler, not here); `merge` combines two accumulators
//! of the same kind and fails structurally otherwise; `result` summarizes
//! what was seen, yielding `None` when no applicable value ever arrived.
//!
//! All accumulators are order-invariant and their merges are commutative and
//! associative, so chunked, merged, or single-pass processing of the same
//! rows produces the same result (within documented sketch error for the
//! probabilistic ones).

pub mod distinct;
pub mod frequency;
pub mod histogram;
pub mod moments;
pub mod quantile;

pub use distinct::DistinctCountEstimator;
pub use frequency::{CategoricalFrequencyAccumulator, TopValue};
pub use histogram::{Histogram, HistogramBin, HistogramBuilder};
pub use moments::NumericMomentsAccumulator;
pub use quantile::QuantileEstimator;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AssayError, Result};
use crate::value::ValueTypeFamily;

/// Summary value produced by [`Accumulator::result`].
pub type StatValue = serde_json::Value;

/// Tagged union over the concrete accumulator kinds.
///
/// Orchestration code (column profilers, the merge coordinator) iterates
/// over `Vec<Accumulator>` without caring which statistic each one computes;
/// the variant tag is what makes a cross-kind merge detectable as a
/// structural error rather than silent corruption.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "state")]
pub enum Accumulator {
    Moments(NumericMomentsAccumulator),
    Frequency(CategoricalFrequencyAccumulator),
    Distinct(DistinctCountEstimator),
    Quantile(QuantileEstimator),
    Histogram(HistogramBuilder),
}

impl Accumulator {
    /// Name of this accumulator's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Accumulator::Moments(_) => "moments",
            Accumulator::Frequency(_) => "frequency",
            Accumulator::Distinct(_) => "distinct",
            Accumulator::Quantile(_) => "quantile",
            Accumulator::Histogram(_) => "histogram",
        }
    }

    /// Feed one classified cell.
    ///
    /// Each kind takes only the values in its domain: numeric kinds consume
    /// the parsed number, the frequency kind consumes string-family text,
    /// and the distinct kind consumes any non-null cell. Everything else is
    /// skipped without error.
    pub fn update(&mut self, raw: &str, family: ValueTypeFamily, numeric: Option<f64>) {
        match self {
            Accumulator::Moments(acc) => {
                if let Some(v) = numeric {
                    acc.update(v);
                }
            }
            Accumulator::Quantile(acc) => {
                if let Some(v) = numeric {
                    acc.update(v);
                }
            }
            Accumulator::Histogram(acc) => {
                if let Some(v) = numeric {
                    acc.update(v);
                }
            }
            Accumulator::Frequency(acc) => {
                if family == ValueTypeFamily::String {
                    acc.update(raw);
                }
            }
            Accumulator::Distinct(acc) => {
                if family != ValueTypeFamily::Null {
                    acc.update(raw);
                }
            }
        }
    }

    /// Combine another accumulator of the same kind into this one.
    pub fn merge(&mut self, other: &Accumulator) -> Result<()> {
        match (self, other) {
            (Accumulator::Moments(a), Accumulator::Moments(b)) => {
                a.merge(b);
                Ok(())
            }
            (Accumulator::Frequency(a), Accumulator::Frequency(b)) => {
                a.merge(b);
                Ok(())
            }
            (Accumulator::Distinct(a), Accumulator::Distinct(b)) => a.merge(b),
            (Accumulator::Quantile(a), Accumulator::Quantile(b)) => {
                a.merge(b);
                Ok(())
            }
            (Accumulator::Histogram(a), Accumulator::Histogram(b)) => {
                a.merge(b);
                Ok(())
            }
            (a, b) => Err(AssayError::IncompatibleMerge(format!(
                "cannot merge {} accumulator with {}",
                a.kind(),
                b.kind()
            ))),
        }
    }

    /// Summarize this accumulator's state, or `None` if it never saw an
    /// applicable value.
    pub fn result(&mut self) -> Option<StatValue> {
        match self {
            Accumulator::Moments(acc) => {
                if acc.is_empty() {
                    return None;
                }
                Some(json!({
                    "count": acc.count(),
                    "min": acc.min(),
                    "max": acc.max(),
                    "mean": acc.mean(),
                    "sum": acc.sum(),
                    "variance": acc.variance(),
                    "std_dev": acc.std_dev(),
                    "skewness": acc.skewness(),
                    "kurtosis": acc.kurtosis(),
                }))
            }
            Accumulator::Frequency(acc) => {
                if acc.is_empty() {
                    return None;
                }
                Some(json!({
                    "unique_count": acc.unique_count(),
                    "top_values": acc.top_k(10),
                }))
            }
            Accumulator::Distinct(acc) => {
                if acc.is_empty() {
                    return None;
                }
                Some(json!({ "distinct_estimate": acc.estimate() }))
            }
            Accumulator::Quantile(acc) => {
                if acc.is_empty() {
                    return None;
                }
                Some(json!({
                    "median": acc.percentile(50.0),
                    "p25": acc.percentile(25.0),
                    "p75": acc.percentile(75.0),
                }))
            }
            Accumulator::Histogram(acc) => acc
                .finalize()
                .map(|h| serde_json::to_value(h).unwrap_or(StatValue::Null)),
        }
    }
}
