//! Streaming per-column profiler.
//!
//! One `ColumnProfiler` owns everything a single column accumulates during a
//! scan: family tallies, the statistic accumulators, retained samples, PII
//! scanning, and a reservoir of numeric values for outlier flagging. Cells
//! arrive one at a time through [`ColumnProfiler::update`]; nothing about a
//! column is decided until [`ColumnProfiler::finalize`].

use crate::quality::PiiTracker;
use crate::stats::{
    Accumulator, CategoricalFrequencyAccumulator, DistinctCountEstimator, HistogramBuilder,
    NumericMomentsAccumulator, QuantileEstimator,
};
use crate::value::{ValueClassifier, ValueTypeFamily};

use super::builder::ProfileConfig;
use super::column::{ColumnProfile, FamilyCounts, FlaggedRows, MergeState};

/// Numeric values retained for outlier flagging.
const RESERVOIR_CAPACITY: usize = 10_000;

/// Distance from the mean, in standard deviations, beyond which a value is
/// flagged as an outlier.
const OUTLIER_SIGMA: f64 = 3.0;

/// Uniform sample of numeric values with their row indices.
///
/// Algorithm R: once full, each subsequent value replaces a random slot with
/// probability capacity/seen, so every value ever recorded is equally likely
/// to be present at the end.
#[derive(Debug, Clone)]
struct NumericReservoir {
    capacity: usize,
    entries: Vec<(f64, usize)>,
    seen: u64,
}

impl NumericReservoir {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
            seen: 0,
        }
    }

    fn record(&mut self, value: f64, row: usize) {
        self.seen += 1;
        if self.entries.len() < self.capacity {
            self.entries.push((value, row));
        } else {
            let slot = fastrand::u64(0..self.seen) as usize;
            if slot < self.capacity {
                self.entries[slot] = (value, row);
            }
        }
    }
}

/// Accumulates one column's profile as rows stream by.
#[derive(Debug, Clone)]
pub struct ColumnProfiler {
    name: String,
    classifier: ValueClassifier,
    families: FamilyCounts,
    accumulators: Vec<Accumulator>,
    pii: PiiTracker,
    samples: Vec<String>,
    max_samples: usize,
    missing_rows: Vec<usize>,
    pii_rows: Vec<usize>,
    max_flagged: usize,
    reservoir: NumericReservoir,
    top_k: usize,
}

impl ColumnProfiler {
    /// Create a profiler for the named column.
    pub fn new(name: impl Into<String>, config: &ProfileConfig) -> Self {
        // Every column carries the full accumulator set; each one ignores
        // values outside its domain. Uniform sets keep merge pairing trivial.
        let accumulators = vec![
            Accumulator::Moments(NumericMomentsAccumulator::new()),
            Accumulator::Quantile(QuantileEstimator::with_compression(
                config.quantile_compression,
            )),
            Accumulator::Histogram(HistogramBuilder::with_bins(config.histogram_bin_count)),
            Accumulator::Frequency(CategoricalFrequencyAccumulator::new()),
            Accumulator::Distinct(DistinctCountEstimator::with_precision(
                config.distinct_sketch_precision,
            )),
        ];
        Self {
            name: name.into(),
            classifier: ValueClassifier::new(),
            families: FamilyCounts::default(),
            accumulators,
            pii: PiiTracker::new(),
            samples: Vec::new(),
            max_samples: config.max_sample_values,
            missing_rows: Vec::new(),
            pii_rows: Vec::new(),
            max_flagged: config.max_flagged_rows_per_column,
            reservoir: NumericReservoir::new(RESERVOIR_CAPACITY),
            top_k: config.top_k_categorical,
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Feed one cell, identified by its zero-based row index.
    ///
    /// Returns the parsed numeric value when the cell is numeric, so the
    /// caller can reuse the parse for cross-column work instead of parsing
    /// the cell twice.
    pub fn update(&mut self, raw: &str, row: usize) -> Option<f64> {
        let trimmed = raw.trim();
        let family = self.classifier.classify(trimmed);
        self.families.tally(family);

        if family == ValueTypeFamily::Null {
            if self.missing_rows.len() < self.max_flagged {
                self.missing_rows.push(row);
            }
            return None;
        }

        let numeric = if family.is_numeric() {
            self.classifier.parse_numeric(trimmed)
        } else {
            None
        };

        for acc in &mut self.accumulators {
            acc.update(trimmed, family, numeric);
        }

        if let Some(v) = numeric {
            self.reservoir.record(v, row);
        }

        if family == ValueTypeFamily::String
            && self.pii.record(trimmed)
            && self.pii_rows.len() < self.max_flagged
        {
            self.pii_rows.push(row);
        }

        if self.samples.len() < self.max_samples && !self.samples.iter().any(|s| s == trimmed) {
            self.samples.push(trimmed.to_string());
        }

        numeric
    }

    /// Record a cell that is absent entirely, as in a short row.
    pub fn record_missing(&mut self, row: usize) {
        self.families.tally(ValueTypeFamily::Null);
        if self.missing_rows.len() < self.max_flagged {
            self.missing_rows.push(row);
        }
    }

    /// Cells observed so far, including missing ones.
    pub fn count(&self) -> u64 {
        self.families.total()
    }

    /// Close out the column and assemble its profile.
    pub fn finalize(self) -> ColumnProfile {
        let (outlier_rows, outlier_count) = flag_outliers(
            &self.accumulators,
            &self.reservoir,
            self.families.numeric_pool(),
            self.max_flagged,
        );

        let state = MergeState {
            families: self.families,
            accumulators: self.accumulators,
            outlier_count,
            pii: self.pii,
        };
        let flagged = FlaggedRows {
            missing: self.missing_rows,
            outliers: outlier_rows,
            pii: self.pii_rows,
        };
        ColumnProfile::from_state(self.name, state, self.samples, flagged, self.top_k)
    }
}

/// Flag reservoir values further than `OUTLIER_SIGMA` deviations from the
/// column mean.
///
/// The reservoir is a uniform sample, so the population outlier count is the
/// sample rate scaled up to the full numeric count.
fn flag_outliers(
    accumulators: &[Accumulator],
    reservoir: &NumericReservoir,
    numeric_count: u64,
    max_flagged: usize,
) -> (Vec<usize>, u64) {
    let moments = accumulators.iter().find_map(|acc| match acc {
        Accumulator::Moments(m) if !m.is_empty() => Some(m),
        _ => None,
    });
    let Some(moments) = moments else {
        return (Vec::new(), 0);
    };
    let std_dev = moments.std_dev();
    if std_dev <= 0.0 || reservoir.entries.is_empty() {
        return (Vec::new(), 0);
    }
    let mean = moments.mean().unwrap_or(0.0);

    let mut rows: Vec<usize> = reservoir
        .entries
        .iter()
        .filter(|(v, _)| (v - mean).abs() > OUTLIER_SIGMA * std_dev)
        .map(|&(_, row)| row)
        .collect();
    let sampled = rows.len() as u64;
    rows.sort_unstable();
    rows.truncate(max_flagged);

    let estimate = if reservoir.seen > reservoir.entries.len() as u64 {
        let rate = sampled as f64 / reservoir.entries.len() as f64;
        (rate * numeric_count as f64).round() as u64
    } else {
        sampled
    };
    (rows, estimate)
}
