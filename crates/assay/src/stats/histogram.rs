//! Incremental equal-width histogram.
//!
//! Bin boundaries track the observed [min, max] range. When a new extreme
//! widens the range, existing counts are redistributed onto the new
//! boundaries by bin midpoint. Redistribution is approximate (the raw values
//! are gone), but the total count is conserved exactly, so bin counts always
//! sum to the number of accepted values.

use serde::{Deserialize, Serialize};

/// Default number of bins.
pub const DEFAULT_BIN_COUNT: usize = 20;

/// One contiguous histogram bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: u64,
}

/// Finalized histogram over a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
    pub min: f64,
    pub max: f64,
    pub bin_width: f64,
}

/// Streaming equal-width histogram accumulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramBuilder {
    bin_count: usize,
    counts: Vec<u64>,
    min: f64,
    max: f64,
    total: u64,
}

impl HistogramBuilder {
    /// Create a builder with the default bin count.
    pub fn new() -> Self {
        Self::with_bins(DEFAULT_BIN_COUNT)
    }

    /// Create a builder with `bin_count` bins.
    pub fn with_bins(bin_count: usize) -> Self {
        let bin_count = bin_count.max(1);
        Self {
            bin_count,
            counts: vec![0; bin_count],
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            total: 0,
        }
    }

    /// Record one value. Non-finite values are skipped.
    pub fn update(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }

        if self.total == 0 {
            self.min = value;
            self.max = value;
        } else if value < self.min || value > self.max {
            let new_min = self.min.min(value);
            let new_max = self.max.max(value);
            self.rebin(new_min, new_max);
        }

        let idx = self.bin_index(value);
        self.counts[idx] += 1;
        self.total += 1;
    }

    /// Combine another histogram into this one.
    ///
    /// Identical boundaries sum bin-wise (exact); otherwise both sides are
    /// rebinned onto the union range first.
    pub fn merge(&mut self, other: &Self) {
        if other.total == 0 {
            return;
        }
        if self.total == 0 {
            *self = other.clone();
            return;
        }

        if self.bin_count == other.bin_count && self.min == other.min && self.max == other.max {
            for (c, o) in self.counts.iter_mut().zip(&other.counts) {
                *c += o;
            }
            self.total += other.total;
            return;
        }

        let new_min = self.min.min(other.min);
        let new_max = self.max.max(other.max);
        self.rebin(new_min, new_max);
        for (i, &count) in other.counts.iter().enumerate() {
            if count > 0 {
                let mid = other.bin_midpoint(i);
                let idx = self.bin_index(mid);
                self.counts[idx] += count;
            }
        }
        self.total += other.total;
    }

    /// Number of values accepted.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether no values have been accepted.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Freeze into a serializable histogram. `None` if no values were seen.
    pub fn finalize(&self) -> Option<Histogram> {
        if self.total == 0 {
            return None;
        }

        if self.min == self.max {
            // Degenerate range: a single bin holds everything.
            return Some(Histogram {
                bins: vec![HistogramBin {
                    start: self.min,
                    end: self.max,
                    count: self.total,
                }],
                min: self.min,
                max: self.max,
                bin_width: 0.0,
            });
        }

        let width = self.bin_width();
        let bins = self
            .counts
            .iter()
            .enumerate()
            .map(|(i, &count)| HistogramBin {
                start: self.min + width * i as f64,
                // The last bin closes exactly at max.
                end: if i + 1 == self.bin_count {
                    self.max
                } else {
                    self.min + width * (i + 1) as f64
                },
                count,
            })
            .collect();

        Some(Histogram {
            bins,
            min: self.min,
            max: self.max,
            bin_width: width,
        })
    }

    fn bin_width(&self) -> f64 {
        if self.max > self.min {
            (self.max - self.min) / self.bin_count as f64
        } else {
            0.0
        }
    }

    fn bin_index(&self, value: f64) -> usize {
        let width = self.bin_width();
        if width == 0.0 {
            return 0;
        }
        let idx = ((value - self.min) / width).floor() as usize;
        idx.min(self.bin_count - 1)
    }

    fn bin_midpoint(&self, index: usize) -> f64 {
        let width = self.bin_width();
        if width == 0.0 {
            self.min
        } else {
            self.min + width * (index as f64 + 0.5)
        }
    }

    /// Widen to [new_min, new_max], reassigning existing counts by midpoint.
    fn rebin(&mut self, new_min: f64, new_max: f64) {
        let old_counts = std::mem::replace(&mut self.counts, vec![0; self.bin_count]);
        let old_min = self.min;
        let old_width = self.bin_width();

        self.min = new_min;
        self.max = new_max;

        for (i, count) in old_counts.into_iter().enumerate() {
            if count > 0 {
                let mid = if old_width == 0.0 {
                    old_min
                } else {
                    old_min + old_width * (i as f64 + 0.5)
                };
                let idx = self.bin_index(mid);
                self.counts[idx] += count;
            }
        }
    }
}

impl Default for HistogramBuilder {
    fn default() -> Self {
        Self::new()
    }
}
