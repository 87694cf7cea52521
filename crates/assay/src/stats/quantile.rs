//! Streaming quantile estimation over weighted centroids.
//!
//! Incoming values buffer as unit-weight centroids; once the buffer fills,
//! the centroid list is recompressed under an arcsin scale function that
//! keeps more resolution near the tails than the middle. Quantile queries
//! interpolate between centroid midpoints, anchored at the exact observed
//! min and max, so the extremes are never approximated away.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Default compression factor (bounds the centroid count).
pub const DEFAULT_COMPRESSION: f64 = 100.0;

/// One weighted centroid.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Centroid {
    mean: f64,
    weight: f64,
}

impl Centroid {
    /// Fold another centroid into this one, weight-averaging the mean.
    fn add(&mut self, other: &Centroid) {
        let total = self.weight + other.weight;
        self.mean = (self.mean * self.weight + other.mean * other.weight) / total;
        self.weight = total;
    }
}

/// Streaming rank sketch supporting percentile queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantileEstimator {
    compression: f64,
    centroids: Vec<Centroid>,
    buffer: Vec<f64>,
    count: f64,
    min: f64,
    max: f64,
}

impl QuantileEstimator {
    /// Create an estimator with the default compression.
    pub fn new() -> Self {
        Self::with_compression(DEFAULT_COMPRESSION)
    }

    /// Create an estimator with a given compression factor.
    pub fn with_compression(compression: f64) -> Self {
        let compression = compression.max(20.0);
        Self {
            compression,
            centroids: Vec::new(),
            buffer: Vec::with_capacity(Self::buffer_capacity(compression)),
            count: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn buffer_capacity(compression: f64) -> usize {
        (compression * 2.0) as usize
    }

    /// Record one value. Non-finite values are skipped.
    pub fn update(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.buffer.push(value);
        self.count += 1.0;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
        if self.buffer.len() >= Self::buffer_capacity(self.compression) {
            self.compress();
        }
    }

    /// Combine another estimator into this one: concatenate centroid lists
    /// and recompress. Keeps this estimator's compression factor.
    pub fn merge(&mut self, other: &Self) {
        if other.count == 0.0 {
            return;
        }
        self.centroids.extend(other.centroids.iter().cloned());
        self.buffer.extend_from_slice(&other.buffer);
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.compress();
    }

    /// Number of values recorded.
    pub fn count(&self) -> u64 {
        self.count as u64
    }

    /// Whether no values have been recorded.
    pub fn is_empty(&self) -> bool {
        self.count == 0.0
    }

    /// Estimate the value at percentile `p` in [0, 100].
    ///
    /// Returns `None` when no values have been recorded. Monotonically
    /// non-decreasing in `p`, exact at p=0 and p=100.
    pub fn percentile(&mut self, p: f64) -> Option<f64> {
        if self.count == 0.0 {
            return None;
        }
        self.compress();
        Some(self.quantile(p / 100.0))
    }

    /// Estimate the value at quantile `q` in [0, 1] over compressed state.
    fn quantile(&self, q: f64) -> f64 {
        let q = q.clamp(0.0, 1.0);
        if q == 0.0 {
            return self.min;
        }
        if q == 1.0 {
            return self.max;
        }

        let target = q * self.count;

        let mut cum = 0.0;
        let mut prev_pos = 0.0;
        let mut prev_mean = self.min;
        for c in &self.centroids {
            let pos = cum + c.weight / 2.0;
            if target < pos {
                return interpolate(prev_pos, prev_mean, pos, c.mean, target);
            }
            prev_pos = pos;
            prev_mean = c.mean;
            cum += c.weight;
        }
        interpolate(prev_pos, prev_mean, self.count, self.max, target)
    }

    /// Fold the buffer into the centroid list and re-merge adjacent
    /// centroids under the scale-function size bound.
    fn compress(&mut self) {
        for value in self.buffer.drain(..) {
            self.centroids.push(Centroid {
                mean: value,
                weight: 1.0,
            });
        }
        if self.centroids.len() <= 1 {
            return;
        }

        self.centroids
            .sort_by(|a, b| a.mean.partial_cmp(&b.mean).unwrap_or(Ordering::Equal));

        let total: f64 = self.centroids.iter().map(|c| c.weight).sum();
        let mut merged: Vec<Centroid> = Vec::with_capacity(self.centroids.len());
        let mut current = self.centroids[0].clone();
        let mut weight_so_far = 0.0;

        for c in &self.centroids[1..] {
            let q0 = weight_so_far / total;
            let q1 = (weight_so_far + current.weight + c.weight) / total;
            if self.k_scale(q1) - self.k_scale(q0) <= 1.0 {
                current.add(c);
            } else {
                weight_so_far += current.weight;
                merged.push(current);
                current = c.clone();
            }
        }
        merged.push(current);
        self.centroids = merged;
    }

    /// Arcsin scale function: steep near q=0 and q=1, flat in the middle, so
    /// tail centroids stay small.
    fn k_scale(&self, q: f64) -> f64 {
        self.compression * ((2.0 * q - 1.0).asin() / std::f64::consts::PI + 0.5)
    }
}

impl Default for QuantileEstimator {
    fn default() -> Self {
        Self::new()
    }
}

fn interpolate(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    if x1 <= x0 {
        return y1;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}
