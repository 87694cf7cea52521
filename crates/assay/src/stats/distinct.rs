//! Fixed-memory distinct-count estimation.
//!
//! A register sketch: each value hashes to one of `2^precision` registers,
//! which keeps the maximum leading-zero rank observed. Merging two sketches
//! is a register-wise max, which is exact and commutative, so distinct
//! counts over unions of datasets never require re-scanning either side.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{AssayError, Result};

/// Default register precision (2^14 registers).
pub const DEFAULT_PRECISION: u8 = 14;

/// Minimum supported precision.
pub const MIN_PRECISION: u8 = 4;

/// Maximum supported precision.
pub const MAX_PRECISION: u8 = 18;

/// Streaming cardinality estimator with `2^precision` one-byte registers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistinctCountEstimator {
    precision: u8,
    registers: Vec<u8>,
}

impl DistinctCountEstimator {
    /// Create an estimator with the default precision.
    pub fn new() -> Self {
        Self::with_precision(DEFAULT_PRECISION)
    }

    /// Create an estimator with `2^precision` registers.
    ///
    /// # Panics
    ///
    /// Panics if `precision` is outside `[MIN_PRECISION, MAX_PRECISION]`.
    /// Callers configuring the precision validate it up front.
    pub fn with_precision(precision: u8) -> Self {
        assert!(
            (MIN_PRECISION..=MAX_PRECISION).contains(&precision),
            "precision must be in [{MIN_PRECISION}, {MAX_PRECISION}], got {precision}"
        );
        Self {
            precision,
            registers: vec![0; 1 << precision],
        }
    }

    /// Record one value.
    pub fn update(&mut self, value: &str) {
        self.insert_hash(xxh3_64(value.as_bytes()));
    }

    /// Record a precomputed 64-bit hash.
    pub fn insert_hash(&mut self, hash: u64) {
        let idx = (hash >> (64 - self.precision)) as usize;
        // Sentinel bit guarantees leading_zeros is bounded by the suffix width.
        let w = (hash << self.precision) | (1u64 << (self.precision - 1));
        let rho = w.leading_zeros() as u8 + 1;
        if rho > self.registers[idx] {
            self.registers[idx] = rho;
        }
    }

    /// Register precision.
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Whether no values have been recorded.
    pub fn is_empty(&self) -> bool {
        self.registers.iter().all(|&r| r == 0)
    }

    /// Estimated number of distinct values recorded.
    ///
    /// Uses linear counting while many registers are still empty, and the
    /// harmonic-mean bias-corrected estimate otherwise.
    pub fn estimate(&self) -> u64 {
        let m = self.registers.len() as f64;

        let mut sum = 0.0;
        let mut zeros = 0u64;
        for &r in &self.registers {
            sum += 1.0 / (1u64 << r) as f64;
            if r == 0 {
                zeros += 1;
            }
        }

        let raw = self.alpha() * m * m / sum;

        let corrected = if raw <= 2.5 * m && zeros > 0 {
            m * (m / zeros as f64).ln()
        } else {
            raw
        };

        corrected.round() as u64
    }

    /// Expected relative error of the estimate.
    pub fn relative_error(&self) -> f64 {
        1.04 / (self.registers.len() as f64).sqrt()
    }

    /// Combine another sketch into this one via register-wise max.
    ///
    /// Fails without touching this sketch if the precisions differ, since
    /// registers of different widths cannot be aligned.
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        if self.precision != other.precision {
            return Err(AssayError::IncompatibleMerge(format!(
                "distinct-count sketch precision mismatch: {} vs {}",
                self.precision, other.precision
            )));
        }
        for (r, &o) in self.registers.iter_mut().zip(&other.registers) {
            if o > *r {
                *r = o;
            }
        }
        Ok(())
    }

    fn alpha(&self) -> f64 {
        let m = self.registers.len() as f64;
        match self.registers.len() {
            16 => 0.673,
            32 => 0.697,
            64 => 0.709,
            _ => 0.7213 / (1.0 + 1.079 / m),
        }
    }
}

impl Default for DistinctCountEstimator {
    fn default() -> Self {
        Self::new()
    }
}
