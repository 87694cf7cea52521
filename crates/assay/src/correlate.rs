//! Streaming pairwise Pearson correlation.
//!
//! Correlation is accumulated over every column pair while rows stream by,
//! because which columns end up inferred numeric is only known at the end of
//! the scan. A pair contributes to its tallies only on rows where both cells
//! parsed as numbers, so missing or malformed cells shrink that pair's `n`
//! rather than poisoning the sums. The matrix itself is assembled on demand
//! for whichever columns finalize as numeric.

use serde::{Deserialize, Serialize};

use crate::error::{AssayError, Result};

/// Running sums for one column pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct PairState {
    n: u64,
    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_yy: f64,
    sum_xy: f64,
}

impl PairState {
    fn update(&mut self, x: f64, y: f64) {
        self.n += 1;
        self.sum_x += x;
        self.sum_y += y;
        self.sum_xx += x * x;
        self.sum_yy += y * y;
        self.sum_xy += x * y;
    }

    fn merge(&mut self, other: &Self) {
        self.n += other.n;
        self.sum_x += other.sum_x;
        self.sum_y += other.sum_y;
        self.sum_xx += other.sum_xx;
        self.sum_yy += other.sum_yy;
        self.sum_xy += other.sum_xy;
    }

    /// Pearson coefficient, clamped to [-1, 1].
    ///
    /// Pairs with fewer than two joint observations, or where either column
    /// is constant over the joint rows, have no defined correlation and
    /// report 0.0.
    fn correlation(&self) -> f64 {
        if self.n < 2 {
            return 0.0;
        }
        let n = self.n as f64;
        let cov = n * self.sum_xy - self.sum_x * self.sum_y;
        let var_x = n * self.sum_xx - self.sum_x * self.sum_x;
        let var_y = n * self.sum_yy - self.sum_y * self.sum_y;
        if var_x <= 0.0 || var_y <= 0.0 {
            return 0.0;
        }
        (cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0)
    }
}

/// Pearson correlation matrix over the numeric columns of a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// Column names, in profile order.
    pub columns: Vec<String>,
    /// Row-major coefficients; `values[i][j]` correlates `columns[i]` with
    /// `columns[j]`. Symmetric with a unit diagonal.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Look up the coefficient for a pair of columns by name.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

/// Accumulates pairwise sums for every column pair of one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationAccumulator {
    columns: Vec<String>,
    /// Upper triangle, row-major: pair (i, j) with i < j lives at
    /// `i * (2n - i - 1) / 2 + (j - i - 1)`.
    pairs: Vec<PairState>,
}

impl CorrelationAccumulator {
    /// Create an accumulator over the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        let n = columns.len();
        Self {
            columns,
            pairs: vec![PairState::default(); n * n.saturating_sub(1) / 2],
        }
    }

    /// Columns this accumulator covers.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn pair_index(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < j && j < self.columns.len());
        let n = self.columns.len();
        i * (2 * n - i - 1) / 2 + (j - i - 1)
    }

    /// Feed one row of parsed cells, `None` where a cell was not numeric.
    ///
    /// `values` must be in column order and the same length as the column
    /// list; extra positions are ignored and short rows contribute only the
    /// pairs they cover.
    pub fn update_row(&mut self, values: &[Option<f64>]) {
        let n = self.columns.len().min(values.len());
        for i in 0..n {
            let Some(x) = values[i] else { continue };
            for j in (i + 1)..n {
                let Some(y) = values[j] else { continue };
                let idx = self.pair_index(i, j);
                self.pairs[idx].update(x, y);
            }
        }
    }

    /// Combine another accumulator covering the identical column list.
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        if self.columns != other.columns {
            return Err(AssayError::IncompatibleMerge(
                "correlation accumulators cover different column sets".to_string(),
            ));
        }
        for (mine, theirs) in self.pairs.iter_mut().zip(&other.pairs) {
            mine.merge(theirs);
        }
        Ok(())
    }

    /// Assemble the matrix restricted to the named columns.
    ///
    /// `numeric_columns` selects which columns appear, in the order given;
    /// names not covered by this accumulator are skipped. Returns `None`
    /// when fewer than two columns remain.
    pub fn matrix(&self, numeric_columns: &[String]) -> Option<CorrelationMatrix> {
        let indices: Vec<(usize, &String)> = numeric_columns
            .iter()
            .filter_map(|name| {
                self.columns
                    .iter()
                    .position(|c| c == name)
                    .map(|idx| (idx, name))
            })
            .collect();
        if indices.len() < 2 {
            return None;
        }

        let size = indices.len();
        let mut values = vec![vec![0.0; size]; size];
        for (row, &(i, _)) in indices.iter().enumerate() {
            values[row][row] = 1.0;
            for (col, &(j, _)) in indices.iter().enumerate().skip(row + 1) {
                let (lo, hi) = if i < j { (i, j) } else { (j, i) };
                let r = self.pairs[self.pair_index(lo, hi)].correlation();
                values[row][col] = r;
                values[col][row] = r;
            }
        }

        Some(CorrelationMatrix {
            columns: indices.into_iter().map(|(_, name)| name.clone()).collect(),
            values,
        })
    }
}
