//! Bounded categorical frequency tracking.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default cap on distinct values tracked exactly.
pub const DEFAULT_MAX_TRACKED: usize = 1000;

/// One entry of a column's top-K value list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopValue {
    pub value: String,
    pub count: u64,
    pub percentage: f64,
}

/// Streaming frequency accumulator for string-family values.
///
/// Tracks exact counts for up to `max_tracked` distinct values in first-seen
/// order; values beyond the cap are tallied but not individually tracked, and
/// the result is marked truncated. Also records min/max observed string
/// length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalFrequencyAccumulator {
    values: IndexMap<String, u64>,
    max_tracked: usize,
    /// Values seen after the tracking cap was hit.
    untracked: u64,
    total: u64,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl CategoricalFrequencyAccumulator {
    /// Create an accumulator with the default tracking cap.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_TRACKED)
    }

    /// Create an accumulator tracking at most `max_tracked` distinct values.
    pub fn with_capacity(max_tracked: usize) -> Self {
        Self {
            values: IndexMap::new(),
            max_tracked,
            untracked: 0,
            total: 0,
            min_length: None,
            max_length: None,
        }
    }

    /// Record one value.
    pub fn update(&mut self, value: &str) {
        self.total += 1;

        let len = value.chars().count();
        self.min_length = Some(self.min_length.map_or(len, |m| m.min(len)));
        self.max_length = Some(self.max_length.map_or(len, |m| m.max(len)));

        if let Some(count) = self.values.get_mut(value) {
            *count += 1;
        } else if self.values.len() < self.max_tracked {
            self.values.insert(value.to_string(), 1);
        } else {
            self.untracked += 1;
        }
    }

    /// Combine another accumulator into this one.
    ///
    /// The other's values keep their counts where tracked; values that do not
    /// fit under this accumulator's cap fall into the untracked tally.
    pub fn merge(&mut self, other: &Self) {
        for (value, &count) in &other.values {
            if let Some(existing) = self.values.get_mut(value) {
                *existing += count;
            } else if self.values.len() < self.max_tracked {
                self.values.insert(value.clone(), count);
            } else {
                self.untracked += count;
            }
        }
        self.untracked += other.untracked;
        self.total += other.total;
        self.min_length = merge_bound(self.min_length, other.min_length, usize::min);
        self.max_length = merge_bound(self.max_length, other.max_length, usize::max);
    }

    /// Total values recorded.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether no values have been recorded.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of distinct tracked values.
    pub fn unique_count(&self) -> u64 {
        self.values.len() as u64
    }

    /// Whether the distinct-value cap was exceeded.
    pub fn is_truncated(&self) -> bool {
        self.untracked > 0
    }

    /// Shortest observed value length.
    pub fn min_length(&self) -> Option<usize> {
        self.min_length
    }

    /// Longest observed value length.
    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    /// The `k` most frequent values, descending by count, ties in first-seen
    /// order. Percentages are relative to the total recorded values.
    pub fn top_k(&self, k: usize) -> Vec<TopValue> {
        let mut entries: Vec<(&String, u64)> =
            self.values.iter().map(|(v, &c)| (v, c)).collect();
        // Stable sort keeps first-seen order among equal counts.
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
            .into_iter()
            .take(k)
            .map(|(value, count)| TopValue {
                value: value.clone(),
                count,
                percentage: if self.total > 0 {
                    count as f64 / self.total as f64 * 100.0
                } else {
                    0.0
                },
            })
            .collect()
    }
}

impl Default for CategoricalFrequencyAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_bound(
    a: Option<usize>,
    b: Option<usize>,
    pick: fn(usize, usize) -> usize,
) -> Option<usize> {
    match (a, b) {
        (Some(x), Some(y)) => Some(pick(x, y)),
        (x, None) => x,
        (None, y) => y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_k_ordering_and_ties() {
        let mut acc = CategoricalFrequencyAccumulator::new();
        for v in ["b", "a", "b", "c", "a", "b"] {
            acc.update(v);
        }
        // a and c never tie; b=3, a=2, c=1.
        let top = acc.top_k(10);
        assert_eq!(top[0].value, "b");
        assert_eq!(top[0].count, 3);
        assert!((top[0].percentage - 50.0).abs() < 1e-9);
        assert_eq!(top[1].value, "a");
        assert_eq!(top[2].value, "c");
    }

    #[test]
    fn test_tie_break_is_first_seen() {
        let mut acc = CategoricalFrequencyAccumulator::new();
        for v in ["x", "y", "z"] {
            acc.update(v);
        }
        let top = acc.top_k(3);
        assert_eq!(top[0].value, "x");
        assert_eq!(top[1].value, "y");
        assert_eq!(top[2].value, "z");
    }

    #[test]
    fn test_percentages_bounded() {
        let mut acc = CategoricalFrequencyAccumulator::new();
        for i in 0..50 {
            acc.update(&format!("v{}", i % 7));
        }
        let total: f64 = acc.top_k(10).iter().map(|t| t.percentage).sum();
        assert!(total <= 100.0 + 1e-9);
    }

    #[test]
    fn test_tracking_cap() {
        let mut acc = CategoricalFrequencyAccumulator::with_capacity(3);
        for v in ["a", "b", "c", "d", "e", "a"] {
            acc.update(v);
        }
        assert_eq!(acc.unique_count(), 3);
        assert!(acc.is_truncated());
        assert_eq!(acc.total(), 6);
    }

    #[test]
    fn test_string_lengths() {
        let mut acc = CategoricalFrequencyAccumulator::new();
        acc.update("ab");
        acc.update("abcdef");
        acc.update("abc");
        assert_eq!(acc.min_length(), Some(2));
        assert_eq!(acc.max_length(), Some(6));
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let mut a = CategoricalFrequencyAccumulator::new();
        let mut b = CategoricalFrequencyAccumulator::new();
        let mut whole = CategoricalFrequencyAccumulator::new();
        for (i, v) in ["x", "y", "x", "z", "y", "x"].iter().enumerate() {
            if i < 3 {
                a.update(v);
            } else {
                b.update(v);
            }
            whole.update(v);
        }
        a.merge(&b);
        assert_eq!(a.total(), whole.total());
        assert_eq!(a.top_k(10), whole.top_k(10));
    }
}
