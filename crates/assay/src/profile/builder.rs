//! Single-pass streaming profiler over a row stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::correlate::CorrelationAccumulator;
use crate::error::{AssayError, Result};
use crate::quality::DuplicateDetector;
use crate::stats::distinct::{MAX_PRECISION, MIN_PRECISION};

use super::profiler::ColumnProfiler;
use super::result::ProfileResult;

/// Progress observer invoked at batch checkpoints.
pub type ProgressCallback = Box<dyn FnMut(u64, Option<u64>) + Send>;

/// Tunable knobs for one profiling pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Distinct sample values retained per column.
    pub max_sample_values: usize,
    /// Cap on each per-column flagged row-index list.
    pub max_flagged_rows_per_column: usize,
    /// Equal-width bins per numeric histogram.
    pub histogram_bin_count: usize,
    /// Most-frequent values reported per string column.
    pub top_k_categorical: usize,
    /// Distinct-count sketch precision, 4 to 18.
    pub distinct_sketch_precision: u8,
    /// Quantile sketch compression factor.
    pub quantile_compression: f64,
    /// Rows between progress callbacks and cancellation checks.
    pub progress_interval_rows: u64,
    pub correlation_enabled: bool,
    pub duplicate_detection_enabled: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            max_sample_values: 10,
            max_flagged_rows_per_column: 100,
            histogram_bin_count: 20,
            top_k_categorical: 10,
            distinct_sketch_precision: 14,
            quantile_compression: 100.0,
            progress_interval_rows: 1000,
            correlation_enabled: true,
            duplicate_detection_enabled: true,
        }
    }
}

impl ProfileConfig {
    /// Check that every knob is usable.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&self.distinct_sketch_precision) {
            return Err(AssayError::Config(format!(
                "distinct_sketch_precision must be {MIN_PRECISION}-{MAX_PRECISION}, got {}",
                self.distinct_sketch_precision
            )));
        }
        if self.histogram_bin_count == 0 {
            return Err(AssayError::Config(
                "histogram_bin_count must be at least 1".to_string(),
            ));
        }
        if !self.quantile_compression.is_finite() || self.quantile_compression <= 0.0 {
            return Err(AssayError::Config(format!(
                "quantile_compression must be positive, got {}",
                self.quantile_compression
            )));
        }
        if self.progress_interval_rows == 0 {
            return Err(AssayError::Config(
                "progress_interval_rows must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the per-column sample cap.
    pub fn with_max_sample_values(mut self, n: usize) -> Self {
        self.max_sample_values = n;
        self
    }

    /// Set the flagged-row cap.
    pub fn with_max_flagged_rows(mut self, n: usize) -> Self {
        self.max_flagged_rows_per_column = n;
        self
    }

    /// Set the histogram bin count.
    pub fn with_histogram_bins(mut self, n: usize) -> Self {
        self.histogram_bin_count = n;
        self
    }

    /// Set the top-K reported per string column.
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k_categorical = k;
        self
    }

    /// Set the distinct-count sketch precision.
    pub fn with_distinct_precision(mut self, precision: u8) -> Self {
        self.distinct_sketch_precision = precision;
        self
    }

    /// Enable or disable the correlation pass.
    pub fn with_correlation(mut self, enabled: bool) -> Self {
        self.correlation_enabled = enabled;
        self
    }

    /// Enable or disable duplicate-row detection.
    pub fn with_duplicate_detection(mut self, enabled: bool) -> Self {
        self.duplicate_detection_enabled = enabled;
        self
    }
}

/// Drives one streaming profiling pass.
///
/// Rows arrive through [`feed_row`](FileProfileBuilder::feed_row); at stream
/// end, [`finish`](FileProfileBuilder::finish) freezes every accumulator
/// into a [`ProfileResult`]. Cancellation is cooperative: the flag is
/// checked once per progress interval, and a cancelled scan discards its
/// state rather than emit a partial result.
pub struct FileProfileBuilder {
    config: ProfileConfig,
    profilers: Vec<ColumnProfiler>,
    correlation: Option<CorrelationAccumulator>,
    duplicates: Option<DuplicateDetector>,
    row_values: Vec<Option<f64>>,
    rows: u64,
    total_rows_hint: Option<u64>,
    cancel: Arc<AtomicBool>,
    progress: Option<ProgressCallback>,
    started: Instant,
}

impl std::fmt::Debug for FileProfileBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileProfileBuilder")
            .field("config", &self.config)
            .field("profilers", &self.profilers)
            .field("correlation", &self.correlation)
            .field("duplicates", &self.duplicates)
            .field("row_values", &self.row_values)
            .field("rows", &self.rows)
            .field("total_rows_hint", &self.total_rows_hint)
            .field("cancel", &self.cancel)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .field("started", &self.started)
            .finish()
    }
}

impl FileProfileBuilder {
    /// Create a builder over the named columns.
    pub fn new(column_names: Vec<String>, config: ProfileConfig) -> Result<Self> {
        config.validate()?;
        if column_names.is_empty() {
            return Err(AssayError::EmptyInput(
                "cannot profile a file with no columns".to_string(),
            ));
        }

        debug!(
            columns = column_names.len(),
            correlation = config.correlation_enabled,
            "starting profile scan"
        );

        let column_count = column_names.len();
        let profilers = column_names
            .iter()
            .map(|name| ColumnProfiler::new(name.clone(), &config))
            .collect();
        let correlation = if config.correlation_enabled && column_count > 1 {
            Some(CorrelationAccumulator::new(column_names))
        } else {
            None
        };
        let duplicates = config
            .duplicate_detection_enabled
            .then(DuplicateDetector::new);

        Ok(Self {
            config,
            profilers,
            correlation,
            duplicates,
            row_values: vec![None; column_count],
            rows: 0,
            total_rows_hint: None,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
            started: Instant::now(),
        })
    }

    /// Tell the progress callback how many rows to expect, if known.
    pub fn with_total_rows_hint(mut self, hint: u64) -> Self {
        self.total_rows_hint = Some(hint);
        self
    }

    /// Register a progress observer.
    pub fn on_progress(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    /// Flag the host can set from another context to stop the scan.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Rows fed so far.
    pub fn rows_processed(&self) -> u64 {
        self.rows
    }

    /// Feed one row of raw cells.
    ///
    /// A row shorter than the column list counts missing for the absent
    /// cells; surplus cells on a longer row are ignored. Returns
    /// [`AssayError::Cancelled`] from the first checkpoint after the cancel
    /// flag is set.
    pub fn feed_row(&mut self, cells: &[&str]) -> Result<()> {
        let row = self.rows as usize;

        for (i, profiler) in self.profilers.iter_mut().enumerate() {
            let numeric = match cells.get(i) {
                Some(cell) => profiler.update(cell, row),
                None => {
                    profiler.record_missing(row);
                    None
                }
            };
            self.row_values[i] = numeric;
        }

        if let Some(correlation) = &mut self.correlation {
            correlation.update_row(&self.row_values);
        }
        if let Some(duplicates) = &mut self.duplicates {
            duplicates.record(cells);
        }

        self.rows += 1;
        if self.rows % self.config.progress_interval_rows == 0 {
            self.checkpoint()?;
        }
        Ok(())
    }

    /// Feed one row of owned cells.
    pub fn feed_row_owned(&mut self, cells: Vec<String>) -> Result<()> {
        let refs: Vec<&str> = cells.iter().map(String::as_str).collect();
        self.feed_row(&refs)
    }

    fn checkpoint(&mut self) -> Result<()> {
        trace!(rows = self.rows, "progress checkpoint");
        if let Some(callback) = &mut self.progress {
            callback(self.rows, self.total_rows_hint);
        }
        if self.cancel.load(Ordering::Relaxed) {
            debug!(rows = self.rows, "scan cancelled");
            return Err(AssayError::Cancelled {
                rows_processed: self.rows as usize,
            });
        }
        Ok(())
    }

    /// Finalize the scan into an immutable result.
    ///
    /// Consumes the builder; a cancelled scan returns
    /// [`AssayError::Cancelled`] and all accumulated state is dropped.
    pub fn finish(mut self) -> Result<ProfileResult> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(AssayError::Cancelled {
                rows_processed: self.rows as usize,
            });
        }
        if let Some(callback) = &mut self.progress {
            callback(self.rows, self.total_rows_hint);
        }

        let column_profiles: Vec<_> = self
            .profilers
            .into_iter()
            .map(ColumnProfiler::finalize)
            .collect();

        let correlation_matrix = self.correlation.as_ref().and_then(|acc| {
            let numeric: Vec<String> = column_profiles
                .iter()
                .filter(|c| c.base_stats.inferred_type.is_numeric())
                .map(|c| c.name.clone())
                .collect();
            acc.matrix(&numeric)
        });
        let duplicate_issues = self
            .duplicates
            .map(|d| d.finalize())
            .unwrap_or_default();

        debug!(
            rows = self.rows,
            columns = column_profiles.len(),
            duplicates = duplicate_issues.len(),
            "profile scan finished"
        );

        Ok(ProfileResult {
            column_profiles,
            total_rows: self.rows,
            generated_at: Utc::now(),
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            correlation_matrix,
            duplicate_issues,
            correlation_state: self.correlation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::InferredType;
    use std::sync::atomic::Ordering;

    fn builder(columns: &[&str]) -> FileProfileBuilder {
        FileProfileBuilder::new(
            columns.iter().map(|s| s.to_string()).collect(),
            ProfileConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_basic_profile() {
        let mut b = builder(&["id", "name", "score"]);
        b.feed_row(&["1", "alice", "9.5"]).unwrap();
        b.feed_row(&["2", "bob", "8.0"]).unwrap();
        b.feed_row(&["3", "carol", ""]).unwrap();
        let result = b.finish().unwrap();

        assert_eq!(result.total_rows, 3);
        assert_eq!(result.column_profiles.len(), 3);
        let id = result.column("id").unwrap();
        assert_eq!(id.base_stats.inferred_type, InferredType::Integer);
        let score = result.column("score").unwrap();
        assert_eq!(score.base_stats.missing, 1);
    }

    #[test]
    fn test_short_and_long_rows() {
        let mut b = builder(&["a", "b"]);
        b.feed_row(&["1"]).unwrap();
        b.feed_row(&["2", "x", "surplus"]).unwrap();
        let result = b.finish().unwrap();
        assert_eq!(result.column("b").unwrap().base_stats.missing, 1);
        assert_eq!(result.column("a").unwrap().base_stats.count, 2);
    }

    #[test]
    fn test_no_columns_rejected() {
        let err = FileProfileBuilder::new(Vec::new(), ProfileConfig::default()).unwrap_err();
        assert!(matches!(err, AssayError::EmptyInput(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ProfileConfig::default().with_distinct_precision(3);
        assert!(FileProfileBuilder::new(vec!["a".to_string()], config).is_err());
    }

    #[test]
    fn test_correlation_matrix_emitted() {
        let mut b = builder(&["x", "y", "label"]);
        for i in 0..50 {
            let x = i.to_string();
            let y = (i * 2).to_string();
            b.feed_row(&[&x, &y, "text"]).unwrap();
        }
        let result = b.finish().unwrap();
        let matrix = result.correlation_matrix.unwrap();
        assert_eq!(matrix.columns, vec!["x".to_string(), "y".to_string()]);
        assert!((matrix.get("x", "y").unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_correlation_disabled() {
        let config = ProfileConfig::default().with_correlation(false);
        let mut b = FileProfileBuilder::new(
            vec!["x".to_string(), "y".to_string()],
            config,
        )
        .unwrap();
        b.feed_row(&["1", "2"]).unwrap();
        let result = b.finish().unwrap();
        assert!(result.correlation_matrix.is_none());
        assert!(result.correlation_state.is_none());
    }

    #[test]
    fn test_duplicate_rows_reported() {
        let mut b = builder(&["a", "b"]);
        for _ in 0..30 {
            b.feed_row(&["same", "row"]).unwrap();
        }
        for i in 0..10 {
            let v = i.to_string();
            b.feed_row(&[&v, "unique"]).unwrap();
        }
        let result = b.finish().unwrap();
        assert_eq!(result.duplicate_issues.len(), 1);
    }

    #[test]
    fn test_cancellation_discards_scan() {
        let mut b = builder(&["v"]);
        let token = b.cancel_token();
        for i in 0..999 {
            let v = i.to_string();
            b.feed_row(&[&v]).unwrap();
        }
        token.store(true, Ordering::Relaxed);
        // Row 1000 hits the checkpoint and observes the flag.
        let err = b.feed_row(&["999"]).unwrap_err();
        assert!(matches!(err, AssayError::Cancelled { rows_processed: 1000 }));
    }

    #[test]
    fn test_cancel_before_finish() {
        let mut b = builder(&["v"]);
        b.feed_row(&["1"]).unwrap();
        b.cancel_token().store(true, Ordering::Relaxed);
        assert!(matches!(
            b.finish().unwrap_err(),
            AssayError::Cancelled { .. }
        ));
    }

    #[test]
    fn test_progress_callback_fires() {
        use std::sync::atomic::AtomicU64;

        let last_reported = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&last_reported);
        let mut b = builder(&["v"]);
        b.on_progress(Box::new(move |rows, _hint| {
            seen.store(rows, Ordering::Relaxed);
        }));
        for i in 0..2500 {
            let v = i.to_string();
            b.feed_row(&[&v]).unwrap();
        }
        let result = b.finish().unwrap();
        assert_eq!(result.total_rows, 2500);
        // Final callback at finish reports the full row count.
        assert_eq!(last_reported.load(Ordering::Relaxed), 2500);
    }

    #[test]
    fn test_result_round_trips_through_json() {
        let mut b = builder(&["id", "city"]);
        b.feed_row(&["1", "lisbon"]).unwrap();
        b.feed_row(&["2", "porto"]).unwrap();
        let result = b.finish().unwrap();
        let json = result.to_json().unwrap();
        let restored = ProfileResult::from_json(&json).unwrap();
        assert_eq!(restored.total_rows, 2);
        assert_eq!(
            restored.column("city").unwrap().base_stats.inferred_type,
            InferredType::String
        );
    }
}
