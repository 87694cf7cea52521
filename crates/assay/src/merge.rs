//! Merging finished profiles of disjoint row sets.
//!
//! Merging operates on the accumulator state each profile carries, so the
//! combined profile is exact for additive statistics and within sketch
//! error for the probabilistic ones. Row-index flag lists are dropped in
//! the merged output because indices are only meaningful within the file
//! that produced them.

use chrono::Utc;
use indexmap::IndexMap;
use tracing::debug;

use crate::error::{AssayError, Result};
use crate::profile::column::{ColumnProfile, FlaggedRows, MergeState};
use crate::profile::{ProfileConfig, ProfileResult};
use crate::quality::QualityNote;

/// Combine profiles of disjoint row sets of the same logical dataset.
///
/// Columns present in every input merge their accumulator state directly.
/// Columns present in only some inputs keep statistics over the inputs that
/// had them, with `count` reflecting those inputs alone, and carry a note
/// documenting the partial coverage. Structurally incompatible state for
/// the same column is an [`AssayError::IncompatibleMerge`].
pub fn merge_profiles(results: &[ProfileResult]) -> Result<ProfileResult> {
    match results {
        [] => Err(AssayError::EmptyInput(
            "cannot merge zero profiles".to_string(),
        )),
        [single] => Ok(single.clone()),
        _ => merge_many(results),
    }
}

fn merge_many(results: &[ProfileResult]) -> Result<ProfileResult> {
    debug!(inputs = results.len(), "merging profiles");
    let started = std::time::Instant::now();
    let config = ProfileConfig::default();

    // Union of columns, in first-seen order across inputs.
    let mut merged: IndexMap<&str, (MergeState, Vec<String>, usize)> = IndexMap::new();
    for result in results {
        for column in &result.column_profiles {
            match merged.get_mut(column.name.as_str()) {
                Some((state, samples, coverage)) => {
                    state.merge(&column.merge_state).map_err(|e| {
                        AssayError::IncompatibleMerge(format!(
                            "column '{}': {e}",
                            column.name
                        ))
                    })?;
                    for sample in &column.sample_values {
                        if samples.len() >= config.max_sample_values {
                            break;
                        }
                        if !samples.contains(sample) {
                            samples.push(sample.clone());
                        }
                    }
                    *coverage += 1;
                }
                None => {
                    merged.insert(
                        column.name.as_str(),
                        (
                            column.merge_state.clone(),
                            column.sample_values.clone(),
                            1,
                        ),
                    );
                }
            }
        }
    }

    let mut column_profiles = Vec::with_capacity(merged.len());
    for (name, (state, samples, coverage)) in merged {
        let mut profile = ColumnProfile::from_state(
            name.to_string(),
            state,
            samples,
            FlaggedRows::default(),
            config.top_k_categorical,
        );
        if coverage < results.len() {
            profile.notes.push(QualityNote::info(format!(
                "Column present in {coverage} of {} merged profiles; statistics cover \
                 only those inputs",
                results.len()
            )));
        }
        column_profiles.push(profile);
    }

    let correlation_state = merge_correlation_state(results)?;
    let correlation_matrix = correlation_state.as_ref().and_then(|acc| {
        let numeric: Vec<String> = column_profiles
            .iter()
            .filter(|c| c.base_stats.inferred_type.is_numeric())
            .map(|c| c.name.clone())
            .collect();
        acc.matrix(&numeric)
    });

    // Duplicate issues are observations about individual input files; the
    // hashes behind them are not carried, so they concatenate rather than
    // re-derive.
    let duplicate_issues = results
        .iter()
        .flat_map(|r| r.duplicate_issues.iter().cloned())
        .collect();

    Ok(ProfileResult {
        column_profiles,
        total_rows: results.iter().map(|r| r.total_rows).sum(),
        generated_at: Utc::now(),
        elapsed_ms: started.elapsed().as_millis() as u64,
        correlation_matrix,
        duplicate_issues,
        correlation_state,
    })
}

/// Merge correlation state when every input carries it over the same column
/// list; otherwise the merged profile simply has no correlation data.
fn merge_correlation_state(
    results: &[ProfileResult],
) -> Result<Option<crate::correlate::CorrelationAccumulator>> {
    let mut states = results.iter().map(|r| r.correlation_state.as_ref());
    let Some(Some(first)) = states.next() else {
        return Ok(None);
    };
    let mut combined = first.clone();
    for state in states {
        let Some(state) = state else {
            return Ok(None);
        };
        if state.columns() != combined.columns() {
            return Ok(None);
        }
        combined.merge(state)?;
    }
    Ok(Some(combined))
}
