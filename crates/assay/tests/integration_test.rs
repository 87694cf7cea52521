//! End-to-end profiling tests over synthetic datasets.

use std::sync::atomic::Ordering;

use assay::{
    compare_profiles, merge_profiles, ColumnStatus, FileProfileBuilder, InferredType, Metric,
    PiiType, ProfileConfig, ProfileResult, Severity, TrendDirection,
};

/// Build a profile from a header and rows of cells.
fn profile_rows(columns: &[&str], rows: &[Vec<String>]) -> ProfileResult {
    let mut builder = FileProfileBuilder::new(
        columns.iter().map(|s| s.to_string()).collect(),
        ProfileConfig::default(),
    )
    .expect("builder");
    for row in rows {
        builder.feed_row_owned(row.clone()).expect("feed");
    }
    builder.finish().expect("finish")
}

/// Synthetic customer dataset exercising every column family.
fn customer_rows(n: usize) -> Vec<Vec<String>> {
    (0..n)
        .map(|i| {
            vec![
                format!("{}", i + 1),                             // id
                format!("user{i}@example.com"),                   // email
                format!("{:.2}", 20.0 + (i % 50) as f64 * 1.5),   // amount
                format!("2024-{:02}-{:02}", i % 12 + 1, i % 28 + 1), // signup
                if i % 2 == 0 { "yes" } else { "no" }.to_string(), // active
                if i % 10 == 0 {
                    String::new()
                } else {
                    format!("Region_{}", i % 4)
                }, // region, 10% missing
            ]
        })
        .collect()
}

const CUSTOMER_COLUMNS: [&str; 6] = ["id", "email", "amount", "signup", "active", "region"];

// =============================================================================
// Full-profile scenarios
// =============================================================================

#[test]
fn test_full_profile_over_mixed_dataset() {
    let result = profile_rows(&CUSTOMER_COLUMNS, &customer_rows(500));

    assert_eq!(result.total_rows, 500);
    assert_eq!(result.column_profiles.len(), 6);

    let id = result.column("id").unwrap();
    assert_eq!(id.base_stats.inferred_type, InferredType::Integer);
    let stats = id.numeric_stats.as_ref().unwrap();
    assert_eq!(stats.min, 1.0);
    assert_eq!(stats.max, 500.0);
    assert!(id.histogram.is_some());

    let signup = result.column("signup").unwrap();
    assert_eq!(signup.base_stats.inferred_type, InferredType::Date);

    let active = result.column("active").unwrap();
    assert_eq!(active.base_stats.inferred_type, InferredType::Boolean);

    let region = result.column("region").unwrap();
    assert_eq!(region.base_stats.inferred_type, InferredType::String);
    assert_eq!(region.base_stats.missing, 50);
    let categorical = region.categorical_stats.as_ref().unwrap();
    assert_eq!(categorical.unique_count, 4);
    // Region_1 and Region_3 tie at 125 non-missing rows; first seen wins.
    assert_eq!(categorical.top_values[0].value, "Region_1");
    assert_eq!(categorical.top_values[0].count, 125);
}

#[test]
fn test_pii_detection_end_to_end() {
    let result = profile_rows(&CUSTOMER_COLUMNS, &customer_rows(200));

    let email = result.column("email").unwrap();
    let finding = email.pii_finding.as_ref().expect("email column flagged");
    assert_eq!(finding.pii_type, PiiType::Email);
    assert!(email
        .notes
        .iter()
        .any(|n| n.severity == Severity::Warning && n.message.contains("email")));
}

#[test]
fn test_missing_data_notes_and_flags() {
    let rows: Vec<Vec<String>> = (0..100)
        .map(|i| {
            vec![
                i.to_string(),
                if i % 2 == 0 { String::new() } else { "x".to_string() },
            ]
        })
        .collect();
    let result = profile_rows(&["id", "sparse"], &rows);

    let sparse = result.column("sparse").unwrap();
    assert_eq!(sparse.base_stats.missing, 50);
    assert!((sparse.null_rate() - 50.0).abs() < 1e-9);
    assert!(sparse
        .notes
        .iter()
        .any(|n| n.severity == Severity::Warning && n.message.contains("missing")));
    assert_eq!(sparse.flagged_rows.missing.len(), 50);
    assert!(sparse.health_score < 1.0);
}

#[test]
fn test_outlier_rows_surface_in_result() {
    let mut rows: Vec<Vec<String>> = (0..200).map(|i| vec![format!("{}", 50 + i % 5)]).collect();
    rows.push(vec!["100000".to_string()]);
    let result = profile_rows(&["reading"], &rows);

    let reading = result.column("reading").unwrap();
    assert_eq!(reading.flagged_rows.outliers, vec![200]);
}

#[test]
fn test_duplicate_rows_reported() {
    let mut rows: Vec<Vec<String>> = (0..80).map(|i| vec![i.to_string(), "ok".into()]).collect();
    for _ in 0..20 {
        rows.push(vec!["7".to_string(), "ok".into()]);
    }
    let result = profile_rows(&["id", "status"], &rows);

    assert_eq!(result.duplicate_issues.len(), 1);
    let issue = &result.duplicate_issues[0];
    assert_eq!(issue.duplicate_rows, 20);
    assert_eq!(issue.severity, Severity::Warning);
}

#[test]
fn test_correlated_columns_in_matrix() {
    let rows: Vec<Vec<String>> = (0..300)
        .map(|i| {
            vec![
                i.to_string(),
                (3 * i + 7).to_string(),
                format!("label_{}", i % 3),
            ]
        })
        .collect();
    let result = profile_rows(&["x", "y", "label"], &rows);

    let matrix = result.correlation_matrix.as_ref().unwrap();
    assert_eq!(matrix.columns.len(), 2);
    assert!((matrix.get("x", "y").unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn test_summary_rollup() {
    let result = profile_rows(&CUSTOMER_COLUMNS, &customer_rows(300));
    let summary = result.summary();

    assert_eq!(summary.total_rows, 300);
    assert_eq!(summary.column_count, 6);
    assert_eq!(summary.numeric_columns, 2);
    assert!(summary.mean_health_score > 0.0 && summary.mean_health_score <= 1.0);
    assert!(summary.warning_notes >= 1);
}

// =============================================================================
// Cancellation
// =============================================================================

#[test]
fn test_cancellation_mid_stream() {
    let mut builder = FileProfileBuilder::new(
        vec!["v".to_string()],
        ProfileConfig::default(),
    )
    .unwrap();
    let token = builder.cancel_token();

    let mut cancelled = false;
    for i in 0..5000 {
        if i == 1500 {
            token.store(true, Ordering::Relaxed);
        }
        if builder.feed_row(&[&i.to_string()]).is_err() {
            cancelled = true;
            break;
        }
    }
    assert!(cancelled, "scan should stop at the checkpoint after cancel");
}

// =============================================================================
// Chunked profiling and merging
// =============================================================================

#[test]
fn test_chunked_merge_equals_single_pass() {
    let rows = customer_rows(400);
    let whole = profile_rows(&CUSTOMER_COLUMNS, &rows);
    let first = profile_rows(&CUSTOMER_COLUMNS, &rows[..150].to_vec());
    let second = profile_rows(&CUSTOMER_COLUMNS, &rows[150..].to_vec());

    let merged = merge_profiles(&[first, second]).unwrap();
    assert_eq!(merged.total_rows, whole.total_rows);

    for name in CUSTOMER_COLUMNS {
        let m = merged.column(name).unwrap();
        let w = whole.column(name).unwrap();
        assert_eq!(m.base_stats.count, w.base_stats.count, "column {name}");
        assert_eq!(m.base_stats.missing, w.base_stats.missing, "column {name}");
        assert_eq!(
            m.base_stats.inferred_type, w.base_stats.inferred_type,
            "column {name}"
        );
        if let (Some(ms), Some(ws)) = (&m.numeric_stats, &w.numeric_stats) {
            assert_eq!(ms.min, ws.min, "column {name}");
            assert_eq!(ms.max, ws.max, "column {name}");
            assert!((ms.mean - ws.mean).abs() < 1e-9, "column {name}");
            assert!((ms.variance - ws.variance).abs() < 1e-6, "column {name}");
        }
    }
}

#[test]
fn test_three_way_merge_associative() {
    let rows = customer_rows(300);
    let a = profile_rows(&CUSTOMER_COLUMNS, &rows[..100].to_vec());
    let b = profile_rows(&CUSTOMER_COLUMNS, &rows[100..200].to_vec());
    let c = profile_rows(&CUSTOMER_COLUMNS, &rows[200..].to_vec());

    let left = merge_profiles(&[merge_profiles(&[a.clone(), b.clone()]).unwrap(), c.clone()])
        .unwrap();
    let right = merge_profiles(&[a, merge_profiles(&[b, c]).unwrap()]).unwrap();

    assert_eq!(left.total_rows, right.total_rows);
    for name in CUSTOMER_COLUMNS {
        let l = left.column(name).unwrap();
        let r = right.column(name).unwrap();
        assert_eq!(l.base_stats.count, r.base_stats.count);
        if let (Some(ls), Some(rs)) = (&l.numeric_stats, &r.numeric_stats) {
            assert!((ls.mean - rs.mean).abs() < 1e-9);
            assert!((ls.variance - rs.variance).abs() < 1e-6);
        }
    }
}

// =============================================================================
// Comparison
// =============================================================================

#[test]
fn test_quality_regression_detected_across_files() {
    let baseline = profile_rows(&["id", "value"], &clean_rows(200, 0));
    let month2 = profile_rows(&["id", "value"], &clean_rows(200, 20));
    let month3 = profile_rows(&["id", "value"], &clean_rows(200, 60));

    let result = compare_profiles(&baseline, &[month2, month3]).unwrap();

    let trend = result
        .trends
        .iter()
        .find(|t| t.column == "value" && t.metric == Metric::NullRate)
        .unwrap();
    assert_eq!(trend.direction, TrendDirection::Degrading);

    let value = result.file_comparisons[1]
        .columns
        .iter()
        .find(|c| c.name == "value")
        .unwrap();
    assert_eq!(value.status, ColumnStatus::Modified);
}

/// Rows with `missing` of the first `n` values blanked out.
fn clean_rows(n: usize, missing: usize) -> Vec<Vec<String>> {
    (0..n)
        .map(|i| {
            vec![
                i.to_string(),
                if i < missing {
                    String::new()
                } else {
                    format!("{}", 10 + i % 7)
                },
            ]
        })
        .collect()
}

// =============================================================================
// Serialization contract
// =============================================================================

#[test]
fn test_profile_result_json_round_trip() {
    let result = profile_rows(&CUSTOMER_COLUMNS, &customer_rows(150));
    let json = result.to_json().unwrap();

    let restored = ProfileResult::from_json(&json).unwrap();
    assert_eq!(restored.total_rows, result.total_rows);
    assert_eq!(restored.column_names(), result.column_names());
    let amount = restored.column("amount").unwrap();
    assert_eq!(
        amount.numeric_stats.as_ref().unwrap().mean,
        result
            .column("amount")
            .unwrap()
            .numeric_stats
            .as_ref()
            .unwrap()
            .mean
    );

    // A deserialized profile still merges.
    let merged = merge_profiles(&[result, restored]).unwrap();
    assert_eq!(merged.total_rows, 300);
}

#[test]
fn test_json_shape_is_stable() {
    let result = profile_rows(&["id", "note"], &vec![
        vec!["1".to_string(), "hello".to_string()],
        vec!["2".to_string(), "world".to_string()],
    ]);
    let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

    assert!(json["total_rows"].is_u64());
    assert!(json["generated_at"].is_string());
    assert!(json["elapsed_ms"].is_u64());
    let columns = json["column_profiles"].as_array().unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0]["name"], "id");
    assert!(columns[0]["base_stats"]["count"].is_u64());
    assert!(columns[0]["base_stats"]["inferred_type"].is_string());
    assert!(columns[0]["health_score"].is_number());
    assert!(columns[0]["numeric_stats"]["mean"].is_number());
    // String columns carry no numeric stats at all.
    assert!(columns[1].get("numeric_stats").is_none());
}
