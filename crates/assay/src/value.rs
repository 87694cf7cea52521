//! Per-cell value classification and column type inference.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// =============================================================================
// LAZY STATIC PATTERNS
// =============================================================================
// Date patterns compiled once on first use.

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap(),  // ISO date
        Regex::new(r"^\d{2}/\d{2}/\d{4}$").unwrap(),  // US date
        Regex::new(r"^\d{2}-\d{2}-\d{4}$").unwrap(),  // European date
        Regex::new(r"^\d{4}/\d{2}/\d{2}$").unwrap(),  // Alt ISO
        Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}").unwrap(), // ISO datetime
    ]
});

/// Type family assigned to one raw cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTypeFamily {
    /// Whole number, parseable as i64.
    Integer,
    /// Any other finite floating-point number.
    Numeric,
    /// true/false/yes/no style token.
    Boolean,
    /// Date or datetime shaped value.
    Date,
    /// Everything else non-empty.
    String,
    /// Empty cell or a recognized missing-data token.
    Null,
}

impl ValueTypeFamily {
    /// Whether this family carries numeric values.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueTypeFamily::Integer | ValueTypeFamily::Numeric)
    }

    /// Get a human-readable label for the family.
    pub fn label(&self) -> &'static str {
        match self {
            ValueTypeFamily::Integer => "Integer",
            ValueTypeFamily::Numeric => "Numeric",
            ValueTypeFamily::Boolean => "Boolean",
            ValueTypeFamily::Date => "Date",
            ValueTypeFamily::String => "String",
            ValueTypeFamily::Null => "Null",
        }
    }
}

/// Column-level type assigned once all cells have been tallied.
///
/// Mirrors [`ValueTypeFamily`] plus the two outcomes that only exist at the
/// column level: `Mixed` (no family dominates cleanly) and `Empty` (no
/// non-null values at all).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferredType {
    Integer,
    Numeric,
    Boolean,
    Date,
    String,
    Mixed,
    Empty,
}

impl InferredType {
    /// Whether columns of this type get numeric statistics.
    pub fn is_numeric(&self) -> bool {
        matches!(self, InferredType::Integer | InferredType::Numeric)
    }

    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            InferredType::Integer => "Integer",
            InferredType::Numeric => "Numeric",
            InferredType::Boolean => "Boolean",
            InferredType::Date => "Date",
            InferredType::String => "String",
            InferredType::Mixed => "Mixed",
            InferredType::Empty => "Empty",
        }
    }
}

/// Classifies raw cell values into type families.
///
/// Classification is pure and order-independent: the same cell always maps to
/// the same family, which is what makes column inference idempotent.
#[derive(Debug, Clone, Default)]
pub struct ValueClassifier;

impl ValueClassifier {
    /// Create a new classifier.
    pub fn new() -> Self {
        Self
    }

    /// Check if a value represents a missing/null value.
    pub fn is_null(&self, value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("na")
            || trimmed.eq_ignore_ascii_case("n/a")
            || trimmed.eq_ignore_ascii_case("null")
            || trimmed.eq_ignore_ascii_case("none")
            || trimmed.eq_ignore_ascii_case("nil")
            || trimmed == "."
            || trimmed == "-"
    }

    /// Classify one raw cell into a type family.
    pub fn classify(&self, value: &str) -> ValueTypeFamily {
        let trimmed = value.trim();

        if self.is_null(trimmed) {
            return ValueTypeFamily::Null;
        }

        if is_boolean_token(trimmed) {
            return ValueTypeFamily::Boolean;
        }

        if trimmed.parse::<i64>().is_ok() {
            return ValueTypeFamily::Integer;
        }

        if let Ok(f) = trimmed.parse::<f64>() {
            // "nan"/"inf" parse as f64 but are not data values.
            if f.is_finite() {
                return ValueTypeFamily::Numeric;
            }
        }

        if DATE_PATTERNS.iter().any(|re| re.is_match(trimmed)) {
            return ValueTypeFamily::Date;
        }

        ValueTypeFamily::String
    }

    /// Parse the numeric value of a cell, if its family is numeric.
    ///
    /// Returns `None` for every non-numeric family, so callers can feed the
    /// result straight into numeric accumulators without re-checking.
    pub fn parse_numeric(&self, value: &str) -> Option<f64> {
        let trimmed = value.trim();
        if self.is_null(trimmed) || is_boolean_token(trimmed) {
            return None;
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => Some(f),
            _ => None,
        }
    }
}

fn is_boolean_token(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("yes")
        || value.eq_ignore_ascii_case("no")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_null_tokens() {
        let c = ValueClassifier::new();
        for v in ["", "  ", "NA", "n/a", "NULL", "none", "nil", ".", "-"] {
            assert_eq!(c.classify(v), ValueTypeFamily::Null, "value: {v:?}");
        }
    }

    #[test]
    fn test_classify_numbers() {
        let c = ValueClassifier::new();
        assert_eq!(c.classify("42"), ValueTypeFamily::Integer);
        assert_eq!(c.classify("-7"), ValueTypeFamily::Integer);
        assert_eq!(c.classify("3.14"), ValueTypeFamily::Numeric);
        assert_eq!(c.classify("-2.5e3"), ValueTypeFamily::Numeric);
        assert_eq!(c.classify("inf"), ValueTypeFamily::String);
        assert_eq!(c.classify("NaN"), ValueTypeFamily::String);
    }

    #[test]
    fn test_classify_booleans_and_dates() {
        let c = ValueClassifier::new();
        assert_eq!(c.classify("true"), ValueTypeFamily::Boolean);
        assert_eq!(c.classify("No"), ValueTypeFamily::Boolean);
        assert_eq!(c.classify("2024-03-15"), ValueTypeFamily::Date);
        assert_eq!(c.classify("03/15/2024"), ValueTypeFamily::Date);
        assert_eq!(c.classify("2024-03-15T10:30"), ValueTypeFamily::Date);
        assert_eq!(c.classify("hello"), ValueTypeFamily::String);
    }

    #[test]
    fn test_parse_numeric_matches_classification() {
        let c = ValueClassifier::new();
        assert_eq!(c.parse_numeric("42"), Some(42.0));
        assert_eq!(c.parse_numeric(" 3.5 "), Some(3.5));
        assert_eq!(c.parse_numeric("true"), None);
        assert_eq!(c.parse_numeric("abc"), None);
        assert_eq!(c.parse_numeric(""), None);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let c = ValueClassifier::new();
        for v in ["42", "3.14", "true", "2024-01-01", "text", ""] {
            assert_eq!(c.classify(v), c.classify(v));
        }
    }
}
