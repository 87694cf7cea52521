//! Heuristic PII pattern detection for string columns.
//!
//! Values are matched against a fixed set of shape patterns while they
//! stream by (bounded to the first `SCAN_LIMIT` string values of a column);
//! a column is flagged when enough of the scanned values match. Column
//! names act as a secondary signal that lowers the bar for ambiguous
//! shapes like dates of birth and postal codes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::Severity;

/// How many string values per column are scanned for PII shapes.
pub const SCAN_LIMIT: usize = 100;

/// Fraction of scanned values that must match to flag a column.
pub const MATCH_THRESHOLD: f64 = 0.3;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b").unwrap());

// (123) 456-7890, 123-456-7890, 123.456.7890, +1-123-456-7890
static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap());

// XXX-XX-XXXX, entire string; the length check elsewhere keeps credit card
// numbers from matching.
static SSN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3}-\d{2}-\d{4}$").unwrap());

// 4-digit groups separated by spaces or dashes (13-19 digits total)
static CREDIT_CARD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4,7}\b").unwrap());

static IP_ADDRESS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").unwrap());

// YYYY-MM-DD or YYYY/MM/DD with a plausible year
static DOB_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:19|20)\d{2}[-/](?:0[1-9]|1[0-2])[-/](?:0[1-9]|[12]\d|3[01])\b").unwrap()
});

// 12345 or 12345-6789
static US_POSTAL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{5}(?:-\d{4})?\b").unwrap());

// A1A 1A1 or A1A1A1
static CA_POSTAL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b[A-Z]\d[A-Z]\s?\d[A-Z]\d\b").unwrap());

/// Category of personally identifiable information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiType {
    Email,
    Phone,
    Ssn,
    CreditCard,
    IpAddress,
    DateOfBirth,
    PostalCode,
}

/// All categories, in flagging priority order (most sensitive first).
const ALL_TYPES: [PiiType; 7] = [
    PiiType::Ssn,
    PiiType::CreditCard,
    PiiType::Email,
    PiiType::Phone,
    PiiType::IpAddress,
    PiiType::DateOfBirth,
    PiiType::PostalCode,
];

impl PiiType {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            PiiType::Email => "email",
            PiiType::Phone => "phone number",
            PiiType::Ssn => "SSN",
            PiiType::CreditCard => "credit card",
            PiiType::IpAddress => "IP address",
            PiiType::DateOfBirth => "date of birth",
            PiiType::PostalCode => "postal code",
        }
    }

    /// Severity a confirmed finding of this category carries.
    pub fn severity(&self) -> Severity {
        match self {
            PiiType::Email => Severity::Warning,
            PiiType::Phone => Severity::Warning,
            PiiType::Ssn => Severity::Error,
            PiiType::CreditCard => Severity::Error,
            PiiType::IpAddress => Severity::Warning,
            PiiType::DateOfBirth => Severity::Warning,
            PiiType::PostalCode => Severity::Info,
        }
    }

    fn matches(&self, trimmed: &str) -> bool {
        match self {
            PiiType::Email => EMAIL_REGEX.is_match(trimmed),
            PiiType::Phone => PHONE_REGEX.is_match(trimmed),
            // Exactly XXX-XX-XXXX, nine digits, so longer digit runs
            // (credit cards) never count.
            PiiType::Ssn => {
                trimmed.len() == 11
                    && trimmed.chars().filter(|c| c.is_numeric()).count() == 9
                    && SSN_REGEX.is_match(trimmed)
            }
            PiiType::CreditCard => trimmed.len() > 13 && CREDIT_CARD_REGEX.is_match(trimmed),
            PiiType::IpAddress => IP_ADDRESS_REGEX.is_match(trimmed),
            PiiType::DateOfBirth => DOB_REGEX.is_match(trimmed),
            PiiType::PostalCode => {
                US_POSTAL_REGEX.is_match(trimmed) || CA_POSTAL_REGEX.is_match(trimmed)
            }
        }
    }
}

/// Detect a potential PII type from a column name alone.
pub fn type_from_column_name(name: &str) -> Option<PiiType> {
    let name = name.to_lowercase();

    if name.contains("email") || name.contains("e_mail") || name.contains("e-mail") {
        return Some(PiiType::Email);
    }
    if name.contains("phone") || name.contains("mobile") || name.contains("cell")
        || name.contains("tel") || name.contains("fax")
    {
        return Some(PiiType::Phone);
    }
    if name.contains("ssn") || name.contains("social_security") || name.contains("socialsecurity") {
        return Some(PiiType::Ssn);
    }
    // Checked before postal/address keywords since "ip_address" contains
    // "address".
    if name.contains("ip_address") || name.contains("ipaddress") || name.contains("ip_addr")
        || name.contains("client_ip") || name.contains("remote_ip") || name == "ip"
    {
        return Some(PiiType::IpAddress);
    }
    if name.contains("credit_card") || name.contains("card_number") || name.contains("cc_num") {
        return Some(PiiType::CreditCard);
    }
    if name.contains("dob") || name.contains("birth") {
        return Some(PiiType::DateOfBirth);
    }
    if name.contains("zip") || name.contains("postal") {
        return Some(PiiType::PostalCode);
    }
    None
}

/// A confirmed PII observation for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiFinding {
    #[serde(rename = "type")]
    pub pii_type: PiiType,
    /// Matches among the scanned values.
    pub occurrences: u64,
    /// Match rate among the scanned values, as a percentage.
    pub percentage: f64,
}

/// Streaming per-column PII tallier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PiiTracker {
    counts: [u64; ALL_TYPES.len()],
    scanned: u64,
}

impl PiiTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan one string value. Returns `true` if any pattern matched, so the
    /// caller can record the row index. Stops scanning after `SCAN_LIMIT`
    /// values.
    pub fn record(&mut self, value: &str) -> bool {
        if self.scanned >= SCAN_LIMIT as u64 {
            return false;
        }
        self.scanned += 1;

        let trimmed = value.trim();
        let mut any = false;
        for (i, ty) in ALL_TYPES.iter().enumerate() {
            if ty.matches(trimmed) {
                self.counts[i] += 1;
                any = true;
            }
        }
        any
    }

    /// Number of values scanned so far.
    pub fn scanned(&self) -> u64 {
        self.scanned
    }

    /// Decide whether the column should be flagged, in priority order.
    ///
    /// Dates of birth get a halved threshold when the column name suggests
    /// them; postal codes are only flagged with a supporting column name,
    /// since five-digit numbers are too common to trust on shape alone.
    pub fn finalize(&self, column_name: &str) -> Option<PiiFinding> {
        if self.scanned == 0 {
            return None;
        }

        let threshold = ((self.scanned as f64 * MATCH_THRESHOLD) as u64).max(1);
        let hint = type_from_column_name(column_name);

        for (i, ty) in ALL_TYPES.iter().enumerate() {
            let required = match ty {
                PiiType::DateOfBirth if hint == Some(PiiType::DateOfBirth) => {
                    (threshold / 2).max(1)
                }
                _ => threshold,
            };
            if *ty == PiiType::PostalCode && hint != Some(PiiType::PostalCode) {
                continue;
            }
            if self.counts[i] >= required {
                return Some(PiiFinding {
                    pii_type: *ty,
                    occurrences: self.counts[i],
                    percentage: self.counts[i] as f64 / self.scanned as f64 * 100.0,
                });
            }
        }
        None
    }

    /// Combine scan tallies from another tracker.
    pub fn merge(&mut self, other: &Self) {
        for (c, &o) in self.counts.iter_mut().zip(&other.counts) {
            *c += o;
        }
        self.scanned += other.scanned;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(values: &[&str]) -> PiiTracker {
        let mut tracker = PiiTracker::new();
        for v in values {
            tracker.record(v);
        }
        tracker
    }

    #[test]
    fn test_email_column_flagged() {
        let tracker = track(&["alice@example.com", "bob@test.org", "not an email"]);
        let finding = tracker.finalize("contact").unwrap();
        assert_eq!(finding.pii_type, PiiType::Email);
        assert_eq!(finding.occurrences, 2);
    }

    #[test]
    fn test_ssn_outranks_phone() {
        // SSNs are checked before less sensitive categories.
        let tracker = track(&["123-45-6789", "987-65-4321"]);
        assert_eq!(tracker.finalize("id").unwrap().pii_type, PiiType::Ssn);
    }

    #[test]
    fn test_credit_card_not_mistaken_for_ssn() {
        let tracker = track(&["4111-1111-1111-1111"]);
        assert_eq!(
            tracker.finalize("payment").unwrap().pii_type,
            PiiType::CreditCard
        );
    }

    #[test]
    fn test_below_threshold_not_flagged() {
        let mut values = vec!["plain text"; 9];
        values.push("alice@example.com");
        // 10% match rate is under the 30% bar.
        let tracker = track(&values);
        assert_eq!(tracker.finalize("notes"), None);
    }

    #[test]
    fn test_postal_needs_column_hint() {
        let tracker = track(&["12345", "54321", "98765"]);
        assert_eq!(tracker.finalize("count"), None);
        assert_eq!(
            tracker.finalize("zip_code").unwrap().pii_type,
            PiiType::PostalCode
        );
    }

    #[test]
    fn test_column_name_hints() {
        assert_eq!(type_from_column_name("user_email"), Some(PiiType::Email));
        assert_eq!(type_from_column_name("ip_address"), Some(PiiType::IpAddress));
        assert_eq!(type_from_column_name("dob"), Some(PiiType::DateOfBirth));
        assert_eq!(type_from_column_name("temperature"), None);
    }

    #[test]
    fn test_scan_limit_bounds_work() {
        let mut tracker = PiiTracker::new();
        for i in 0..(SCAN_LIMIT + 50) {
            tracker.record(&format!("user{i}@example.com"));
        }
        assert_eq!(tracker.scanned(), SCAN_LIMIT as u64);
    }
}
