use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{collections::BTreeMap, fmt, time::Duration};
use uuid::Uuid;

/// Terminal classification of one target check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    DecryptionFailed,
    InvalidTrustMaterial,
    UnsupportedTrustMode,
    UnsupportedKind,
    ConnectFailed,
    ProbeFailed,
    HealthCheckFailed,
    /// The check never reported, e.g. its task died
    Aborted,
}

impl Status {
    pub const ALL: [Self; 9] = [
        Self::Success,
        Self::DecryptionFailed,
        Self::InvalidTrustMaterial,
        Self::UnsupportedTrustMode,
        Self::UnsupportedKind,
        Self::ConnectFailed,
        Self::ProbeFailed,
        Self::HealthCheckFailed,
        Self::Aborted,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::DecryptionFailed => "decryption_failed",
            Self::InvalidTrustMaterial => "invalid_trust_material",
            Self::UnsupportedTrustMode => "unsupported_trust_mode",
            Self::UnsupportedKind => "unsupported_kind",
            Self::ConnectFailed => "connect_failed",
            Self::ProbeFailed => "probe_failed",
            Self::HealthCheckFailed => "health_check_failed",
            Self::Aborted => "aborted",
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a failure cause into a coarse error type
#[must_use]
pub fn classify_error(status: Status, cause: &str) -> &'static str {
    let cause = cause.to_lowercase();

    // an interrupted step reads the same whichever step it hit
    if cause.contains("cancelled") {
        return "cancelled";
    }
    if cause.contains("timed out") || cause.contains("timeout") {
        return "timeout";
    }

    match status {
        Status::DecryptionFailed => return "decryption",
        Status::InvalidTrustMaterial | Status::UnsupportedTrustMode => return "tls",
        Status::UnsupportedKind | Status::Aborted => return "other",
        _ => {}
    }

    if cause.contains("authentication")
        || cause.contains("password")
        || cause.contains("login failed")
        || cause.contains("ora-01017")
    {
        "authentication"
    } else if cause.contains("ssl") || cause.contains("tls") || cause.contains("certificate") {
        "tls"
    } else if cause.contains("connection")
        || cause.contains("refused")
        || cause.contains("unreachable")
        || cause.contains("resolve")
    {
        "connection"
    } else if status == Status::HealthCheckFailed {
        "query"
    } else {
        "other"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub target: String,
    pub kind: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_class: Option<&'static str>,
    /// Whether a health query ran and passed
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_error: Option<String>,
    pub elapsed_ms: u64,
}

pub(crate) fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

impl Outcome {
    #[must_use]
    pub fn success(target: &str, kind: &str, verified: bool, elapsed: Duration) -> Self {
        Self {
            target: target.to_string(),
            kind: kind.to_string(),
            status: Status::Success,
            cause: None,
            error_class: None,
            verified,
            release_error: None,
            elapsed_ms: millis(elapsed),
        }
    }

    #[must_use]
    pub fn failure(
        target: &str,
        kind: &str,
        status: Status,
        cause: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        let cause = cause.into();
        Self {
            target: target.to_string(),
            kind: kind.to_string(),
            status,
            error_class: Some(classify_error(status, &cause)),
            cause: Some(cause),
            verified: false,
            release_error: None,
            elapsed_ms: millis(elapsed),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Outcomes of one run, keyed by target identifier
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub outcomes: BTreeMap<String, Outcome>,
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

impl Report {
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            elapsed_ms: 0,
            outcomes: BTreeMap::new(),
        }
    }

    /// Record an outcome, keeping the first one reported for a target
    pub fn insert(&mut self, outcome: Outcome) {
        self.outcomes.entry(outcome.target.clone()).or_insert(outcome);
    }

    #[must_use]
    pub fn get(&self, target: &str) -> Option<&Outcome> {
        self.outcomes.get(target)
    }

    #[must_use]
    pub fn contains(&self, target: &str) -> bool {
        self.outcomes.contains_key(target)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    #[must_use]
    pub fn failures(&self) -> usize {
        self.outcomes.values().filter(|o| !o.is_success()).count()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.values()
    }

    pub(crate) fn finish(&mut self, elapsed: Duration) {
        self.elapsed_ms = millis(elapsed);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_classify_error() {
        let cases = [
            (Status::ConnectFailed, "password authentication failed for user \"app\"", "authentication"),
            (Status::ConnectFailed, "Login failed for user 'sa'.", "authentication"),
            (Status::ConnectFailed, "ORA-01017: invalid username/password", "authentication"),
            (Status::ConnectFailed, "connect timed out", "timeout"),
            (Status::ProbeFailed, "probe cancelled", "cancelled"),
            (Status::ConnectFailed, "error communicating with database: Connection refused (os error 111)", "connection"),
            (Status::ConnectFailed, "invalid peer certificate: UnknownIssuer", "tls"),
            (Status::InvalidTrustMaterial, "no certificates found in /tmp/ca.crt", "tls"),
            (Status::HealthCheckFailed, "no such table: missing", "query"),
            (Status::DecryptionFailed, "authentication failed, the ciphertext was altered or the key is wrong", "decryption"),
            (Status::UnsupportedTrustMode, "unsupported tls_mode: \"prefer\"", "tls"),
            (Status::UnsupportedKind, "unsupported database type: \"redis\"", "other"),
            (Status::InvalidTrustMaterial, "trust policy: cancelled", "cancelled"),
            (Status::InvalidTrustMaterial, "trust policy: timed out", "timeout"),
        ];

        for (status, cause, expected) in cases {
            assert_eq!(classify_error(status, cause), expected, "{cause}");
        }
    }

    #[test]
    fn test_status_serialization() {
        for status in Status::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert!(Status::Success.is_success());
        assert!(!Status::Aborted.is_success());
    }

    #[test]
    fn test_outcome_failure() {
        let outcome = Outcome::failure(
            "orders",
            "postgres",
            Status::ConnectFailed,
            "Connection refused",
            Duration::from_millis(12),
        );
        assert_eq!(outcome.error_class, Some("connection"));
        assert_eq!(outcome.elapsed_ms, 12);
        assert!(!outcome.is_success());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "connect_failed");
        assert_eq!(json["cause"], "Connection refused");
        assert!(json.get("release_error").is_none());
    }

    #[test]
    fn test_outcome_success_serialization() {
        let outcome = Outcome::success("orders", "postgres", true, Duration::from_millis(3));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["verified"], true);
        assert!(json.get("cause").is_none());
        assert!(json.get("error_class").is_none());
    }

    #[test]
    fn test_report_keeps_one_entry_per_target() {
        let mut report = Report::new();
        report.insert(Outcome::success("b", "mysql", false, Duration::ZERO));
        report.insert(Outcome::failure(
            "a",
            "postgres",
            Status::ProbeFailed,
            "x",
            Duration::ZERO,
        ));
        report.insert(Outcome::failure(
            "b",
            "mysql",
            Status::Aborted,
            "late duplicate",
            Duration::ZERO,
        ));

        assert_eq!(report.len(), 2);
        assert_eq!(report.failures(), 1);
        assert!(!report.is_success());
        assert!(report.get("b").unwrap().is_success());

        let ids: Vec<&str> = report.iter().map(|o| o.target.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_report_is_success() {
        let report = Report::default();
        assert!(report.is_empty());
        assert!(report.is_success());
    }
}
