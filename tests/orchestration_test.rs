mod common;

use common::*;
use dbdiag::{
    check::{self, CheckOptions},
    outcome::Status,
    report::{self, Format},
    tls,
};
use std::{path::Path, sync::Arc, time::Duration};

fn options(timeout: Duration) -> CheckOptions {
    CheckOptions {
        timeout,
        ..CheckOptions::default()
    }
}

#[tokio::test]
async fn test_every_target_gets_exactly_one_outcome() {
    tls::ensure_crypto_provider();
    let db = tempfile::NamedTempFile::new().unwrap();

    let mut healthy = sqlite_target("healthy", db.path());
    healthy.health_query = Some("SELECT 1".to_string());

    let mut bad_query = sqlite_target("bad-query", db.path());
    bad_query.health_query = Some("SELECT * FROM missing_table".to_string());

    let mut tampered = unreachable("tampered", "postgres");
    let mut sealed = encrypt("secret").into_bytes();
    // a character inside the base64 body, never the padding
    sealed[20] = if sealed[20] == b'A' { b'B' } else { b'A' };
    tampered.encrypted_secret = String::from_utf8(sealed).unwrap();

    let mut bad_mode = unreachable("bad-mode", "mysql");
    bad_mode.trust.mode = Some("sometimes".to_string());

    let mut missing_ca = unreachable("missing-ca", "postgres");
    missing_ca.trust.mode = Some("verify-ca".to_string());
    missing_ca.trust.root_cert = Some("/nonexistent/ca.crt".into());

    let targets = vec![
        healthy,
        bad_query,
        sqlite_target("missing-file", Path::new("/nonexistent/dbdiag/cache.db")),
        tampered,
        bad_mode,
        missing_ca,
        unreachable("refused", "postgres"),
        target("unknown", "cassandra"),
    ];

    let report = check::run_all(targets, Arc::new(key()), &options(Duration::from_secs(20))).await;

    assert_eq!(report.len(), 8);
    assert_eq!(report.failures(), 7);

    let status = |id: &str| report.get(id).unwrap().status;
    assert_eq!(status("healthy"), Status::Success);
    assert!(report.get("healthy").unwrap().verified);
    assert_eq!(status("bad-query"), Status::HealthCheckFailed);
    assert_eq!(status("missing-file"), Status::ConnectFailed);
    assert_eq!(status("tampered"), Status::DecryptionFailed);
    assert_eq!(status("bad-mode"), Status::UnsupportedTrustMode);
    assert_eq!(status("missing-ca"), Status::InvalidTrustMaterial);
    assert_eq!(status("refused"), Status::ConnectFailed);
    assert_eq!(status("unknown"), Status::UnsupportedKind);

    assert_eq!(
        report.get("tampered").unwrap().error_class,
        Some("decryption")
    );

    // a missing database file is never created as a side effect
    assert!(!Path::new("/nonexistent/dbdiag/cache.db").exists());
}

#[tokio::test]
async fn test_cancelled_run_still_reports_every_target() {
    let db = tempfile::NamedTempFile::new().unwrap();
    let opts = options(Duration::from_secs(20));
    opts.cancel.cancel();

    let targets = vec![
        sqlite_target("a", db.path()),
        sqlite_target("b", db.path()),
        unreachable("c", "postgres"),
    ];

    let report = check::run_all(targets, Arc::new(key()), &opts).await;
    assert_eq!(report.len(), 3);
    assert!(report.iter().all(|o| !o.is_success()));
    assert!(
        report
            .iter()
            .all(|o| o.cause.as_deref().is_some_and(|c| c.contains("cancelled")))
    );
}

#[tokio::test]
async fn test_bounded_concurrency_reports_everything() {
    let db = tempfile::NamedTempFile::new().unwrap();
    let targets = (0..10)
        .map(|i| sqlite_target(&format!("cache-{i}"), db.path()))
        .collect();

    let opts = CheckOptions {
        concurrency: 2,
        ..options(Duration::from_secs(20))
    };
    let report = check::run_all(targets, Arc::new(key()), &opts).await;

    assert_eq!(report.len(), 10);
    assert!(report.is_success());
}

#[tokio::test]
async fn test_json_report_shape() {
    let db = tempfile::NamedTempFile::new().unwrap();
    let targets = vec![
        sqlite_target("cache", db.path()),
        target("unknown", "cassandra"),
    ];

    let report = check::run_all(targets, Arc::new(key()), &options(Duration::from_secs(10))).await;
    let json = report::render(&report, Format::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert!(value["run_id"].is_string());
    assert_eq!(value["outcomes"]["cache"]["status"], "success");
    assert_eq!(value["outcomes"]["unknown"]["status"], "unsupported_kind");
    assert_eq!(value["outcomes"]["unknown"]["error_class"], "other");
    assert!(value["outcomes"]["cache"].get("cause").is_none());
}
