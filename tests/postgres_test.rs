mod common;

use common::*;
use dbdiag::{
    check::{self, CheckOptions},
    outcome::Status,
    tls,
};

#[tokio::test]
#[ignore = "requires running PostgreSQL container"]
async fn test_postgres_success() {
    if skip_if_no_postgres() {
        return;
    }
    tls::ensure_crypto_provider();

    let target = postgres_target(&postgres_password());
    let outcome = check::run_one(&target, &key(), &CheckOptions::default()).await;

    assert_eq!(outcome.status, Status::Success, "{outcome:?}");
    assert!(outcome.verified);
    assert_eq!(outcome.release_error, None);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL container"]
async fn test_postgres_wrong_password() {
    if skip_if_no_postgres() {
        return;
    }
    tls::ensure_crypto_provider();

    let target = postgres_target("definitely-not-the-password");
    let outcome = check::run_one(&target, &key(), &CheckOptions::default()).await;

    assert_eq!(outcome.status, Status::ConnectFailed);
    assert_eq!(outcome.error_class, Some("authentication"));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL container"]
async fn test_postgres_failing_health_query() {
    if skip_if_no_postgres() {
        return;
    }
    tls::ensure_crypto_provider();

    let mut target = postgres_target(&postgres_password());
    target.health_query = Some("SELECT * FROM dbdiag_missing_table".to_string());
    let outcome = check::run_one(&target, &key(), &CheckOptions::default()).await;

    assert_eq!(outcome.status, Status::HealthCheckFailed);
    assert_eq!(outcome.error_class, Some("query"));
    assert!(outcome.cause.unwrap().starts_with("health query"));
}
