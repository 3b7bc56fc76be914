#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use dbdiag::{
    target::{Target, TrustSettings},
    vault::{self, VaultKey},
};
use std::{env, io::Write, path::PathBuf};

pub const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

pub fn key() -> VaultKey {
    VaultKey::new(KEY.to_vec()).unwrap()
}

/// Key file with owner-only permissions
pub fn key_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(KEY).unwrap();
    file
}

pub fn encrypt(password: &str) -> String {
    vault::encrypt_secret(password, &key()).unwrap()
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn target(id: &str, kind: &str) -> Target {
    Target {
        id: id.to_string(),
        kind: kind.to_string(),
        host: "127.0.0.1".to_string(),
        port: None,
        principal: String::new(),
        encrypted_secret: String::new(),
        database: String::new(),
        health_query: None,
        trust: TrustSettings::default(),
    }
}

pub fn sqlite_target(id: &str, path: &std::path::Path) -> Target {
    let mut t = target(id, "sqlite");
    t.database = path.display().to_string();
    t
}

/// A port nothing listens on
pub fn unreachable(id: &str, kind: &str) -> Target {
    let mut t = target(id, kind);
    t.port = Some(1);
    t
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

pub fn skip_if_no_postgres() -> bool {
    env::var("SKIP_POSTGRES_TESTS").is_ok()
}

pub fn skip_if_no_mariadb() -> bool {
    env::var("SKIP_MARIADB_TESTS").is_ok()
}

/// Target for the local PostgreSQL container, overridable with `TEST_POSTGRES_*`
pub fn postgres_target(password: &str) -> Target {
    let mut t = target("postgres", "postgres");
    t.host = env_or("TEST_POSTGRES_HOST", "localhost");
    t.port = env_or("TEST_POSTGRES_PORT", "5432").parse().ok();
    t.principal = env_or("TEST_POSTGRES_USER", "postgres");
    t.database = env_or("TEST_POSTGRES_DB", "testdb");
    t.encrypted_secret = encrypt(password);
    t.health_query = Some("SELECT 1".to_string());
    t
}

pub fn postgres_password() -> String {
    env_or("TEST_POSTGRES_PASSWORD", "secret")
}

/// Target for the local MariaDB container, overridable with `TEST_MARIADB_*`
pub fn mariadb_target(password: &str) -> Target {
    let mut t = target("mariadb", "mariadb");
    t.host = env_or("TEST_MARIADB_HOST", "localhost");
    t.port = env_or("TEST_MARIADB_PORT", "3306").parse().ok();
    t.principal = env_or("TEST_MARIADB_USER", "dbdiag");
    t.database = env_or("TEST_MARIADB_DB", "testdb");
    t.encrypted_secret = encrypt(password);
    t.health_query = Some("SELECT 1".to_string());
    t
}

pub fn mariadb_password() -> String {
    env_or("TEST_MARIADB_PASSWORD", "secret")
}
