//! Engine backends behind one contract
//!
//! Every backend follows the same life cycle: `connect` opens one session,
//! `probe` and `verify` run against it, and `release` closes it. Release is
//! idempotent and a no-op when nothing was opened.

pub mod dsn;
pub mod mongodb;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod sqlite;
pub mod sqlserver;

use crate::{
    target::{Kind, Target},
    tls::TrustPolicy,
    vault::Secret,
};
use async_trait::async_trait;
use std::fmt::Display;
use thiserror::Error;

pub use self::{
    mongodb::MongoBackend, mysql::MysqlBackend, oracle::OracleBackend,
    postgres::PostgresBackend, sqlite::SqliteBackend, sqlserver::SqlServerBackend,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("unsupported database type: {0:?}")]
    UnsupportedKind(String),

    #[error("{0}")]
    Connect(String),

    #[error("{0}")]
    Probe(String),

    #[error("{0}")]
    Verify(String),

    #[error("{0}")]
    Release(String),

    #[error("backend is not connected")]
    NotConnected,

    #[error("backend is already connected")]
    AlreadyConnected,
}

impl BackendError {
    pub(crate) fn connect(err: impl Display) -> Self {
        Self::Connect(err.to_string())
    }

    pub(crate) fn probe(err: impl Display) -> Self {
        Self::Probe(err.to_string())
    }

    pub(crate) fn verify(err: impl Display) -> Self {
        Self::Verify(err.to_string())
    }

    pub(crate) fn release(err: impl Display) -> Self {
        Self::Release(err.to_string())
    }
}

impl From<dsn::DsnError> for BackendError {
    fn from(err: dsn::DsnError) -> Self {
        Self::Connect(err.to_string())
    }
}

/// One connection session against a database engine
///
/// State machine: `Unconnected -> Connected -> Unconnected`. `probe` and
/// `verify` return [`BackendError::NotConnected`] outside the connected state.
#[async_trait]
pub trait Backend: Send {
    fn kind(&self) -> Kind;

    /// Open the session using the decrypted secret and resolved trust policy
    async fn connect(
        &mut self,
        target: &Target,
        secret: &Secret,
        policy: &TrustPolicy,
    ) -> Result<(), BackendError>;

    /// Lightweight liveness round trip
    async fn probe(&mut self) -> Result<(), BackendError>;

    /// Run a caller supplied health query
    async fn verify(&mut self, query: &str) -> Result<(), BackendError>;

    /// Close the session, safe to call any number of times
    async fn release(&mut self) -> Result<(), BackendError>;

    fn is_connected(&self) -> bool;
}

/// Creates backends from the `type` declared by a target
pub trait BackendFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns [`BackendError::UnsupportedKind`] when the kind is unknown
    fn create(&self, kind: &str) -> Result<Box<dyn Backend>, BackendError>;
}

/// Factory for the built-in engines
#[derive(Debug, Clone, Copy, Default)]
pub struct Registry;

impl BackendFactory for Registry {
    fn create(&self, kind: &str) -> Result<Box<dyn Backend>, BackendError> {
        create(kind)
    }
}

/// Create an unconnected backend for a kind
///
/// # Errors
///
/// Returns [`BackendError::UnsupportedKind`] when the kind is unknown
pub fn create(kind: &str) -> Result<Box<dyn Backend>, BackendError> {
    let kind = kind
        .parse::<Kind>()
        .map_err(|_| BackendError::UnsupportedKind(kind.to_string()))?;

    Ok(match kind {
        Kind::Postgres => Box::new(PostgresBackend::default()),
        Kind::Mysql => Box::new(MysqlBackend::default()),
        Kind::SqlServer => Box::new(SqlServerBackend::default()),
        Kind::Oracle => Box::new(OracleBackend::default()),
        Kind::Sqlite => Box::new(SqliteBackend::default()),
        Kind::MongoDb => Box::new(MongoBackend::default()),
    })
}
