//! Embedded file database
//!
//! The database name is the file path. Host, port, credentials and the trust
//! policy are ignored and a missing file is a connect failure, never created.

use super::{Backend, BackendError};
use crate::{
    target::{Kind, Target},
    tls::TrustPolicy,
    vault::Secret,
};
use async_trait::async_trait;
use sqlx::{
    ConnectOptions, Connection, Executor,
    sqlite::{SqliteConnectOptions, SqliteConnection},
};
use tracing::debug;

#[must_use]
pub fn connect_options(target: &Target) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(&target.database)
        .create_if_missing(false)
}

/// Run a statement through the executor of the concrete connection type
async fn execute_raw(conn: &mut SqliteConnection, query: &str) -> Result<(), sqlx::Error> {
    conn.execute(sqlx::raw_sql(query)).await.map(|_| ())
}

#[derive(Default)]
pub struct SqliteBackend {
    conn: Option<SqliteConnection>,
}

#[async_trait]
impl Backend for SqliteBackend {
    fn kind(&self) -> Kind {
        Kind::Sqlite
    }

    async fn connect(
        &mut self,
        target: &Target,
        _secret: &Secret,
        _policy: &TrustPolicy,
    ) -> Result<(), BackendError> {
        if self.conn.is_some() {
            return Err(BackendError::AlreadyConnected);
        }

        if target.database.is_empty() {
            return Err(BackendError::Connect(
                "sqlite database path (name) is empty".to_string(),
            ));
        }

        debug!(path = %target.database, "opening sqlite database");
        let conn = connect_options(target)
            .connect()
            .await
            .map_err(BackendError::connect)?;
        self.conn = Some(conn);

        Ok(())
    }

    async fn probe(&mut self) -> Result<(), BackendError> {
        let conn = self.conn.as_mut().ok_or(BackendError::NotConnected)?;
        conn.ping().await.map_err(BackendError::probe)
    }

    async fn verify(&mut self, query: &str) -> Result<(), BackendError> {
        let conn = self.conn.as_mut().ok_or(BackendError::NotConnected)?;
        execute_raw(conn, query).await.map_err(BackendError::verify)
    }

    async fn release(&mut self) -> Result<(), BackendError> {
        match self.conn.take() {
            Some(conn) => conn.close().await.map_err(BackendError::release),
            None => Ok(()),
        }
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }
}
