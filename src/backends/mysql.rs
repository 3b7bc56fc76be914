use super::{Backend, BackendError, dsn::Descriptor};
use crate::{
    target::{Kind, Target},
    tls::{TlsMode, TrustPolicy},
    vault::Secret,
};
use async_trait::async_trait;
use sqlx::{
    ConnectOptions, Connection, Executor,
    mysql::{MySqlConnectOptions, MySqlConnection},
};
use std::str::FromStr;
use tracing::debug;

const fn ssl_mode(mode: TlsMode) -> &'static str {
    match mode {
        TlsMode::Disable => "DISABLED",
        TlsMode::Require => "REQUIRED",
        TlsMode::VerifyCA => "VERIFY_CA",
        TlsMode::VerifyFull => "VERIFY_IDENTITY",
    }
}

pub(crate) fn trust_params(policy: &TrustPolicy) -> Vec<(&'static str, String)> {
    let mut params = vec![("ssl-mode", ssl_mode(policy.mode).to_string())];

    if let Some(root) = policy.root_cert_path() {
        params.push(("ssl-ca", root.to_string_lossy().into_owned()));
    }

    if let Some(identity) = &policy.client_identity {
        params.push(("ssl-cert", identity.cert_path.to_string_lossy().into_owned()));
        params.push(("ssl-key", identity.key_path.to_string_lossy().into_owned()));
    }

    params
}

#[must_use]
pub fn descriptor(target: &Target, secret: &Secret, policy: &TrustPolicy) -> Descriptor {
    Descriptor::new(
        "mysql",
        &target.host,
        target.port_or(Kind::Mysql),
        &target.principal,
        secret,
        &target.database,
    )
    .with_params(trust_params(policy))
}

/// Run a statement through the executor of the concrete connection type
async fn execute_raw(conn: &mut MySqlConnection, query: &str) -> Result<(), sqlx::Error> {
    conn.execute(sqlx::raw_sql(query)).await.map(|_| ())
}

#[derive(Default)]
pub struct MysqlBackend {
    conn: Option<MySqlConnection>,
}

#[async_trait]
impl Backend for MysqlBackend {
    fn kind(&self) -> Kind {
        Kind::Mysql
    }

    async fn connect(
        &mut self,
        target: &Target,
        secret: &Secret,
        policy: &TrustPolicy,
    ) -> Result<(), BackendError> {
        if self.conn.is_some() {
            return Err(BackendError::AlreadyConnected);
        }

        let descriptor = descriptor(target, secret, policy);
        debug!(dsn = %descriptor.redacted(), "connecting to mysql");

        let options = MySqlConnectOptions::from_str(&descriptor.to_url()?)
            .map_err(BackendError::connect)?;
        let conn = options.connect().await.map_err(BackendError::connect)?;
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
