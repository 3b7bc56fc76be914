//! SQL Server over TDS
//!
//! The TDS driver has no ping request, so `probe` sends `SELECT 1` as a batch.
//! Once certificate validation is on the driver always checks the host name,
//! which makes verify-ca behave like verify-full for this engine.

use super::{Backend, BackendError, dsn::Descriptor};
use crate::{
    target::{Kind, Target},
    tls::{TlsMode, TrustPolicy},
    vault::Secret,
};
use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

const PROBE_QUERY: &str = "SELECT 1";

pub(crate) fn trust_params(policy: &TrustPolicy) -> Vec<(&'static str, String)> {
    match policy.mode {
        TlsMode::Disable => vec![("encrypt", "false".to_string())],
        TlsMode::Require => vec![
            ("encrypt", "true".to_string()),
            ("trustservercertificate", "true".to_string()),
        ],
        TlsMode::VerifyCA | TlsMode::VerifyFull => {
            let mut params = vec![
                ("encrypt", "true".to_string()),
                ("trustservercertificate", "false".to_string()),
            ];
            if let Some(root) = policy.root_cert_path() {
                params.push((
                    "trustservercertificateca",
                    root.to_string_lossy().into_owned(),
                ));
            }
            params
        }
    }
}

#[must_use]
pub fn descriptor(target: &Target, secret: &Secret, policy: &TrustPolicy) -> Descriptor {
    Descriptor::new(
        "sqlserver",
        &target.host,
        target.port_or(Kind::SqlServer),
        &target.principal,
        secret,
        &target.database,
    )
    .with_params(trust_params(policy))
}

/// Translate a descriptor into the driver configuration
#[must_use]
pub fn config(descriptor: &Descriptor) -> Config {
    let mut config = Config::new();
    config.host(descriptor.host());
    config.port(descriptor.port());
    config.application_name("dbdiag");
    config.authentication(AuthMethod::sql_server(
        descriptor.principal(),
        descriptor.secret().expose(),
    ));

    if !descriptor.database().is_empty() {
        config.database(descriptor.database());
    }

    if descriptor.param("encrypt") == Some("true") {
        config.encryption(EncryptionLevel::Required);
    } else {
        config.encryption(EncryptionLevel::NotSupported);
    }

    // trust_cert and trust_cert_ca are mutually exclusive
    if descriptor.param("trustservercertificate") == Some("true") {
        config.trust_cert();
    } else if let Some(ca) = descriptor.param("trustservercertificateca") {
        config.trust_cert_ca(ca);
    }

    config
}

#[derive(Default)]
pub struct SqlServerBackend {
    client: Option<Client<Compat<TcpStream>>>,
}

#[async_trait]
impl Backend for SqlServerBackend {
    fn kind(&self) -> Kind {
        Kind::SqlServer
    }

    async fn connect(
        &mut self,
        target: &Target,
        secret: &Secret,
        policy: &TrustPolicy,
    ) -> Result<(), BackendError> {
        if self.client.is_some() {
            return Err(BackendError::AlreadyConnected);
        }

        let descriptor = descriptor(target, secret, policy);
        debug!(dsn = %descriptor.redacted(), "connecting to sqlserver");

        let config = config(&descriptor);
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(BackendError::connect)?;
        tcp.set_nodelay(true).map_err(BackendError::connect)?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(BackendError::connect)?;
        self.client = Some(client);

        Ok(())
    }

    async fn probe(&mut self) -> Result<(), BackendError> {
        let client = self.client.as_mut().ok_or(BackendError::NotConnected)?;
        client
            .simple_query(PROBE_QUERY)
            .await
            .map_err(BackendError::probe)?
            .into_results()
            .await
            .map(|_| ())
            .map_err(BackendError::probe)
    }

    async fn verify(&mut self, query: &str) -> Result<(), BackendError> {
        let client = self.client.as_mut().ok_or(BackendError::NotConnected)?;
        client
            .simple_query(query)
            .await
            .map_err(BackendError::verify)?
            .into_results()
            .await
            .map(|_| ())
            .map_err(BackendError::verify)
    }

    async fn release(&mut self) -> Result<(), BackendError> {
        match self.client.take() {
            Some(client) => client.close().await.map_err(BackendError::release),
            None => Ok(()),
        }
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }
}
