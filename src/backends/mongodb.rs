//! Document store
//!
//! The client connects lazily, so `connect` runs `hello` to force server
//! selection and authentication. Health queries are JSON command documents
//! run against the target database, e.g. `{"listCollections": 1}`.
//!
//! The rustls stack always checks the host name once validation is on, which
//! makes verify-ca behave like verify-full for this engine.

use super::{Backend, BackendError};
use crate::{
    target::{Kind, Target},
    tls::TrustPolicy,
    vault::Secret,
};
use async_trait::async_trait;
use mongodb::{
    Client,
    bson::{Document, doc, to_document},
    options::{ClientOptions, Credential, ServerAddress, Tls, TlsOptions},
};
use tracing::debug;

const ADMIN_DB: &str = "admin";

fn tls(policy: &TrustPolicy) -> Tls {
    if !policy.encrypted {
        return Tls::Disabled;
    }

    let mut options = TlsOptions::default();
    options.allow_invalid_certificates = Some(!policy.verify_certificate);
    options.ca_file_path = policy.root_cert_path().map(Into::into);
    options.cert_key_file_path = policy
        .client_identity
        .as_ref()
        .map(|identity| identity.cert_path.clone());

    Tls::Enabled(options)
}

/// Driver options for the target, no I/O
#[must_use]
pub fn client_options(target: &Target, secret: &Secret, policy: &TrustPolicy) -> ClientOptions {
    let address = ServerAddress::Tcp {
        host: target.host.clone(),
        port: Some(target.port_or(Kind::MongoDb)),
    };

    let mut options = ClientOptions::builder().hosts(vec![address]).build();
    options.app_name = Some("dbdiag".to_string());
    options.tls = Some(tls(policy));

    if !target.principal.is_empty() {
        let mut credential = Credential::default();
        credential.username = Some(target.principal.clone());
        credential.password = Some(secret.expose().to_string());
        options.credential = Some(credential);
    }

    options
}

/// Parse a health query into a command document
pub(crate) fn parse_command(query: &str) -> Result<Document, BackendError> {
    let value: serde_json::Value = serde_json::from_str(query).map_err(|e| {
        BackendError::Verify(format!("health query is not a JSON command document: {e}"))
    })?;

    if !value.is_object() {
        return Err(BackendError::Verify(
            "health query must be a JSON object, e.g. {\"ping\": 1}".to_string(),
        ));
    }

    to_document(&value).map_err(BackendError::verify)
}

#[derive(Default)]
pub struct MongoBackend {
    client: Option<Client>,
    database: String,
}

#[async_trait]
impl Backend for MongoBackend {
    fn kind(&self) -> Kind {
        Kind::MongoDb
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

        debug!(host = %target.host, user = %target.principal, "connecting to mongodb");

        let client = Client::with_options(client_options(target, secret, policy))
            .map_err(BackendError::connect)?;

        if let Err(err) = client.database(ADMIN_DB).run_command(doc! { "hello": 1 }).await {
            client.shutdown().await;
            return Err(BackendError::connect(err));
        }

        self.database = if target.database.is_empty() {
            ADMIN_DB.to_string()
        } else {
            target.database.clone()
        };
        self.client = Some(client);

        Ok(())
    }

    async fn probe(&mut self) -> Result<(), BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::NotConnected)?;
        client
            .database(ADMIN_DB)
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(BackendError::probe)
    }

    async fn verify(&mut self, query: &str) -> Result<(), BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::NotConnected)?;
        let command = parse_command(query)?;
        client
            .database(&self.database)
            .run_command(command)
            .await
            .map(|_| ())
            .map_err(BackendError::verify)
    }

    async fn release(&mut self) -> Result<(), BackendError> {
        if let Some(client) = self.client.take() {
            client.shutdown().await;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::{
        target::TrustSettings,
        tls::{ClientIdentity, TlsMode, TrustAnchors},
    };
    use std::path::PathBuf;

    fn target() -> Target {
        Target {
            id: "events".to_string(),
            kind: "mongodb".to_string(),
            host: "mongo.example.com".to_string(),
            port: None,
            principal: "events".to_string(),
            encrypted_secret: String::new(),
            database: "events".to_string(),
            health_query: None,
            trust: TrustSettings::default(),
        }
    }

    #[test]
    fn test_client_options_plain() {
        let options = client_options(
            &target(),
            &Secret::new("pw".to_string()),
            &TrustPolicy::disabled(),
        );
        assert_eq!(
            options.hosts,
            vec![ServerAddress::Tcp {
                host: "mongo.example.com".to_string(),
                port: Some(27017),
            }]
        );
        assert!(matches!(options.tls, Some(Tls::Disabled)));
        let credential = options.credential.unwrap();
        assert_eq!(credential.username.as_deref(), Some("events"));
        assert_eq!(credential.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_client_options_anonymous() {
        let mut t = target();
        t.principal = String::new();
        let options = client_options(&t, &Secret::default(), &TrustPolicy::disabled());
        assert!(options.credential.is_none());
    }

    #[test]
    fn test_tls_require_skips_validation() {
        let policy = TrustPolicy {
            mode: TlsMode::Require,
            encrypted: true,
            verify_certificate: false,
            anchors: TrustAnchors::None,
            peer_name: None,
            client_identity: Some(ClientIdentity {
                cert_path: PathBuf::from("/etc/mongo/client.pem"),
                key_path: PathBuf::from("/etc/mongo/client.pem"),
                chain: Vec::new(),
            }),
        };
        let Tls::Enabled(options) = tls(&policy) else {
            panic!("tls should be enabled");
        };
        assert_eq!(options.allow_invalid_certificates, Some(true));
        assert_eq!(options.ca_file_path, None);
        assert_eq!(
            options.cert_key_file_path,
            Some(PathBuf::from("/etc/mongo/client.pem"))
        );
    }

    #[test]
    fn test_tls_verify_uses_system_roots() {
        let policy = TrustPolicy {
            mode: TlsMode::VerifyCA,
            encrypted: true,
            verify_certificate: true,
            anchors: TrustAnchors::System,
            peer_name: None,
            client_identity: None,
        };
        let Tls::Enabled(options) = tls(&policy) else {
            panic!("tls should be enabled");
        };
        assert_eq!(options.allow_invalid_certificates, Some(false));
        assert_eq!(options.ca_file_path, None);
    }

    #[test]
    fn test_parse_command() {
        let command = parse_command(r#"{"listCollections": 1, "nameOnly": true}"#).unwrap();
        assert_eq!(command.keys().next().map(String::as_str), Some("listCollections"));

        assert!(matches!(parse_command("SELECT 1"), Err(BackendError::Verify(_))));
        assert!(matches!(parse_command("[1, 2]"), Err(BackendError::Verify(_))));
        assert!(matches!(parse_command("1"), Err(BackendError::Verify(_))));
    }
}
