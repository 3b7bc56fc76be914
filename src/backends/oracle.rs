//! Oracle through ODPI-C
//!
//! The driver is blocking, every call runs on the blocking pool with the
//! connection moved in and handed back. A step abandoned by the attempt deadline
//! leaves the connection with the blocking task, which drops (closes) it.
//!
//! Oracle Net cannot encrypt without validating the server, so `require`
//! maps to `tcps` with distinguished name matching turned off.

use super::{Backend, BackendError};
use crate::{
    target::{Kind, Target},
    tls::{TlsMode, TrustPolicy},
    vault::Secret,
};
use async_trait::async_trait;
use oracle::Connection;
use tokio::task::spawn_blocking;
use tracing::debug;

/// Easy Connect Plus descriptor for the target
#[must_use]
pub fn connect_string(target: &Target, policy: &TrustPolicy) -> String {
    let address = format!(
        "{}:{}/{}",
        target.host,
        target.port_or(Kind::Oracle),
        target.database
    );

    let mut params = Vec::new();
    if let Some(wallet) = policy.wallet_path() {
        params.push(format!("wallet_location={}", wallet.display()));
    }

    match policy.mode {
        TlsMode::Disable => return format!("//{address}"),
        TlsMode::Require | TlsMode::VerifyCA => params.push("ssl_server_dn_match=off".to_string()),
        TlsMode::VerifyFull => params.push("ssl_server_dn_match=on".to_string()),
    }

    format!("tcps://{address}?{}", params.join("&"))
}

/// Connect failure text, noting that `require` still validates the server
/// certificate against the wallet
fn connect_cause(mode: TlsMode, err: impl std::fmt::Display) -> String {
    let cause = err.to_string();
    let certificate = cause.contains("ORA-29024") || cause.to_lowercase().contains("certificate");
    if mode == TlsMode::Require && certificate {
        format!(
            "{cause} (oracle require mode still validates the server certificate against the wallet)"
        )
    } else {
        cause
    }
}

#[derive(Default)]
pub struct OracleBackend {
    conn: Option<Connection>,
}

impl OracleBackend {
    async fn blocking<F>(&mut self, step: fn(String) -> BackendError, f: F) -> Result<(), BackendError>
    where
        F: FnOnce(&Connection) -> oracle::Result<()> + Send + 'static,
    {
        let conn = self.conn.take().ok_or(BackendError::NotConnected)?;
        let (conn, result) = spawn_blocking(move || {
            let result = f(&conn);
            (conn, result)
        })
        .await
        .map_err(|e| step(format!("oracle worker failed: {e}")))?;
        self.conn = Some(conn);

        result.map_err(|e| step(e.to_string()))
    }
}

#[async_trait]
impl Backend for OracleBackend {
    fn kind(&self) -> Kind {
        Kind::Oracle
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

        let connect_string = connect_string(target, policy);
        debug!(connect_string = %connect_string, user = %target.principal, "connecting to oracle");

        let mode = policy.mode;
        let principal = target.principal.clone();
        let secret = secret.clone();
        let conn = spawn_blocking(move || {
            Connection::connect(principal, secret.expose(), connect_string)
        })
        .await
        .map_err(BackendError::connect)?
        .map_err(|e| BackendError::connect(connect_cause(mode, e)))?;
        self.conn = Some(conn);

        Ok(())
    }

    async fn probe(&mut self) -> Result<(), BackendError> {
        self.blocking(BackendError::Probe, Connection::ping).await
    }

    async fn verify(&mut self, query: &str) -> Result<(), BackendError> {
        let query = query.to_string();
        self.blocking(BackendError::Verify, move |conn| {
            conn.execute(&query, &[]).map(|_| ())
        })
        .await
    }

    async fn release(&mut self) -> Result<(), BackendError> {
        match self.conn.take() {
            Some(conn) => spawn_blocking(move || conn.close())
                .await
                .map_err(BackendError::release)?
                .map_err(BackendError::release),
            None => Ok(()),
        }
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{target::TrustSettings, tls::TrustAnchors};
    use std::path::PathBuf;

    fn target() -> Target {
        Target {
            id: "ledger".to_string(),
            kind: "oracle".to_string(),
            host: "ora.example.com".to_string(),
            port: None,
            principal: "ledger".to_string(),
            encrypted_secret: String::new(),
            database: "LEDGER".to_string(),
            health_query: Some("SELECT 1 FROM dual".to_string()),
            trust: TrustSettings::default(),
        }
    }

    fn policy(mode: TlsMode, wallet: Option<&str>) -> TrustPolicy {
        TrustPolicy {
            mode,
            encrypted: mode.is_enabled(),
            verify_certificate: mode.verifies_certificate(),
            anchors: wallet.map_or(TrustAnchors::None, |p| TrustAnchors::Wallet {
                path: PathBuf::from(p),
            }),
            peer_name: (mode == TlsMode::VerifyFull).then(|| "ora.example.com".to_string()),
            client_identity: None,
        }
    }

    #[test]
    fn test_connect_string_disable() {
        assert_eq!(
            connect_string(&target(), &policy(TlsMode::Disable, None)),
            "//ora.example.com:1521/LEDGER"
        );
    }

    #[test]
    fn test_connect_string_require() {
        assert_eq!(
            connect_string(&target(), &policy(TlsMode::Require, None)),
            "tcps://ora.example.com:1521/LEDGER?ssl_server_dn_match=off"
        );
    }

    #[test]
    fn test_connect_string_verify() {
        assert_eq!(
            connect_string(&target(), &policy(TlsMode::VerifyCA, Some("/etc/oracle/wallet"))),
            "tcps://ora.example.com:1521/LEDGER?wallet_location=/etc/oracle/wallet&ssl_server_dn_match=off"
        );
        assert_eq!(
            connect_string(&target(), &policy(TlsMode::VerifyFull, Some("/etc/oracle/wallet"))),
            "tcps://ora.example.com:1521/LEDGER?wallet_location=/etc/oracle/wallet&ssl_server_dn_match=on"
        );
    }

    #[test]
    fn test_require_certificate_failure_cause() {
        let cause = connect_cause(TlsMode::Require, "ORA-29024: Certificate validation failure");
        assert!(cause.starts_with("ORA-29024"));
        assert!(cause.contains("require mode still validates the server certificate"));

        let cause = connect_cause(TlsMode::VerifyCA, "ORA-29024: Certificate validation failure");
        assert_eq!(cause, "ORA-29024: Certificate validation failure");

        let cause = connect_cause(TlsMode::Require, "ORA-12541: TNS:no listener");
        assert_eq!(cause, "ORA-12541: TNS:no listener");
    }
}
