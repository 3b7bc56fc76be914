use super::TrustError;
use chrono::{DateTime, Utc};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls_pemfile::{certs, private_key};
use serde::Serialize;
use std::{
    io::Cursor,
    net::IpAddr,
    path::Path,
    sync::OnceLock,
};
use tokio::fs;
use tracing::{debug, warn};
use x509_parser::prelude::{FromDer, X509Certificate};

static CRYPTO_PROVIDER_INIT: OnceLock<()> = OnceLock::new();

/// Ensure the rustls crypto provider is initialized
///
/// Drivers that pull in rustls with more than one provider refuse to build a
/// client config until a process default exists. Safe to call repeatedly.
pub fn ensure_crypto_provider() {
    CRYPTO_PROVIDER_INIT.get_or_init(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed");
        }
    });
}

/// Subject and validity of a parsed certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertInfo {
    pub subject: String,
    pub issuer: String,
    pub not_after: DateTime<Utc>,
    /// Days until expiration (negative if expired)
    pub expiry_days: i64,
}

/// Load every certificate of a PEM file, each must be valid X.509
pub(crate) async fn load_cert_chain(
    path: &Path,
) -> Result<(Vec<CertificateDer<'static>>, Vec<CertInfo>), TrustError> {
    let data = fs::read(path).await.map_err(|e| {
        TrustError::InvalidMaterial(format!(
            "failed to read certificate {}: {e}",
            path.display()
        ))
    })?;
    let mut reader = Cursor::new(data);
    let parsed = certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            TrustError::InvalidMaterial(format!(
                "invalid certificate PEM in {}: {e}",
                path.display()
            ))
        })?;

    if parsed.is_empty() {
        return Err(TrustError::InvalidMaterial(format!(
            "no certificates found in {}",
            path.display()
        )));
    }

    let infos = parsed
        .iter()
        .map(|der| {
            extract_cert_info(der.as_ref()).map_err(|e| {
                TrustError::InvalidMaterial(format!("{} in {}", e, path.display()))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for info in &infos {
        if info.expiry_days < 0 {
            warn!(
                path = %path.display(),
                subject = %info.subject,
                not_after = %info.not_after,
                "certificate has expired"
            );
        }
    }

    Ok((parsed, infos))
}

/// Load the first private key of a PEM file
pub(crate) async fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TrustError> {
    let data = zeroize::Zeroizing::new(fs::read(path).await.map_err(|e| {
        TrustError::InvalidMaterial(format!(
            "failed to read private key {}: {e}",
            path.display()
        ))
    })?);

    let mut reader = Cursor::new(data.as_slice());
    private_key(&mut reader)
        .map_err(|e| {
            TrustError::InvalidMaterial(format!(
                "invalid private key PEM in {}: {e}",
                path.display()
            ))
        })?
        .ok_or_else(|| {
            TrustError::InvalidMaterial(format!("no private key found in {}", path.display()))
        })
}

/// Validate a host as a TLS server name (DNS name or IP address)
pub(crate) fn server_name_from_host(host: &str) -> Result<ServerName<'static>, TrustError> {
    host.parse::<IpAddr>().map_or_else(
        |_| {
            ServerName::try_from(host.to_string()).map_err(|_| {
                TrustError::InvalidMaterial(format!("invalid server name for verify-full: {host:?}"))
            })
        },
        |ip| Ok(ServerName::from(ip)),
    )
}

/// Extract certificate metadata (subject, issuer, expiry) from DER-encoded certificate
fn extract_cert_info(cert_der: &[u8]) -> Result<CertInfo, String> {
    let (_, cert) =
        X509Certificate::from_der(cert_der).map_err(|e| format!("failed to parse certificate: {e}"))?;

    let raw = cert.validity().not_after.to_datetime();
    let not_after = DateTime::<Utc>::from_timestamp(raw.unix_timestamp(), raw.nanosecond())
        .ok_or_else(|| "invalid certificate expiry timestamp".to_string())?;

    Ok(CertInfo {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        not_after,
        expiry_days: (not_after - Utc::now()).num_days(),
    })
}
