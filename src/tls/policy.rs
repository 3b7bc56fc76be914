use super::{
    TlsMode, TrustError,
    material::{CertInfo, load_cert_chain, load_private_key, server_name_from_host},
    profile::{AnchorSource, ClientIdentitySupport, TrustProfile, Transport},
};
use crate::target::Target;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Inputs of a policy build, borrowed from a target definition
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustRequest<'a> {
    pub mode: Option<&'a str>,
    pub hostname: &'a str,
    pub root_cert: Option<&'a Path>,
    pub client_cert: Option<&'a Path>,
    pub client_key: Option<&'a Path>,
    pub wallet: Option<&'a Path>,
}

impl<'a> TrustRequest<'a> {
    #[must_use]
    pub fn from_target(target: &'a Target) -> Self {
        Self {
            mode: target.trust.mode.as_deref(),
            hostname: &target.host,
            root_cert: target.trust.root_cert.as_deref(),
            client_cert: target.trust.client_cert.as_deref(),
            client_key: target.trust.client_key.as_deref(),
            wallet: target.trust.wallet.as_deref(),
        }
    }
}

/// A parsed root certificate bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootBundle {
    pub path: PathBuf,
    pub certificates: Vec<CertInfo>,
}

/// Certificates used to validate the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum TrustAnchors {
    None,
    /// Bundled Mozilla roots
    System,
    Bundle(RootBundle),
    Wallet { path: PathBuf },
}

impl TrustAnchors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::System => webpki_roots::TLS_SERVER_ROOTS.is_empty(),
            Self::Bundle(bundle) => bundle.certificates.is_empty(),
            Self::Wallet { .. } => false,
        }
    }
}

/// Client certificate presented for mutual TLS
///
/// Only the file locations and certificate metadata are retained, the key is
/// validated at build time and read again by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientIdentity {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub chain: Vec<CertInfo>,
}

/// Resolved transport trust decision for one connection attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustPolicy {
    pub mode: TlsMode,
    pub encrypted: bool,
    pub verify_certificate: bool,
    pub anchors: TrustAnchors,
    /// Hostname the server certificate must match, set for verify-full
    pub peer_name: Option<String>,
    pub client_identity: Option<ClientIdentity>,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

impl TrustPolicy {
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            mode: TlsMode::Disable,
            encrypted: false,
            verify_certificate: false,
            anchors: TrustAnchors::None,
            peer_name: None,
            client_identity: None,
        }
    }

    /// Root bundle path, if the anchors come from a file
    #[must_use]
    pub fn root_cert_path(&self) -> Option<&Path> {
        match &self.anchors {
            TrustAnchors::Bundle(bundle) => Some(&bundle.path),
            _ => None,
        }
    }

    #[must_use]
    pub fn wallet_path(&self) -> Option<&Path> {
        match &self.anchors {
            TrustAnchors::Wallet { path } => Some(path),
            _ => None,
        }
    }

    #[must_use]
    pub const fn checks_peer_name(&self) -> bool {
        self.peer_name.is_some()
    }

    fn check_invariants(&self) -> Result<(), TrustError> {
        if self.peer_name.is_some() && self.anchors.is_empty() {
            return Err(TrustError::InvalidMaterial(
                "peer name check requested without trust anchors".to_string(),
            ));
        }
        if self.verify_certificate && !self.encrypted {
            return Err(TrustError::InvalidMaterial(
                "certificate verification requested on an unencrypted transport".to_string(),
            ));
        }
        Ok(())
    }
}

/// Build the trust policy for one attempt
///
/// # Errors
///
/// Returns [`TrustError::UnsupportedMode`] for an unknown mode and
/// [`TrustError::InvalidMaterial`] when certificate, key or wallet material
/// is incomplete, unreadable or not accepted by the engine
pub async fn build(
    request: &TrustRequest<'_>,
    profile: TrustProfile,
) -> Result<TrustPolicy, TrustError> {
    let mode = TlsMode::from_declared(request.mode)?;

    let identity_paths = match (request.client_cert, request.client_key) {
        (Some(cert), Some(key)) => Some((cert, key)),
        (None, None) => None,
        _ => {
            return Err(TrustError::InvalidMaterial(
                "both client_cert_path and client_key_path must be set for mTLS".to_string(),
            ));
        }
    };

    if profile.transport == Transport::Local {
        if mode.is_enabled() {
            debug!(mode = %mode, kind = profile.name, "tls mode has no effect on a local database");
        }
        return Ok(TrustPolicy::disabled());
    }

    if !mode.is_enabled() {
        return Ok(TrustPolicy::disabled());
    }

    let client_identity = match identity_paths {
        Some((cert, key)) => Some(load_client_identity(cert, key, profile).await?),
        None => None,
    };

    if mode == TlsMode::Require {
        return Ok(TrustPolicy {
            mode,
            encrypted: true,
            verify_certificate: false,
            anchors: TrustAnchors::None,
            peer_name: None,
            client_identity,
        });
    }

    let anchors = match profile.anchors {
        AnchorSource::Wallet => wallet_anchors(request, mode, profile).await?,
        AnchorSource::Files => match request.root_cert {
            Some(path) => {
                let (_, certificates) = load_cert_chain(path).await?;
                TrustAnchors::Bundle(RootBundle {
                    path: path.to_path_buf(),
                    certificates,
                })
            }
            None => TrustAnchors::System,
        },
    };

    let peer_name = if mode == TlsMode::VerifyFull {
        server_name_from_host(request.hostname)?;
        Some(request.hostname.to_string())
    } else {
        None
    };

    let policy = TrustPolicy {
        mode,
        encrypted: true,
        verify_certificate: true,
        anchors,
        peer_name,
        client_identity,
    };
    policy.check_invariants()?;

    Ok(policy)
}

async fn wallet_anchors(
    request: &TrustRequest<'_>,
    mode: TlsMode,
    profile: TrustProfile,
) -> Result<TrustAnchors, TrustError> {
    if request.root_cert.is_some() {
        return Err(TrustError::InvalidMaterial(format!(
            "{} reads trust anchors from the wallet, root_cert_path is not supported",
            profile.name
        )));
    }

    let path = request.wallet.ok_or_else(|| {
        TrustError::InvalidMaterial(format!(
            "tls_mode {mode} requires wallet_path for {}",
            profile.name
        ))
    })?;

    fs::metadata(path).await.map_err(|e| {
        TrustError::InvalidMaterial(format!("wallet {} is not accessible: {e}", path.display()))
    })?;

    Ok(TrustAnchors::Wallet {
        path: path.to_path_buf(),
    })
}

async fn load_client_identity(
    cert: &Path,
    key: &Path,
    profile: TrustProfile,
) -> Result<ClientIdentity, TrustError> {
    match profile.client_identity {
        ClientIdentitySupport::SeparateFiles => {}
        ClientIdentitySupport::CombinedFile => {
            if cert != key {
                return Err(TrustError::InvalidMaterial(format!(
                    "{} needs certificate and key in one PEM file, set client_cert_path and client_key_path to the same file",
                    profile.name
                )));
            }
        }
        ClientIdentitySupport::Wallet => {
            return Err(TrustError::InvalidMaterial(format!(
                "{} takes its client certificate from the wallet, remove client_cert_path and client_key_path",
                profile.name
            )));
        }
        ClientIdentitySupport::Unsupported => {
            return Err(TrustError::InvalidMaterial(format!(
                "client certificates are not supported for {}",
                profile.name
            )));
        }
    }

    let (_, chain) = load_cert_chain(cert).await?;
    load_private_key(key).await?;

    Ok(ClientIdentity {
        cert_path: cert.to_path_buf(),
        key_path: key.to_path_buf(),
        chain,
    })
}
