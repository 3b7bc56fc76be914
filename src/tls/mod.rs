//! Transport trust policy
//!
//! Maps the declared `tls_mode` of a target to a concrete decision: whether
//! the channel is encrypted, which anchors validate the server, whether the
//! host name is checked and which client certificate is presented.
//!
//! # Module Organization
//!
//! - `config` - TLS modes
//! - `material` - PEM and X.509 loading
//! - `profile` - per-kind capabilities
//! - `policy` - the policy builder
//!
//! # Example
//!
//! ```rust,ignore
//! use dbdiag::tls::{TrustProfile, TrustRequest, build};
//!
//! let policy = build(&TrustRequest::from_target(&target), TrustProfile::for_kind(kind)).await?;
//! ```

pub mod config;
pub mod material;
pub mod policy;
pub mod profile;

use thiserror::Error;

pub use config::TlsMode;
pub use material::{CertInfo, ensure_crypto_provider};
pub use policy::{ClientIdentity, RootBundle, TrustAnchors, TrustPolicy, TrustRequest, build};
pub use profile::TrustProfile;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrustError {
    #[error("unsupported tls_mode: {0:?}")]
    UnsupportedMode(String),

    #[error("invalid trust material: {0}")]
    InvalidMaterial(String),
}
