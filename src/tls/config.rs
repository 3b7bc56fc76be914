use super::TrustError;
use serde::Serialize;
use std::{fmt, str::FromStr};

/// TLS/SSL mode for database connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TlsMode {
    /// No TLS encryption
    #[default]
    Disable,
    /// TLS required, but no certificate verification
    Require,
    /// Verify server certificate against CA
    #[serde(rename = "verify-ca")]
    VerifyCA,
    /// Verify certificate and hostname
    VerifyFull,
}

impl FromStr for TlsMode {
    type Err = TrustError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disable" => Ok(Self::Disable),
            "require" => Ok(Self::Require),
            "verify-ca" => Ok(Self::VerifyCA),
            "verify-full" => Ok(Self::VerifyFull),
            _ => Err(TrustError::UnsupportedMode(s.to_string())),
        }
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TlsMode {
    /// Parse the mode declared on a target, where unset or empty means disable
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::UnsupportedMode`] for any other unknown value
    pub fn from_declared(declared: Option<&str>) -> Result<Self, TrustError> {
        match declared {
            None | Some("") => Ok(Self::Disable),
            Some(mode) => mode.parse(),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disable => "disable",
            Self::Require => "require",
            Self::VerifyCA => "verify-ca",
            Self::VerifyFull => "verify-full",
        }
    }

    /// Check if TLS is enabled
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disable)
    }

    /// Check if the server certificate is validated
    #[must_use]
    pub const fn verifies_certificate(&self) -> bool {
        matches!(self, Self::VerifyCA | Self::VerifyFull)
    }
}
