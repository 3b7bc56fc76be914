//! Connection descriptor shared by the URL based relational engines
//!
//! Building a descriptor performs no I/O: the same inputs always render the
//! same URL, with parameters kept in insertion order.

use crate::vault::Secret;
use std::{fmt, net::IpAddr};
use thiserror::Error;
use url::Url;
use zeroize::Zeroizing;

const REDACTED: &str = "****";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DsnError {
    #[error("host is empty")]
    MissingHost,

    #[error("invalid host {0:?}")]
    InvalidHost(String),

    #[error("invalid user name {0:?}")]
    InvalidPrincipal(String),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

#[derive(Clone)]
pub struct Descriptor {
    scheme: &'static str,
    host: String,
    port: u16,
    principal: String,
    secret: Secret,
    database: String,
    params: Vec<(&'static str, String)>,
}

impl Descriptor {
    #[must_use]
    pub fn new(
        scheme: &'static str,
        host: &str,
        port: u16,
        principal: &str,
        secret: &Secret,
        database: &str,
    ) -> Self {
        Self {
            scheme,
            host: host.to_string(),
            port,
            principal: principal.to_string(),
            secret: secret.clone(),
            database: database.to_string(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_params<I>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, String)>,
    {
        self.params.extend(params);
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    #[must_use]
    pub const fn secret(&self) -> &Secret {
        &self.secret
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    #[must_use]
    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// First value of a parameter
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Render the connection URL, including the secret
    ///
    /// # Errors
    ///
    /// Returns an error when the host or user name cannot be represented
    pub fn to_url(&self) -> Result<Zeroizing<String>, DsnError> {
        let url = self.build(Some(self.secret.expose()))?;
        Ok(Zeroizing::new(url.into()))
    }

    /// URL with the secret masked, suitable for logs
    #[must_use]
    pub fn redacted(&self) -> String {
        let mask = (!self.secret.is_empty()).then_some(REDACTED);
        self.build(mask).map_or_else(
            |_| format!("{}://{}:{}/{}", self.scheme, self.host, self.port, self.database),
            String::from,
        )
    }

    fn build(&self, password: Option<&str>) -> Result<Url, DsnError> {
        if self.host.is_empty() {
            return Err(DsnError::MissingHost);
        }

        let mut url = Url::parse(&format!("{}://localhost", self.scheme))?;

        match self.host.parse::<IpAddr>() {
            Ok(ip) => url
                .set_ip_host(ip)
                .map_err(|()| DsnError::InvalidHost(self.host.clone()))?,
            Err(_) => url
                .set_host(Some(&self.host))
                .map_err(|_| DsnError::InvalidHost(self.host.clone()))?,
        }

        url.set_port(Some(self.port))
            .map_err(|()| DsnError::InvalidHost(self.host.clone()))?;

        if !self.principal.is_empty() {
            url.set_username(&self.principal)
                .map_err(|()| DsnError::InvalidPrincipal(self.principal.clone()))?;
        }

        if let Some(password) = password.filter(|p| !p.is_empty()) {
            url.set_password(Some(password))
                .map_err(|()| DsnError::InvalidPrincipal(self.principal.clone()))?;
        }

        if !self.database.is_empty() {
            url.set_path(&self.database);
        }

        if !self.params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &self.params {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Descriptor").field(&self.redacted()).finish()
    }
}
