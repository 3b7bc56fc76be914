use crate::{
    config::ConfigError,
    metrics::MetricsError,
    vault::{KeyError, VaultError},
};
use thiserror::Error;

/// Failures that stop the run before any target is checked
///
/// Per-target failures never surface here, they become an
/// [`Outcome`](crate::outcome::Outcome) instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error("failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
