use crate::error::{Error, Result};
use tracing::Level;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Map `-v` occurrences and `-q` to a log level
#[must_use]
pub const fn level(verbose: u8, quiet: bool) -> Level {
    match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        (false, _) => Level::TRACE,
    }
}

/// Initialize logging to stderr, `RUST_LOG` takes precedence over the flags
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level(verbose, quiet)).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
