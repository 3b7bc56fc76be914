use crate::{
    check::{self, CheckOptions},
    config::Config,
    error::Error,
    metrics,
    outcome::Report,
    report::{self, Format},
    tls,
    vault::{KeySource, VaultKey},
};
use anyhow::{Context, Result};
use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub config: PathBuf,
    /// Check only this target, all targets when `None`
    pub db: Option<String>,
    pub key: KeySource,
    pub timeout: Duration,
    pub concurrency: usize,
    pub format: Format,
    pub metrics_file: Option<PathBuf>,
    pub strict: bool,
}

impl CheckRequest {
    /// Whether the report should turn into a failing exit status
    #[must_use]
    pub fn fails(&self, report: &Report) -> bool {
        (self.db.is_some() || self.strict) && !report.is_success()
    }
}

/// Resolve the secret key and load the configuration
///
/// # Errors
///
/// Returns [`Error::Key`] or [`Error::Config`]
pub fn load_inputs(request: &CheckRequest) -> crate::Result<(VaultKey, Config)> {
    let key = request.key.resolve()?;
    let config = Config::load(&request.config)?;
    Ok((key, config))
}

/// Resolve the key, load the configuration and check the requested targets
///
/// # Errors
///
/// Returns an error if the key or the configuration cannot be loaded, or the
/// requested target is not configured
pub async fn run(request: &CheckRequest, cancel: CancellationToken) -> Result<Report> {
    let (key, config) = load_inputs(request).context("failed to start checks")?;

    tls::ensure_crypto_provider();

    let options = CheckOptions {
        timeout: request.timeout,
        concurrency: request.concurrency,
        cancel,
    };

    let report = if let Some(id) = &request.db {
        let target = config.target(id).map_err(Error::from)?;
        let started = Instant::now();

        let mut report = Report::new();
        report.insert(check::run_one(&target, &key, &options).await);
        report.finish(started.elapsed());
        report
    } else {
        info!(targets = config.len(), "checking all databases");
        check::run_all(config.targets(), Arc::new(key), &options).await
    };

    Ok(report)
}

/// Run the checks, print the report and write the metrics file
///
/// # Errors
///
/// Returns an error on any startup precondition failure, or if the report
/// or metrics file cannot be written
pub async fn execute(request: CheckRequest) -> Result<ExitCode> {
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling checks");
                cancel.cancel();
            }
        })
    };

    let report = run(&request, cancel).await;
    interrupt.abort();
    let report = report?;

    let output = report::render(&report, request.format).context("failed to render report")?;
    print!("{output}");

    if let Some(path) = &request.metrics_file {
        metrics::write_textfile(&report, path).map_err(Error::from)?;
    }

    Ok(if request.fails(&report) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
