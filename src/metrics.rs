//! Prometheus textfile output
//!
//! A run is one shot, so metrics live in a registry built per report and are
//! written for the node exporter textfile collector.

use crate::outcome::{Report, Status};
use prometheus::{
    Encoder, GaugeVec, IntGauge, IntGaugeVec, Registry, opts, register_gauge_vec_with_registry,
    register_int_gauge_vec_with_registry, register_int_gauge_with_registry,
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("could not build metrics: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("could not write metrics file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct RunMetrics {
    registry: Registry,
    up: IntGaugeVec,
    duration: GaugeVec,
    status: IntGaugeVec,
    timestamp: IntGauge,
}

impl RunMetrics {
    /// # Errors
    ///
    /// Returns an error if a metric cannot be registered
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let up = register_int_gauge_vec_with_registry!(
            opts!("dbdiag_target_up", "1 ok, 0 error"),
            &["target", "kind"],
            &registry
        )?;

        let duration = register_gauge_vec_with_registry!(
            opts!(
                "dbdiag_target_check_duration_seconds",
                "Duration of the last check in seconds"
            ),
            &["target", "kind"],
            &registry
        )?;

        let status = register_int_gauge_vec_with_registry!(
            opts!(
                "dbdiag_target_status",
                "Outcome of the last check - value is always 1"
            ),
            &["target", "kind", "status"],
            &registry
        )?;

        let timestamp = register_int_gauge_with_registry!(
            opts!(
                "dbdiag_run_timestamp_seconds",
                "Unix time the run started"
            ),
            &registry
        )?;

        Ok(Self {
            registry,
            up,
            duration,
            status,
            timestamp,
        })
    }

    pub fn record(&self, report: &Report) {
        self.timestamp.set(report.started_at.timestamp());

        for outcome in report.iter() {
            let (target, kind) = (outcome.target.as_str(), outcome.kind.as_str());
            self.up
                .with_label_values(&[target, kind])
                .set(i64::from(outcome.status == Status::Success));
            #[allow(clippy::cast_precision_loss)]
            self.duration
                .with_label_values(&[target, kind])
                .set(outcome.elapsed_ms as f64 / 1000.0);
            self.status
                .with_label_values(&[target, kind, outcome.status.as_str()])
                .set(1);
        }
    }

    /// # Errors
    ///
    /// Returns an error if encoding fails
    pub fn encode(&self) -> Result<Vec<u8>, MetricsError> {
        let mut buffer = Vec::new();
        prometheus::TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

/// Encode a report in the Prometheus text format
///
/// # Errors
///
/// Returns an error if the metrics cannot be built or encoded
pub fn encode_report(report: &Report) -> Result<Vec<u8>, MetricsError> {
    let metrics = RunMetrics::new()?;
    metrics.record(report);
    metrics.encode()
}

/// Write a report as a textfile, replacing the previous one atomically
///
/// # Errors
///
/// Returns an error if encoding fails or the file cannot be written
pub fn write_textfile(report: &Report, path: &Path) -> Result<(), MetricsError> {
    let buffer = encode_report(report)?;
    let write_err = |source| MetricsError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, buffer).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)
}
