use crate::outcome::{Outcome, Report};
use std::{fmt::Write, str::FromStr};

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Text,
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown report format: {s}")),
        }
    }
}

/// Render a report for stdout
///
/// # Errors
///
/// Returns an error if JSON serialization fails
pub fn render(report: &Report, format: Format) -> Result<String, serde_json::Error> {
    match format {
        Format::Text => Ok(render_text(report)),
        Format::Json => serde_json::to_string_pretty(report),
    }
}

fn render_line(out: &mut String, outcome: &Outcome, width: usize) {
    let label = if outcome.is_success() { "ok" } else { "FAIL" };
    let _ = write!(
        out,
        "{label:<4} {:<width$} {:<10} {:>6}ms {}",
        outcome.target, outcome.kind, outcome.elapsed_ms, outcome.status
    );

    if outcome.verified {
        out.push_str(" (health query passed)");
    }
    if let Some(cause) = &outcome.cause {
        let _ = write!(out, ": {cause}");
    }
    if let Some(err) = &outcome.release_error {
        let _ = write!(out, " [release: {err}]");
    }
    out.push('\n');
}

fn render_text(report: &Report) -> String {
    let width = report
        .iter()
        .map(|o| o.target.len())
        .max()
        .unwrap_or_default();

    let mut out = String::new();
    for outcome in report.iter() {
        render_line(&mut out, outcome, width);
    }

    let _ = writeln!(
        out,
        "{} checked, {} ok, {} failed in {}ms",
        report.len(),
        report.len() - report.failures(),
        report.failures(),
        report.elapsed_ms
    );

    out
}
