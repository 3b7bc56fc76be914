use crate::{
    cli::actions::{Action, check::CheckRequest},
    report::Format,
    vault::KeySource,
};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use std::{path::PathBuf, time::Duration};

fn key_source(matches: &ArgMatches) -> KeySource {
    KeySource {
        file: matches.get_one::<PathBuf>("key-file").cloned(),
        legacy_obfuscated: matches
            .get_one::<String>("legacy-obfuscated-key")
            .filter(|value| !value.trim().is_empty())
            .cloned(),
    }
}

/// Convert `ArgMatches` into typed Action enum with validation
///
/// # Errors
///
/// Returns an error if an argument cannot be converted
pub fn dispatch(matches: &ArgMatches) -> Result<Action> {
    let key = key_source(matches);

    if matches.get_flag("encrypt") {
        return Ok(Action::Encrypt { key });
    }

    let config = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .context("config path is required")?;

    let db = matches
        .get_one::<String>("db")
        .filter(|id| !id.is_empty())
        .cloned();

    let timeout = matches.get_one::<u64>("timeout").copied().unwrap_or(30);
    let concurrency = matches.get_one::<usize>("concurrency").copied().unwrap_or(0);

    let format = matches
        .get_one::<String>("format")
        .map(|f| f.parse::<Format>())
        .transpose()
        .map_err(|e| anyhow!(e))?
        .unwrap_or_default();

    Ok(Action::Check(CheckRequest {
        config,
        db,
        key,
        timeout: Duration::from_secs(timeout),
        concurrency,
        format,
        metrics_file: matches.get_one::<PathBuf>("metrics-file").cloned(),
        strict: matches.get_flag("strict"),
    }))
}
