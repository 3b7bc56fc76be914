pub mod check;
pub mod encrypt;
mod run;

use crate::vault::KeySource;
use check::CheckRequest;
use std::process::ExitCode;

/// Action enum representing each possible command
#[derive(Debug)]
pub enum Action {
    Check(CheckRequest),
    Encrypt { key: KeySource },
}

impl Action {
    /// Execute the action
    ///
    /// # Errors
    ///
    /// Returns an error if a startup precondition fails, per-target failures
    /// are reported through the exit code instead
    pub async fn execute(self) -> anyhow::Result<ExitCode> {
        run::execute(self).await
    }
}
