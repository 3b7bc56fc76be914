use super::{commands, dispatch};
use crate::logging;
use anyhow::Result;
use std::process::ExitCode;

/// Main orchestrator - Pure orchestration with no business logic
///
/// Five-step data flow:
/// 1. Parse: Extract CLI arguments
/// 2. Extract Verbosity: Convert `-v` count and `-q` to a logging level
/// 3. Initialize Telemetry: Set up structured logging to stderr
/// 4. Dispatch: Convert `ArgMatches` into typed Action enum
/// 5. Execute: Run the action's business logic
///
/// # Errors
///
/// Returns an error if any step in the flow fails
pub async fn start() -> Result<ExitCode> {
    // 1. Parse: Extract CLI arguments
    let matches = commands::new().get_matches();

    // 2. Extract Verbosity
    let verbose = matches.get_count("verbose");
    let quiet = matches.get_flag("quiet");

    // 3. Initialize Telemetry
    logging::init_logging(verbose, quiet)?;

    // 4. Dispatch: Convert ArgMatches into typed Action enum
    let action = dispatch::dispatch(&matches)?;

    // 5. Execute: Run the action's business logic
    action.execute().await
}
