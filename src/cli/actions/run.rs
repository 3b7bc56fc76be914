use super::{Action, check, encrypt};
use std::process::ExitCode;

/// Execute the action's business logic by delegating to the appropriate module
pub async fn execute(action: Action) -> anyhow::Result<ExitCode> {
    match action {
        Action::Check(request) => check::execute(request).await,
        Action::Encrypt { key } => encrypt::execute(&key),
    }
}
