//! External commands with a time budget

use ccline_core::error::{CclineError, Result};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Run `command` and return its stdout
///
/// A non-zero exit is a [`CclineError::Subprocess`] and an overrun is a
/// [`CclineError::Timeout`]. The child is killed when the budget runs out.
pub async fn run_with_timeout(mut command: Command, limit: Duration) -> Result<String> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();
    let output = command.kill_on_drop(true).output();

    let output = timeout(limit, output).await.map_err(|_| CclineError::Timeout {
        operation: program.clone(),
        seconds: limit.as_secs(),
    })??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = match stderr.trim() {
            "" => output.status.to_string(),
            text => format!("{}: {}", output.status, text.lines().next().unwrap_or(text)),
        };
        return Err(CclineError::Subprocess {
            command: program,
            message,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
