// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution with timeouts.
//!
//! Every external CLI the runtime shells out to goes through
//! [`run_with_timeout`] so a wedged child process can never hang a worker
//! past its deadline.

use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Timeout for `bd` issue-store invocations.
pub const BD_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for git operations issued by the git guard.
pub const GIT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum SubprocessError {
    /// Binary missing from PATH or not executable.
    #[error("{label}: failed to start: {source}")]
    Spawn {
        label: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{label}: timed out after {timeout:?}")]
    Timeout { label: &'static str, timeout: Duration },
    #[error("{label}: {source}")]
    Io {
        label: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl SubprocessError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SubprocessError::Timeout { .. } | SubprocessError::Io { .. })
    }
}

/// Run a command to completion, killing it on timeout.
///
/// `label` names the operation in errors and logs. Non-zero exit is not an
/// error here; callers inspect `Output::status`.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &'static str,
) -> Result<Output, SubprocessError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(SubprocessError::Spawn { label, source })
        }
        Ok(Err(source)) => Err(SubprocessError::Io { label, source }),
        Err(_) => {
            tracing::warn!(label, ?timeout, "subprocess timed out");
            Err(SubprocessError::Timeout { label, timeout })
        }
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
