use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    /// The power log command could not produce output. Never retried here.
    #[error("power log unavailable from `{program}`: {reason}")]
    LogUnavailable {
        program: String,
        #[source]
        reason: LogFailure,
    },
    #[error("battery status unavailable: {0}")]
    StatusUnavailable(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LogFailure {
    #[error("failed to start: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("failed to read output: {0}")]
    Read(#[source] std::io::Error),
    #[error("exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl UsageError {
    pub fn is_log_unavailable(&self) -> bool {
        matches!(self, Self::LogUnavailable { .. })
    }
}
