//! Error types for runner module

use thiserror::Error;

/// Failures while launching or supervising an external tool.
///
/// A tool that runs to completion with a non-zero exit code is NOT an error at
/// this layer; it comes back as a [`ProcessOutput`](crate::ProcessOutput) and
/// the caller decides what the exit code means.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunnerError {
    #[error("Program not found: {program}")]
    ProgramNotFound { program: String },

    #[error("Failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Failed while waiting for '{program}': {reason}")]
    WaitFailed { program: String, reason: String },

    #[error("Execution timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    #[error("Execution of '{program}' was canceled")]
    Canceled { program: String },
}

impl RunnerError {
    /// Whether the tool could not be launched because it is not installed.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ProgramNotFound { .. })
    }

    /// Whether the invocation stopped because the caller canceled it.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }
}
