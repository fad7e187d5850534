use crate::error::RunnerError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::CommandSpec;

// ============================================================================
// ProcessRunner Trait - external tool execution interface
// ============================================================================

/// Output from a completed process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Standard output from the process
    pub stdout: Vec<u8>,
    /// Standard error from the process
    pub stderr: Vec<u8>,
    /// Exit code from the process (None if terminated by signal)
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: Option<i32>) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
        }
    }

    /// Get stdout as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Last `max_lines` lines of stderr, used in error messages.
    #[must_use]
    pub fn stderr_tail(&self, max_lines: usize) -> String {
        let stderr = self.stderr_string();
        let lines: Vec<&str> = stderr.lines().collect();
        let start = lines.len().saturating_sub(max_lines);
        lines[start..].join("\n")
    }

    /// Check if the process exited successfully (exit code 0).
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Which pipe a streamed line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// A single line of live output delivered to a streaming sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLine {
    pub stream: OutputStream,
    pub line: String,
}

/// Trait for external tool execution.
///
/// Implementations MUST use argv-style APIs only (no `sh -c`, no `cmd /C`).
/// The interface is synchronous: a call blocks its worker until the tool
/// finishes, the timeout elapses, or `cancel` fires.
pub trait ProcessRunner: Send + Sync {
    /// Execute a command, capturing all output.
    ///
    /// * `Ok(ProcessOutput)` - the process completed (possibly with non-zero exit code)
    /// * `Err(RunnerError::Timeout)` - the timeout elapsed and the process was killed
    /// * `Err(RunnerError::Canceled)` - `cancel` fired and the process was killed
    fn run(
        &self,
        cmd: &CommandSpec,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, RunnerError>;

    /// Execute a command, forwarding each output line to `sink` as it arrives.
    ///
    /// The returned `ProcessOutput` still carries the full captured output.
    /// The default implementation replays the captured output after completion.
    fn run_streaming(
        &self,
        cmd: &CommandSpec,
        timeout: Duration,
        cancel: &CancellationToken,
        sink: &mut dyn FnMut(StreamLine),
    ) -> Result<ProcessOutput, RunnerError> {
        let output = self.run(cmd, timeout, cancel)?;
        for line in output.stdout_string().lines() {
            sink(StreamLine {
                stream: OutputStream::Stdout,
                line: line.to_string(),
            });
        }
        for line in output.stderr_string().lines() {
            sink(StreamLine {
                stream: OutputStream::Stderr,
                line: line.to_string(),
            });
        }
        Ok(output)
    }
}
