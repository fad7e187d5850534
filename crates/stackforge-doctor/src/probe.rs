//! [`ToolProbe`] backed by the real system: `PATH` lookup plus a version query.

use std::time::Duration;

use stackforge_runner::{CancellationToken, CommandSpec, NativeRunner, ProcessOutput, ProcessRunner};
use stackforge_toolcache::{ProbeError, ToolProbe};

/// Upper bound for a single `--version` invocation
pub const VERSION_TIMEOUT: Duration = Duration::from_secs(15);

/// Arguments that make `tool` print its version.
#[must_use]
pub fn version_args(tool: &str) -> &'static [&'static str] {
    match tool {
        "go" => &["version"],
        "xcodebuild" => &["-version"],
        _ => &["--version"],
    }
}

/// Probes tools with `which` and `<tool> --version` through a [`ProcessRunner`].
#[derive(Debug, Clone)]
pub struct SystemToolProbe<R: ProcessRunner = NativeRunner> {
    runner: R,
    timeout: Duration,
}

impl SystemToolProbe<NativeRunner> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_runner(NativeRunner::new())
    }
}

impl Default for SystemToolProbe<NativeRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ProcessRunner> SystemToolProbe<R> {
    #[must_use]
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            timeout: VERSION_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl<R: ProcessRunner> ToolProbe for SystemToolProbe<R> {
    fn is_available(&self, name: &str) -> Result<bool, ProbeError> {
        match which::which(name) {
            Ok(path) => {
                tracing::debug!(tool = %name, path = %path.display(), "Found tool on PATH");
                Ok(true)
            }
            Err(which::Error::CannotFindBinaryPath) => Ok(false),
            Err(e) => Err(ProbeError::new(name, e.to_string())),
        }
    }

    fn version(&self, name: &str) -> Result<String, ProbeError> {
        let cmd = CommandSpec::new(name).args(version_args(name));
        let output = self
            .runner
            .run(&cmd, self.timeout, &CancellationToken::new())
            .map_err(|e| ProbeError::new(name, e.to_string()))?;
        if !output.success() {
            return Err(ProbeError::new(
                name,
                format!(
                    "version query exited with {:?}: {}",
                    output.exit_code,
                    output.stderr_tail(3)
                ),
            ));
        }
        Ok(first_line(&output))
    }
}

/// First non-empty line of stdout, falling back to stderr (JVM tools print
/// their banner there).
fn first_line(output: &ProcessOutput) -> String {
    [output.stdout_string(), output.stderr_string()]
        .iter()
        .find_map(|s| s.lines().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or_default()
        .to_string()
}
