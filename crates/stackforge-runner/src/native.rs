use crate::error::RunnerError;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::process::{Child, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::{CommandSpec, OutputStream, ProcessOutput, ProcessRunner, StreamLine};

/// How often the supervisor checks the child, the deadline and the cancel token.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

// ============================================================================
// NativeRunner - direct process execution
// ============================================================================

/// Native process runner using `std::process::Command`.
///
/// The child is supervised from the calling thread: pipe readers run on
/// helper threads and feed lines back over a channel while the caller polls
/// for exit, the deadline, and cancellation. On timeout or cancel the child
/// is killed and reaped before the error is returned.
///
/// ```rust,no_run
/// use stackforge_runner::{CancellationToken, CommandSpec, NativeRunner, ProcessRunner};
/// use std::time::Duration;
///
/// let runner = NativeRunner::new();
/// let cmd = CommandSpec::new("go").arg("version");
/// let output = runner
///     .run(&cmd, Duration::from_secs(30), &CancellationToken::new())
///     .unwrap();
/// assert!(output.success());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

impl NativeRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn supervise(
        cmd: &CommandSpec,
        timeout: Duration,
        cancel: &CancellationToken,
        mut sink: Option<&mut dyn FnMut(StreamLine)>,
    ) -> Result<ProcessOutput, RunnerError> {
        let program = cmd.program_name();

        if cancel.is_cancelled() {
            return Err(RunnerError::Canceled { program });
        }

        let mut command = cmd.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                RunnerError::ProgramNotFound {
                    program: program.clone(),
                }
            } else {
                RunnerError::SpawnFailed {
                    program: program.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        tracing::debug!(program = %program, pid = child.id(), "spawned external tool");

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(pipe) = child.stdout.take() {
            readers.push(spawn_reader(pipe, OutputStream::Stdout, tx.clone()));
        }
        if let Some(pipe) = child.stderr.take() {
            readers.push(spawn_reader(pipe, OutputStream::Stderr, tx.clone()));
        }
        drop(tx);

        let mut captured = Captured::default();
        let deadline = Instant::now() + timeout;
        let mut readers_done = false;

        let status = loop {
            if readers_done {
                thread::sleep(POLL_INTERVAL);
            } else {
                match rx.recv_timeout(POLL_INTERVAL) {
                    Ok(chunk) => captured.record(chunk, &mut sink),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => readers_done = true,
                }
            }

            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    kill_and_reap(&mut child);
                    return Err(RunnerError::WaitFailed {
                        program,
                        reason: e.to_string(),
                    });
                }
            }

            if cancel.is_cancelled() {
                kill_and_reap(&mut child);
                tracing::debug!(program = %program, "external tool canceled");
                return Err(RunnerError::Canceled { program });
            }

            if Instant::now() >= deadline {
                kill_and_reap(&mut child);
                tracing::debug!(program = %program, timeout_secs = timeout.as_secs(), "external tool timed out");
                return Err(RunnerError::Timeout {
                    timeout_seconds: timeout.as_secs(),
                });
            }
        };

        for reader in readers {
            let _ = reader.join();
        }
        while let Ok(chunk) = rx.recv() {
            captured.record(chunk, &mut sink);
        }

        Ok(ProcessOutput::new(
            captured.stdout,
            captured.stderr,
            status.code(),
        ))
    }
}

impl ProcessRunner for NativeRunner {
    fn run(
        &self,
        cmd: &CommandSpec,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, RunnerError> {
        Self::supervise(cmd, timeout, cancel, None)
    }

    fn run_streaming(
        &self,
        cmd: &CommandSpec,
        timeout: Duration,
        cancel: &CancellationToken,
        sink: &mut dyn FnMut(StreamLine),
    ) -> Result<ProcessOutput, RunnerError> {
        Self::supervise(cmd, timeout, cancel, Some(sink))
    }
}

#[derive(Default)]
struct Captured {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl Captured {
    fn record(
        &mut self,
        (stream, bytes): (OutputStream, Vec<u8>),
        sink: &mut Option<&mut dyn FnMut(StreamLine)>,
    ) {
        if let Some(sink) = sink.as_mut() {
            let line = String::from_utf8_lossy(&bytes)
                .trim_end_matches(['\r', '\n'])
                .to_string();
            sink(StreamLine { stream, line });
        }
        match stream {
            OutputStream::Stdout => self.stdout.extend_from_slice(&bytes),
            OutputStream::Stderr => self.stderr.extend_from_slice(&bytes),
        }
    }
}

fn spawn_reader<R>(
    pipe: R,
    stream: OutputStream,
    tx: Sender<(OutputStream, Vec<u8>)>,
) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        loop {
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send((stream, line)).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

fn kill_and_reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn test_echo_command() {
        let runner = NativeRunner::new();
        let cmd = CommandSpec::new("echo").arg("hello world");
        let output = runner
            .run(&cmd, Duration::from_secs(10), &CancellationToken::new())
            .unwrap();
        assert!(output.success());
        assert!(output.stdout_string().contains("hello world"));
    }

    #[test]
    fn test_shell_metacharacters_not_interpreted() {
        let runner = NativeRunner::new();
        let cmd = CommandSpec::new("echo").arg("$PATH");
        let output = runner
            .run(&cmd, Duration::from_secs(10), &CancellationToken::new())
            .unwrap();
        assert_eq!(output.stdout_string().trim(), "$PATH");
    }

    #[test]
    fn test_nonexistent_program_is_not_found() {
        let runner = NativeRunner::new();
        let cmd = CommandSpec::new("stackforge_test_tool_that_does_not_exist_42");
        let err = runner
            .run(&cmd, Duration::from_secs(10), &CancellationToken::new())
            .unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err}");
    }

    #[test]
    fn test_exit_code_propagation() {
        let runner = NativeRunner::new();
        let output = runner
            .run(&sh("exit 42"), Duration::from_secs(10), &CancellationToken::new())
            .unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code, Some(42));
    }

    #[test]
    fn test_stderr_capture() {
        let runner = NativeRunner::new();
        let output = runner
            .run(
                &sh("echo 'error message' >&2"),
                Duration::from_secs(10),
                &CancellationToken::new(),
            )
            .unwrap();
        assert!(output.stderr_string().contains("error message"));
    }

    #[test]
    fn test_timeout_kills_process() {
        let runner = NativeRunner::new();
        let started = Instant::now();
        let err = runner
            .run(&sh("sleep 5"), Duration::from_millis(200), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, RunnerError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_cancel_before_spawn() {
        let runner = NativeRunner::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = runner
            .run(&sh("echo never"), Duration::from_secs(10), &cancel)
            .unwrap_err();
        assert!(err.is_canceled());
    }

    #[test]
    fn test_cancel_while_running() {
        let runner = NativeRunner::new();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            trigger.cancel();
        });

        let started = Instant::now();
        let err = runner
            .run(&sh("sleep 5"), Duration::from_secs(30), &cancel)
            .unwrap_err();
        handle.join().unwrap();

        assert!(err.is_canceled());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_streaming_delivers_lines_in_order() {
        let runner = NativeRunner::new();
        let mut lines = Vec::new();
        let output = runner
            .run_streaming(
                &sh("echo one; echo two; echo three"),
                Duration::from_secs(10),
                &CancellationToken::new(),
                &mut |line| lines.push(line.line),
            )
            .unwrap();

        assert!(output.success());
        assert_eq!(lines, vec!["one", "two", "three"]);
        assert_eq!(output.stdout_string(), "one\ntwo\nthree\n");
    }
}
