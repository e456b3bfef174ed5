/// Task executor
///
/// Runs a task's command through a shell, streaming stdout and stderr live to
/// the caller while keeping a private copy of each for the cache.
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use crate::logging::{operations, services, status};

/// Shell used when none is configured
pub const DEFAULT_SHELL: &str = "sh";

/// Exit code reported when the shell itself could not be launched
pub const EXIT_CODE_SPAWN_FAILURE: i32 = 127;

const READ_BUFFER_SIZE: usize = 8 * 1024;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to launch shell '{shell}'")]
    Spawn {
        shell: String,
        #[source]
        source: io::Error,
    },

    #[error("Command exited with status {code}")]
    Exit { code: i32 },

    #[error("Command terminated by signal {signal}")]
    Signal { signal: i32 },

    #[error("Failed while waiting for command output")]
    Io(#[source] io::Error),
}

impl CommandError {
    /// Process exit code that mirrors this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Spawn { .. } => EXIT_CODE_SPAWN_FAILURE,
            Self::Exit { code } => *code,
            Self::Signal { signal } => 128 + signal,
            Self::Io(_) => 1,
        }
    }
}

/// Result of a single execution
///
/// Output is kept even when `error` is set: a failed run is still the last
/// known result of the task.
#[derive(Debug)]
pub struct ExecutionResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
    pub error: Option<CommandError>,
}

impl ExecutionResult {
    /// Cache payload: all of stdout followed by all of stderr.
    ///
    /// The terminal sees the two streams interleaved as they happened; the
    /// cached copy does not.
    pub fn combined_output(&self) -> Vec<u8> {
        let mut combined = Vec::with_capacity(self.stdout.len() + self.stderr.len());
        combined.extend_from_slice(&self.stdout);
        combined.extend_from_slice(&self.stderr);
        combined
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    fn failed_to_start(error: CommandError, start: Instant) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            duration: start.elapsed(),
            error: Some(error),
        }
    }
}

/// Shell command executor
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    shell: String,
}

impl Default for TaskExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl TaskExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Run `command`, teeing its output to this process's stdout/stderr.
    pub fn execute(&self, command: &str) -> ExecutionResult {
        let mut stdout = io::stdout();
        let mut stderr = io::stderr();
        self.execute_with(command, &mut stdout, &mut stderr)
    }

    /// Run `command`, teeing its output to the given sinks.
    ///
    /// Both pipes are drained on their own thread so a child that fills one
    /// of them cannot block on the other.
    pub fn execute_with(
        &self,
        command: &str,
        stdout_sink: &mut (dyn Write + Send),
        stderr_sink: &mut (dyn Write + Send),
    ) -> ExecutionResult {
        let start = Instant::now();

        // Resolve the shell from PATH, falling back to the name as given
        let shell_path = which::which(&self.shell).unwrap_or_else(|e| {
            debug!(
                service = services::TASK_EXECUTOR,
                shell = %self.shell,
                error = %e,
                "shell not found in PATH, trying as-is"
            );
            PathBuf::from(&self.shell)
        });

        let mut cmd = Command::new(&shell_path);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(
            service = services::TASK_EXECUTOR,
            operation = operations::EXECUTE,
            shell = %shell_path.display(),
            command = %command,
            "spawning command"
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                warn!(
                    service = services::TASK_EXECUTOR,
                    operation = operations::EXECUTE,
                    status = status::ERROR,
                    shell = %self.shell,
                    error = %source,
                    "failed to launch shell"
                );
                return ExecutionResult::failed_to_start(
                    CommandError::Spawn {
                        shell: self.shell.clone(),
                        source,
                    },
                    start,
                );
            }
        };

        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();

        let (stdout, stderr, wait) = thread::scope(|scope| {
            let stdout_handle = scope.spawn(move || match child_stdout {
                Some(pipe) => tee(pipe, stdout_sink),
                None => (Vec::new(), None),
            });
            let stderr_handle = scope.spawn(move || match child_stderr {
                Some(pipe) => tee(pipe, stderr_sink),
                None => (Vec::new(), None),
            });

            let wait = child.wait();
            (
                join_tee(stdout_handle.join()),
                join_tee(stderr_handle.join()),
                wait,
            )
        });

        let (stdout, stdout_err) = stdout;
        let (stderr, stderr_err) = stderr;

        let error = match wait {
            Err(e) => Some(CommandError::Io(e)),
            Ok(exit) => {
                exit_error(exit).or_else(|| stdout_err.or(stderr_err).map(CommandError::Io))
            }
        };

        let duration = start.elapsed();
        let outcome = if error.is_none() {
            status::SUCCESS
        } else {
            status::ERROR
        };

        debug!(
            service = services::TASK_EXECUTOR,
            operation = operations::EXECUTE,
            status = outcome,
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            duration_ms = duration.as_millis() as u64,
            "command finished"
        );

        ExecutionResult {
            stdout,
            stderr,
            duration,
            error,
        }
    }
}

/// Copy `reader` into `sink` chunk by chunk, keeping everything read.
///
/// A failing sink (e.g. a closed terminal pipe) stops forwarding but not
/// capturing, so the child never stalls on a full pipe.
fn tee(mut reader: impl Read, sink: &mut (dyn Write + Send)) -> (Vec<u8>, Option<io::Error>) {
    let mut captured = Vec::new();
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut forwarding = true;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return (captured, Some(e)),
        };

        captured.extend_from_slice(&buf[..n]);

        if forwarding {
            if let Err(e) = sink.write_all(&buf[..n]).and_then(|()| sink.flush()) {
                warn!(
                    service = services::TASK_EXECUTOR,
                    error = %e,
                    "stopped forwarding live output"
                );
                forwarding = false;
            }
        }
    }

    (captured, None)
}

fn join_tee(
    joined: thread::Result<(Vec<u8>, Option<io::Error>)>,
) -> (Vec<u8>, Option<io::Error>) {
    joined.unwrap_or_else(|_| {
        (
            Vec::new(),
            Some(io::Error::other("output reader thread panicked")),
        )
    })
}

fn exit_error(exit: ExitStatus) -> Option<CommandError> {
    if exit.success() {
        return None;
    }
    if let Some(code) = exit.code() {
        return Some(CommandError::Exit { code });
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = exit.signal() {
            return Some(CommandError::Signal { signal });
        }
    }

    Some(CommandError::Exit { code: 1 })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn run(command: &str) -> (ExecutionResult, Vec<u8>, Vec<u8>) {
        let executor = TaskExecutor::default();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = executor.execute_with(command, &mut out, &mut err);
        (result, out, err)
    }

    #[test]
    fn test_captures_and_streams_stdout() {
        let (result, out, err) = run("echo status:ok");

        assert!(result.success());
        assert_eq!(result.combined_output(), b"status:ok\n");
        assert_eq!(out, b"status:ok\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_combined_output_is_stdout_then_stderr() {
        let (result, out, err) = run("echo first-err 1>&2; echo second-out; echo third-err 1>&2");

        assert!(result.success());
        assert_eq!(
            result.combined_output(),
            b"second-out\nfirst-err\nthird-err\n"
        );
        assert_eq!(out, b"second-out\n");
        assert_eq!(err, b"first-err\nthird-err\n");
    }

    #[test]
    fn test_non_zero_exit_keeps_output() {
        let (result, _, _) = run("echo partial; echo oops 1>&2; exit 3");

        assert!(matches!(result.error, Some(CommandError::Exit { code: 3 })));
        assert_eq!(result.error.as_ref().unwrap().exit_code(), 3);
        assert_eq!(result.combined_output(), b"partial\noops\n");
    }

    #[test]
    fn test_signal_termination() {
        let (result, _, _) = run("echo before; kill -9 $$");

        assert!(matches!(result.error, Some(CommandError::Signal { signal: 9 })));
        assert_eq!(result.error.as_ref().unwrap().exit_code(), 137);
        assert_eq!(result.combined_output(), b"before\n");
    }

    #[test]
    fn test_missing_shell_is_spawn_error() {
        let executor = TaskExecutor::new("kasher-no-such-shell");
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = executor.execute_with("echo hi", &mut out, &mut err);

        assert!(matches!(result.error, Some(CommandError::Spawn { .. })));
        assert_eq!(result.error.as_ref().unwrap().exit_code(), 127);
        assert!(result.combined_output().is_empty());
    }

    #[test]
    fn test_large_stderr_before_stdout_does_not_deadlock() {
        let (result, out, err) = run(
            "head -c 300000 /dev/zero | tr '\\0' e 1>&2; head -c 300000 /dev/zero | tr '\\0' o",
        );

        assert!(result.success());
        assert_eq!(result.stdout.len(), 300_000);
        assert_eq!(result.stderr.len(), 300_000);
        assert_eq!(out.len(), 300_000);
        assert_eq!(err.len(), 300_000);
        assert!(result.combined_output().starts_with(b"o"));
        assert!(result.combined_output().ends_with(b"e"));
    }

    #[test]
    fn test_failing_sink_still_captures() {
        struct BrokenPipe;
        impl Write for BrokenPipe {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let executor = TaskExecutor::default();
        let mut err = Vec::new();
        let result = executor.execute_with("echo one; echo two", &mut BrokenPipe, &mut err);

        assert!(result.success());
        assert_eq!(result.combined_output(), b"one\ntwo\n");
    }

    #[test]
    fn test_non_utf8_output_is_kept_verbatim() {
        let (result, out, _) = run("printf 'caf\\351\\n'");

        assert!(result.success());
        assert_eq!(out, b"caf\xe9\n");
        assert_eq!(result.combined_output(), b"caf\xe9\n");
    }
}
