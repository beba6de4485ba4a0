//! Bounded child-process execution.
//!
//! Stdout and stderr are drained by dedicated reader threads so the calling
//! thread keeps exclusive kill authority over the child and can enforce an
//! absolute deadline even while a pipe read is blocked.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::ToolchainError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long to wait for a reader thread after the child is gone.
const READER_JOIN_GRACE: Duration = Duration::from_secs(1);

/// Output of a child that exited (normally or by signal) before its deadline.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// False when a reader was abandoned before its pipe closed, so
    /// `stdout` or `stderr` may be cut short.
    pub capture_complete: bool,
    pub elapsed: Duration,
}

/// Result of waiting on a child against a deadline.
#[derive(Debug, Clone)]
pub enum WaitOutcome {
    Exited(ProcessOutput),
    /// The child was killed at the deadline; nothing it produced is kept.
    TimedOut { elapsed: Duration },
}

/// Spawn `command` with piped stdout/stderr and wait at most `timeout`.
///
/// `program` names the tool in errors. Stdin is left as configured by the
/// caller.
///
/// # Errors
///
/// [`ToolchainError::ToolMissing`] when the program does not exist,
/// [`ToolchainError::Spawn`] or [`ToolchainError::Io`] for other failures.
pub fn run_bounded(
    command: &mut Command,
    program: &str,
    timeout: Duration,
) -> Result<WaitOutcome, ToolchainError> {
    command.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = command
        .spawn()
        .map_err(|err| ToolchainError::from_spawn(program, err))?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let start = Instant::now();
    let deadline = start + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {}
            Err(err) => {
                reap(&mut child);
                return Err(ToolchainError::io(format!("failed waiting on `{program}`"), err));
            }
        }
        if Instant::now() >= deadline {
            reap(&mut child);
            break None;
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = join_bounded(stdout);
    let stderr = join_bounded(stderr);
    let elapsed = start.elapsed();
    let capture_complete = stdout.is_some() && stderr.is_some();

    Ok(match status {
        Some(status) => WaitOutcome::Exited(ProcessOutput {
            status,
            stdout: stdout.unwrap_or_default(),
            stderr: stderr.unwrap_or_default(),
            capture_complete,
            elapsed,
        }),
        None => WaitOutcome::TimedOut { elapsed },
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Join a reader, abandoning it if a descendant keeps the pipe open.
///
/// `None` means the captured bytes are not the whole stream.
fn join_bounded(handle: Option<JoinHandle<Vec<u8>>>) -> Option<Vec<u8>> {
    let Some(handle) = handle else {
        return Some(Vec::new());
    };
    let deadline = Instant::now() + READER_JOIN_GRACE;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return None;
        }
        thread::sleep(POLL_INTERVAL);
    }
    handle.join().ok()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_and_stderr() {
        let mut cmd = Command::new("/bin/sh");
        cmd.args(["-c", "printf out; printf err >&2"]);
        let WaitOutcome::Exited(out) = run_bounded(&mut cmd, "sh", Duration::from_secs(5)).unwrap()
        else {
            panic!("sh should exit before the deadline");
        };
        assert!(out.status.success());
        assert_eq!(out.stdout, b"out");
        assert_eq!(out.stderr, b"err");
        assert!(out.capture_complete);
    }

    #[test]
    fn descendant_holding_stdout_marks_capture_incomplete() {
        let mut cmd = Command::new("/bin/sh");
        cmd.args(["-c", "sleep 3 & printf early"]);
        let started = Instant::now();
        let WaitOutcome::Exited(out) = run_bounded(&mut cmd, "sh", Duration::from_secs(5)).unwrap()
        else {
            panic!("sh itself exits immediately");
        };
        assert_eq!(out.status.code(), Some(0));
        assert!(!out.capture_complete);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn reports_exit_code() {
        let mut cmd = Command::new("/bin/sh");
        cmd.args(["-c", "exit 3"]);
        let WaitOutcome::Exited(out) = run_bounded(&mut cmd, "sh", Duration::from_secs(5)).unwrap()
        else {
            panic!("sh should exit before the deadline");
        };
        assert_eq!(out.status.code(), Some(3));
    }

    #[test]
    fn kills_at_deadline() {
        let mut cmd = Command::new("/bin/sh");
        cmd.args(["-c", "exec sleep 10"]);
        let started = Instant::now();
        let outcome = run_bounded(&mut cmd, "sh", Duration::from_millis(200)).unwrap();
        assert!(matches!(outcome, WaitOutcome::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn missing_program_is_tool_missing() {
        let mut cmd = Command::new("gnl-definitely-not-installed");
        let err = run_bounded(&mut cmd, "gnl-definitely-not-installed", Duration::from_secs(1))
            .unwrap_err();
        assert!(err.is_tool_missing());
    }
}
