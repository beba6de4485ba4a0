//! Audited execution of a compiled artifact under a wall-clock bound.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use crate::audit::LeakAuditor;
use crate::compiler::CompiledArtifact;
use crate::error::ToolchainError;
use crate::process::{WaitOutcome, run_bounded};

/// Default memory-auditor program.
pub const DEFAULT_VALGRIND: &str = "valgrind";
/// Absolute wall-clock bound for one audited execution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const MEMCHECK_FLAGS: &[&str] = &[
    "--leak-check=full",
    "--show-leak-kinds=all",
    "--track-origins=yes",
    "--verbose",
];

/// One execution of an artifact.
#[derive(Debug, Clone)]
pub struct RunRequest<'a> {
    pub artifact: &'a CompiledArtifact,
    /// Empty, or a single fixture path.
    pub args: &'a [OsString],
    /// Replaces the default input stream when present.
    pub stdin: Option<&'a [u8]>,
    pub timeout: Duration,
}

/// Everything captured from an execution that finished in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExecution {
    /// `None` when the process died from a signal.
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// False when stdout or stderr may have been cut short.
    pub capture_complete: bool,
    pub audit_text: String,
    pub duration: Duration,
}

/// Result of one sandboxed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RawExecution),
    /// Killed at the deadline. Nothing else is reported.
    TimedOut { after: Duration },
}

/// A completed execution with its leak verdict applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub capture_complete: bool,
    pub leaked: bool,
    pub audit_text: String,
    pub duration: Duration,
}

impl ExecutionResult {
    #[must_use]
    pub fn classify(raw: RawExecution, auditor: &dyn LeakAuditor) -> Self {
        let leaked = auditor.classify(&raw.audit_text).is_leaked();
        Self {
            exit_code: raw.exit_code,
            signal: raw.signal,
            stdout: raw.stdout,
            stderr: raw.stderr,
            capture_complete: raw.capture_complete,
            leaked,
            audit_text: raw.audit_text,
            duration: raw.duration,
        }
    }

    /// Stdout as text, lossily.
    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Capability: run an artifact and capture its audit.
pub trait Sandbox {
    /// Check the wrapper tool is present; returns its version line.
    ///
    /// # Errors
    ///
    /// [`ToolchainError::ToolMissing`] or [`ToolchainError::ToolUnusable`].
    fn probe(&self) -> Result<String, ToolchainError>;

    /// Execute one request.
    ///
    /// # Errors
    ///
    /// Only when the run could not be attempted. A timeout is
    /// [`RunOutcome::TimedOut`].
    fn run(&self, request: &RunRequest<'_>) -> Result<RunOutcome, ToolchainError>;
}

/// Runs artifacts under a memory auditor that writes its report to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditedSandbox {
    pub wrapper: String,
    pub wrapper_args: Vec<String>,
    pub report_path: PathBuf,
}

impl AuditedSandbox {
    /// Valgrind memcheck with full leak checking and origin tracking.
    #[must_use]
    pub fn memcheck(wrapper: impl Into<String>, report_path: impl Into<PathBuf>) -> Self {
        Self {
            wrapper: wrapper.into(),
            wrapper_args: MEMCHECK_FLAGS.iter().map(|s| (*s).to_string()).collect(),
            report_path: report_path.into(),
        }
    }

    /// An arbitrary wrapper that accepts `--log-file=<path>` before the command.
    #[must_use]
    pub fn with_wrapper(
        wrapper: impl Into<String>,
        wrapper_args: Vec<String>,
        report_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            wrapper: wrapper.into(),
            wrapper_args,
            report_path: report_path.into(),
        }
    }

    #[must_use]
    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    /// Arguments passed to the wrapper, in order.
    #[must_use]
    pub fn command_line(&self, request: &RunRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.wrapper_args.iter().map(OsString::from).collect();
        let mut log_flag = OsString::from("--log-file=");
        log_flag.push(self.report_path.as_os_str());
        args.push(log_flag);
        args.push(request.artifact.path().as_os_str().to_owned());
        args.extend(request.args.iter().cloned());
        args
    }

    fn clear_report(&self) -> Result<(), ToolchainError> {
        match std::fs::remove_file(&self.report_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(ToolchainError::io_at(
                "remove stale audit report",
                &self.report_path,
                err,
            )),
        }
    }

    fn read_report(&self) -> Result<String, ToolchainError> {
        match std::fs::read(&self.report_path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(ToolchainError::io_at(
                "read audit report",
                &self.report_path,
                err,
            )),
        }
    }
}

impl Sandbox for AuditedSandbox {
    fn probe(&self) -> Result<String, ToolchainError> {
        let mut cmd = Command::new(&self.wrapper);
        cmd.arg("--version").stdin(Stdio::null());
        match run_bounded(&mut cmd, &self.wrapper, DEFAULT_TIMEOUT)? {
            WaitOutcome::Exited(out) if out.status.success() => {
                Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
            }
            WaitOutcome::Exited(out) => Err(ToolchainError::ToolUnusable {
                tool: self.wrapper.clone(),
                detail: format!("`--version` exited with {}", out.status),
            }),
            WaitOutcome::TimedOut { .. } => Err(ToolchainError::ToolUnusable {
                tool: self.wrapper.clone(),
                detail: "`--version` did not answer in time".to_string(),
            }),
        }
    }

    fn run(&self, request: &RunRequest<'_>) -> Result<RunOutcome, ToolchainError> {
        self.clear_report()?;

        // Removed when dropped, on every return path below.
        let staged = request.stdin.map(stage_stdin).transpose()?;

        let mut cmd = Command::new(&self.wrapper);
        cmd.args(self.command_line(request));
        match &staged {
            Some(file) => {
                let input = file
                    .reopen()
                    .map_err(|source| ToolchainError::TempInput { source })?;
                cmd.stdin(Stdio::from(input));
            }
            None => {
                cmd.stdin(Stdio::null());
            }
        }

        match run_bounded(&mut cmd, &self.wrapper, request.timeout)? {
            WaitOutcome::TimedOut { elapsed } => Ok(RunOutcome::TimedOut { after: elapsed }),
            WaitOutcome::Exited(out) => Ok(RunOutcome::Completed(RawExecution {
                exit_code: out.status.code(),
                signal: exit_signal(out.status),
                stdout: out.stdout,
                stderr: out.stderr,
                capture_complete: out.capture_complete,
                audit_text: self.read_report()?,
                duration: out.elapsed,
            })),
        }
    }
}

fn stage_stdin(payload: &[u8]) -> Result<tempfile::NamedTempFile, ToolchainError> {
    let mut file = tempfile::Builder::new()
        .prefix("gnl-stdin-")
        .tempfile()
        .map_err(|source| ToolchainError::TempInput { source })?;
    file.write_all(payload)
        .and_then(|()| file.flush())
        .map_err(|source| ToolchainError::TempInput { source })?;
    Ok(file)
}

#[cfg(unix)]
fn exit_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: ExitStatus) -> Option<i32> {
    None
}
