//! Sequential suite runner.
//!
//! For each case: rebuild for the case's buffer size, execute under the
//! sandbox, judge the result, print the verdict. Cases never abort the
//! suite; the driver, artifact and report are removed once at the end.
//!
//! An oracle fixture case passes only if stdout reproduces the fixture's
//! bytes exactly, so the same fixture must read back identically at every
//! buffer size.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use gnl_toolchain::{
    BuildConfiguration, CompileOutcome, Compiler, ExecutionResult, LeakAuditor, RunOutcome,
    RunRequest, Sandbox,
};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::fixtures::{CaseInput, CaseRole, TestCase};
use crate::permissions::PermissionGuard;
use crate::report::SuiteReport;
use crate::session::BuildSession;
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};
use crate::verify::{CaseRecord, CaseVerdict};

pub struct SuiteRunner<C, S, A> {
    compiler: C,
    sandbox: S,
    auditor: A,
    session: BuildSession,
    timeout: Duration,
    default_buffer_size: i64,
    log: Option<LogEmitter>,
}

impl<C: Compiler, S: Sandbox, A: LeakAuditor> SuiteRunner<C, S, A> {
    #[must_use]
    pub fn new(compiler: C, sandbox: S, auditor: A, config: &HarnessConfig) -> Self {
        Self {
            compiler,
            sandbox,
            auditor,
            session: BuildSession::new(config),
            timeout: config.timeout,
            default_buffer_size: config.default_buffer_size,
            log: None,
        }
    }

    /// Mirror progress into a structured JSONL log.
    #[must_use]
    pub fn with_log(mut self, log: LogEmitter) -> Self {
        self.log = Some(log);
        self
    }

    /// Check the memory auditor is installed. Returns its version line.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Precondition`] when the auditor is missing or unusable.
    pub fn check_preconditions(&mut self) -> Result<String, HarnessError> {
        match self.sandbox.probe() {
            Ok(version) => {
                self.log_with(LogLevel::Info, "precondition", |entry| {
                    entry
                        .with_outcome(Outcome::Pass)
                        .with_details(serde_json::json!({ "version": version }))
                });
                Ok(version)
            }
            Err(err) => {
                let message = err.to_string();
                self.log_with(LogLevel::Error, "precondition", |entry| {
                    entry
                        .with_outcome(Outcome::Error)
                        .with_details(serde_json::json!({ "error": message }))
                });
                self.flush_log();
                Err(HarnessError::Precondition(err))
            }
        }
    }

    /// Run `cases` in order, writing progress and the summary to `out`.
    ///
    /// # Errors
    ///
    /// Only when writing to `out` fails. Transient files are removed either way.
    pub fn run(
        &mut self,
        cases: &[TestCase],
        out: &mut dyn Write,
    ) -> std::io::Result<SuiteReport> {
        let started = Instant::now();
        self.log_with(LogLevel::Info, "suite_start", |entry| {
            entry.with_details(serde_json::json!({ "cases": cases.len() }))
        });

        let mut report = SuiteReport::new();
        let executed = self.run_cases(cases, &mut report, out);
        let cleaned = self.cleanup(out);
        executed?;
        cleaned?;

        out.write_all(report.render_summary().as_bytes())?;

        let totals = report.totals();
        let outcome = if report.all_passed() {
            Outcome::Pass
        } else {
            Outcome::Fail
        };
        self.log_with(LogLevel::Info, "suite_end", |entry| {
            entry
                .with_outcome(outcome)
                .with_duration_ms(millis(started.elapsed()))
                .with_details(serde_json::json!({
                    "total": totals.total,
                    "passed": totals.passed,
                    "failed": totals.failed,
                }))
        });
        self.flush_log();
        Ok(report)
    }

    fn run_cases(
        &mut self,
        cases: &[TestCase],
        report: &mut SuiteReport,
        out: &mut dyn Write,
    ) -> std::io::Result<()> {
        for case in cases {
            let buffer_size = case.buffer_size_or(self.default_buffer_size);
            writeln!(out, "\n--- Test: {} (BUFFER_SIZE={buffer_size}) ---", case.name)?;
            self.log_with(LogLevel::Info, "case_start", |entry| {
                entry.with_case(&case.name, buffer_size)
            });

            let started = Instant::now();
            let (verdict, exit_code) = self.run_case(case, buffer_size, out)?;
            let elapsed = started.elapsed();

            writeln!(
                out,
                "{} {}{}",
                verdict.glyph_for(case.role),
                verdict.headline(),
                verdict.role_note(case.role)
            )?;
            if let Some(detail) = verdict.detail() {
                writeln!(out, "{detail}")?;
            }

            let level = if verdict.passed() {
                LogLevel::Info
            } else {
                LogLevel::Warn
            };
            let headline = verdict.headline();
            let outcome = verdict.outcome();
            self.log_with(level, "case_result", |entry| {
                let entry = entry
                    .with_case(&case.name, buffer_size)
                    .with_outcome(outcome)
                    .with_duration_ms(millis(elapsed))
                    .with_details(serde_json::json!({
                        "headline": headline,
                        "role": case.role,
                    }));
                match exit_code {
                    Some(code) => entry.with_exit_code(code),
                    None => entry,
                }
            });

            report.record(CaseRecord {
                name: case.name.clone(),
                buffer_size,
                role: case.role,
                verdict,
            });
        }
        Ok(())
    }

    /// Build, execute and judge one case. Returns the verdict and the exit
    /// code when the artifact ran to completion.
    fn run_case(
        &mut self,
        case: &TestCase,
        buffer_size: i64,
        out: &mut dyn Write,
    ) -> std::io::Result<(CaseVerdict, Option<i32>)> {
        let configuration = BuildConfiguration::new(buffer_size);

        let expected = match expected_stdout(case) {
            Ok(expected) => expected,
            Err(err) => {
                let path = case.input.fixture_path().map(Path::display);
                let message = match path {
                    Some(path) => format!("cannot read fixture '{path}': {err}"),
                    None => format!("cannot determine expected output: {err}"),
                };
                return Ok((CaseVerdict::Setup { message }, None));
            }
        };

        let build = self.session.prepare(&self.compiler, configuration);
        let artifact = match build {
            Ok(CompileOutcome::Built(artifact)) => artifact,
            Ok(CompileOutcome::Rejected { diagnostic }) => {
                self.log_build(case, buffer_size, Outcome::Fail, None);
                return Ok((CaseVerdict::BuildFailed { diagnostic }, None));
            }
            Err(err) => {
                self.log_build(case, buffer_size, Outcome::Error, None);
                let message = err.to_string();
                return Ok((CaseVerdict::Toolchain { message }, None));
            }
        };
        self.log_build(case, buffer_size, Outcome::Pass, Some(artifact.sha256()));

        if self.session.artifact_for(configuration).is_none() {
            return Ok((
                CaseVerdict::Setup {
                    message: format!("no current artifact for {configuration}"),
                },
                None,
            ));
        }

        // Held across the execution; restores the mode on every return path.
        let guard = match &case.input {
            CaseInput::RevokedFixture { path } => match PermissionGuard::revoke(path) {
                Ok(guard) => {
                    if !guard.is_effective() {
                        writeln!(
                            out,
                            "! '{}' is still readable after revoking permissions \
                             (privileged user?); the read-error case cannot fail the open",
                            path.display()
                        )?;
                    }
                    Some(guard)
                }
                Err(err) => {
                    let message = format!(
                        "cannot revoke permissions on '{}': {err}",
                        path.display()
                    );
                    return Ok((CaseVerdict::Setup { message }, None));
                }
            },
            CaseInput::Fixture { .. } | CaseInput::Stdin { .. } => None,
        };

        let args = case.input.args();
        let outcome = self.sandbox.run(&RunRequest {
            artifact: &artifact,
            args: &args,
            stdin: case.input.stdin_payload(),
            timeout: self.timeout,
        });

        if let Some(guard) = guard {
            let path = guard.path().to_path_buf();
            if let Err(err) = guard.restore() {
                writeln!(
                    out,
                    "! failed to restore permissions on '{}': {err}",
                    path.display()
                )?;
            }
        }

        let verdict = match outcome {
            Err(err) => {
                let message = err.to_string();
                (CaseVerdict::Toolchain { message }, None)
            }
            Ok(RunOutcome::TimedOut { .. }) => (
                CaseVerdict::TimedOut {
                    after: self.timeout,
                },
                None,
            ),
            Ok(RunOutcome::Completed(raw)) => {
                let result = ExecutionResult::classify(raw, &self.auditor);
                (judge(case, expected.as_deref(), &result), result.exit_code)
            }
        };
        Ok(verdict)
    }

    fn cleanup(&mut self, out: &mut dyn Write) -> std::io::Result<()> {
        let failures = self.session.cleanup();
        let mut reported = Ok(());
        for (path, err) in &failures {
            if let Err(write_err) =
                writeln!(out, "! failed to remove '{}': {err}", path.display())
            {
                reported = Err(write_err);
            }
        }
        let outcome = if failures.is_empty() {
            Outcome::Pass
        } else {
            Outcome::Error
        };
        let paths: Vec<String> = failures
            .iter()
            .map(|(path, _)| path.display().to_string())
            .collect();
        self.log_with(LogLevel::Info, "cleanup", |entry| {
            entry
                .with_outcome(outcome)
                .with_details(serde_json::json!({ "not_removed": paths }))
        });
        reported
    }

    fn log_build(
        &mut self,
        case: &TestCase,
        buffer_size: i64,
        outcome: Outcome,
        sha: Option<&str>,
    ) {
        let compiler = self.compiler.name().to_string();
        let sha = sha.map(str::to_string);
        self.log_with(LogLevel::Info, "build", |entry| {
            let entry = entry
                .with_case(&case.name, buffer_size)
                .with_outcome(outcome)
                .with_details(serde_json::json!({ "compiler": compiler }));
            match sha {
                Some(sha) => entry.with_artifact(sha),
                None => entry,
            }
        });
    }

    /// Emit one event. A failing log is reported once and then disabled so
    /// the suite itself keeps running.
    fn log_with(
        &mut self,
        level: LogLevel,
        event: &str,
        fill: impl FnOnce(LogEntry) -> LogEntry,
    ) {
        let Some(log) = self.log.as_mut() else {
            return;
        };
        let entry = fill(log.entry(level, event));
        if let Err(err) = log.emit_entry(entry) {
            eprintln!("structured log disabled: {err}");
            self.log = None;
        }
    }

    fn flush_log(&mut self) {
        if let Some(log) = self.log.as_mut()
            && let Err(err) = log.flush()
        {
            eprintln!("structured log flush failed: {err}");
        }
    }
}

/// The exact stdout a case must produce, if any.
///
/// An explicit `expected_output` wins. Otherwise an oracle fixture case
/// expects the fixture's current bytes, read at run time. Observations,
/// revoked fixtures and stdin cases without an expectation return `None`.
///
/// # Errors
///
/// When an oracle fixture cannot be read.
pub fn expected_stdout(case: &TestCase) -> std::io::Result<Option<Vec<u8>>> {
    if let Some(expected) = &case.expected_output {
        return Ok(Some(expected.clone().into_bytes()));
    }
    match (&case.input, case.role) {
        (CaseInput::Fixture { path }, CaseRole::Oracle) => std::fs::read(path).map(Some),
        _ => Ok(None),
    }
}

/// Judge a completed execution against the case's expectations.
///
/// Exit status first (not for stdin cases), then stdout against
/// `expected_stdout`, then the leak verdict. Output cut short by an
/// abandoned reader is never judged.
#[must_use]
pub fn judge(
    case: &TestCase,
    expected_stdout: Option<&[u8]>,
    result: &ExecutionResult,
) -> CaseVerdict {
    if !result.capture_complete {
        return CaseVerdict::CaptureIncomplete;
    }
    if !case.input.is_stdin() && !case.expected_exit.accepts(result.exit_code) {
        return CaseVerdict::ExitStatus {
            expected: case.expected_exit,
            actual: result.exit_code,
            signal: result.signal,
        };
    }
    if let Some(expected) = expected_stdout
        && result.stdout != expected
    {
        return CaseVerdict::OutputMismatch {
            expected: String::from_utf8_lossy(expected).into_owned(),
            actual: result.stdout_lossy(),
        };
    }
    if result.leaked {
        return CaseVerdict::Leaked {
            audit_text: result.audit_text.clone(),
        };
    }
    CaseVerdict::Pass
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
