//! Per-case verdicts.

use std::time::Duration;

use gnl_toolchain::LeakSummary;
use serde::{Deserialize, Serialize};

use crate::diff::{PREVIEW_CHARS, escape_preview, render_diff};
use crate::fixtures::{CaseRole, ExitExpectation};
use crate::structured_log::Outcome;

/// How one case ended. Only [`CaseVerdict::Pass`] counts as a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum CaseVerdict {
    Pass,
    /// The compiler rejected the configuration.
    BuildFailed { diagnostic: String },
    /// A tool could not be run for this case.
    Toolchain { message: String },
    TimedOut { after: Duration },
    ExitStatus {
        expected: ExitExpectation,
        actual: Option<i32>,
        signal: Option<i32>,
    },
    OutputMismatch { expected: String, actual: String },
    /// A reader was abandoned while a descendant held the pipe open, so
    /// the captured output cannot be judged.
    CaptureIncomplete,
    Leaked { audit_text: String },
    /// The case's own preparation failed (fixture permissions and the like).
    Setup { message: String },
}

impl CaseVerdict {
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }

    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::Pass => Outcome::Pass,
            Self::TimedOut { .. } => Outcome::Timeout,
            Self::Toolchain { .. } | Self::Setup { .. } | Self::CaptureIncomplete => {
                Outcome::Error
            }
            Self::BuildFailed { .. }
            | Self::ExitStatus { .. }
            | Self::OutputMismatch { .. }
            | Self::Leaked { .. } => Outcome::Fail,
        }
    }

    /// Glyph printed before the headline: `✓`, `✗`, or `!` for a timeout.
    #[must_use]
    pub const fn glyph(&self) -> &'static str {
        match self {
            Self::Pass => "✓",
            Self::TimedOut { .. } => "!",
            _ => "✗",
        }
    }

    /// Glyph for a case with `role`. A build rejection of an observed
    /// configuration is a warning rather than a cross.
    #[must_use]
    pub const fn glyph_for(&self, role: CaseRole) -> &'static str {
        match (self, role) {
            (Self::BuildFailed { .. }, CaseRole::Observation) => "!",
            _ => self.glyph(),
        }
    }

    /// Suffix printed after the headline or case name.
    #[must_use]
    pub const fn role_note(&self, role: CaseRole) -> &'static str {
        match (self, role) {
            (_, CaseRole::Oracle) => "",
            (Self::BuildFailed { .. }, CaseRole::Observation) => {
                " (observed: rejected at build time)"
            }
            (_, CaseRole::Observation) => " (observed)",
        }
    }

    /// Short one-line description.
    #[must_use]
    pub fn headline(&self) -> String {
        match self {
            Self::Pass => "Test passed".to_string(),
            Self::BuildFailed { .. } => "Build failed".to_string(),
            Self::Toolchain { message } => format!("Toolchain error: {message}"),
            Self::TimedOut { after } => format!("Timeout after {:.1} seconds", after.as_secs_f64()),
            Self::ExitStatus {
                expected,
                actual,
                signal,
            } => match (actual, signal) {
                (Some(code), _) => format!(
                    "Program returned exit code {code} (expected {})",
                    expected.as_str()
                ),
                (None, Some(sig)) => format!(
                    "Program killed by signal {sig} (expected {})",
                    expected.as_str()
                ),
                (None, None) => {
                    format!("Program ended abnormally (expected {})", expected.as_str())
                }
            },
            Self::OutputMismatch { .. } => "Output does not match expected".to_string(),
            Self::CaptureIncomplete => {
                "Output capture incomplete (a child process kept stdout or stderr open)"
                    .to_string()
            }
            Self::Leaked { audit_text } => {
                format!("Memory leaks detected ({})", LeakSummary::parse(audit_text))
            }
            Self::Setup { message } => format!("Setup failed: {message}"),
        }
    }

    /// Multi-line diagnosis printed under a failure headline.
    #[must_use]
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::BuildFailed { diagnostic } => Some(diagnostic.clone()),
            Self::OutputMismatch { expected, actual } => Some(format!(
                "Expected: {}\nActual:   {}\n{}",
                escape_preview(expected, PREVIEW_CHARS),
                escape_preview(actual, PREVIEW_CHARS),
                render_diff(expected, actual)
            )),
            Self::Leaked { audit_text } if audit_text.trim().is_empty() => {
                Some("(audit report was empty or missing)".to_string())
            }
            Self::Leaked { audit_text } => Some(audit_text.clone()),
            Self::Pass
            | Self::Toolchain { .. }
            | Self::TimedOut { .. }
            | Self::ExitStatus { .. }
            | Self::CaptureIncomplete
            | Self::Setup { .. } => None,
        }
    }
}

/// One entry of the suite report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub name: String,
    pub buffer_size: i64,
    pub role: CaseRole,
    #[serde(flatten)]
    pub verdict: CaseVerdict,
}

impl CaseRecord {
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.verdict.passed()
    }

    /// `✓` for a pass, `!` for an observed build rejection, `✗` otherwise.
    #[must_use]
    pub const fn summary_glyph(&self) -> &'static str {
        match (&self.verdict, self.role) {
            (CaseVerdict::Pass, _) => "✓",
            (CaseVerdict::BuildFailed { .. }, CaseRole::Observation) => "!",
            _ => "✗",
        }
    }
}
