//! Harness-level errors.
//!
//! Per-case failures never surface here; they become a
//! [`CaseVerdict`](crate::verify::CaseVerdict). These are the errors that stop
//! a run before or outside the case loop.

use std::path::PathBuf;

use gnl_toolchain::ToolchainError;

/// Exit status for a missing memory auditor.
pub const EXIT_PRECONDITION: u8 = 1;
/// Exit status for any other setup failure.
pub const EXIT_SETUP: u8 = 2;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// A mandatory external tool is absent; nothing was run.
    #[error("precondition failed: {0}")]
    Precondition(#[source] ToolchainError),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse case table '{}': {source}", .path.display())]
    CaseTable {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl HarnessError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit status for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Precondition(_) => EXIT_PRECONDITION,
            _ => EXIT_SETUP,
        }
    }
}
