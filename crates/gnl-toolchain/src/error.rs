//! Error taxonomy for the external toolchain boundary.

use std::path::Path;

/// Failures raised while driving an external tool.
///
/// A rejected compile or a timed-out run is not an error at this layer; those
/// are ordinary outcomes ([`crate::CompileOutcome`], [`crate::RunOutcome`]).
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    /// The named program could not be found on `PATH` or at its given path.
    #[error("required tool `{tool}` is not installed or not on PATH")]
    ToolMissing { tool: String },

    /// The program started but did not answer a version probe sanely.
    #[error("required tool `{tool}` is unusable: {detail}")]
    ToolUnusable { tool: String, detail: String },

    /// The program exists but could not be started.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem work around a tool invocation failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The temporary stdin payload could not be materialized.
    #[error("failed to stage stdin payload: {source}")]
    TempInput {
        #[source]
        source: std::io::Error,
    },
}

impl ToolchainError {
    /// Classify a spawn failure: `NotFound` means the tool is absent.
    #[must_use]
    pub fn from_spawn(program: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::ToolMissing {
                tool: program.to_string(),
            }
        } else {
            Self::Spawn {
                program: program.to_string(),
                source,
            }
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn io_at(action: &str, path: &Path, source: std::io::Error) -> Self {
        Self::io(format!("failed to {action} '{}'", path.display()), source)
    }

    /// True when the error means a required tool is absent or unusable.
    #[must_use]
    pub const fn is_tool_missing(&self) -> bool {
        matches!(self, Self::ToolMissing { .. } | Self::ToolUnusable { .. })
    }
}
