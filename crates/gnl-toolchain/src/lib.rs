//! External toolchain boundary for the gnl harness.
//!
//! This crate provides the three capabilities the harness coordinates, each
//! behind a trait so a different toolchain can be substituted:
//! - [`Compiler`]: sources + buffer-size configuration -> artifact or diagnostic
//! - [`Sandbox`]: artifact + args + optional stdin -> captured run or timeout
//! - [`LeakAuditor`]: raw audit report -> leaked or clean
//!
//! plus the [`DriverSynthesizer`] that writes the program compiled alongside
//! the library under test.

#![forbid(unsafe_code)]

pub mod audit;
pub mod compiler;
pub mod driver;
pub mod error;
pub mod process;
pub mod sandbox;

pub use audit::{LeakAuditor, LeakSummary, LeakVerdict, MemcheckClassifier};
pub use compiler::{
    BuildConfiguration, BuildRequest, CcCompiler, CompileOutcome, CompiledArtifact, Compiler,
};
pub use driver::DriverSynthesizer;
pub use error::ToolchainError;
pub use sandbox::{AuditedSandbox, ExecutionResult, RawExecution, RunOutcome, RunRequest, Sandbox};
