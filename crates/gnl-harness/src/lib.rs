//! Build-matrix and leak-audit harness for a `get_next_line`-style C library.
//!
//! This crate provides:
//! - Case table: the standard scenarios plus the buffer-size sweep, or a JSON table
//! - Build session: driver regeneration and a fresh compile per case
//! - Runner: sequential execution under the memory auditor with a wall-clock bound
//! - Report generation: console summary, JSON report, structured JSONL log

#![forbid(unsafe_code)]

pub mod cases;
pub mod config;
pub mod diff;
pub mod error;
pub mod fixtures;
pub mod permissions;
pub mod report;
pub mod runner;
pub mod session;
pub mod structured_log;
pub mod verify;

pub use config::HarnessConfig;
pub use error::HarnessError;
pub use fixtures::{CaseInput, CaseRole, CaseTable, ExitExpectation, TestCase};
pub use report::SuiteReport;
pub use runner::SuiteRunner;
pub use verify::{CaseRecord, CaseVerdict};
