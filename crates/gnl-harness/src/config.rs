//! Harness configuration.
//!
//! Defaults reproduce the classic layout: library sources in the current
//! directory, fixtures under `test_files/`, transient files `test_main.c`,
//! `gnl_test` and `valgrind_output.txt` next to the sources. Environment
//! variables adjust the toolchain; command-line flags are layered on top by
//! the binary.
//!
//! - `GNL_HARNESS_CC`: compiler program (default `gcc`)
//! - `GNL_HARNESS_VALGRIND`: memory auditor program (default `valgrind`)
//! - `GNL_HARNESS_TIMEOUT_SECS`: per-execution bound (default 5)

use std::path::{Path, PathBuf};
use std::time::Duration;

use gnl_toolchain::compiler::DEFAULT_CC;
use gnl_toolchain::driver::{DEFAULT_ENTRY_POINT, DEFAULT_HEADER};
use gnl_toolchain::sandbox::{DEFAULT_TIMEOUT, DEFAULT_VALGRIND};
use gnl_toolchain::{AuditedSandbox, CcCompiler, DriverSynthesizer};

use crate::cases::DEFAULT_BUFFER_SIZE;

pub const ENV_CC: &str = "GNL_HARNESS_CC";
pub const ENV_VALGRIND: &str = "GNL_HARNESS_VALGRIND";
pub const ENV_TIMEOUT_SECS: &str = "GNL_HARNESS_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Directory receiving the driver, artifact and audit report.
    pub work_dir: PathBuf,
    /// Directory holding the library sources and header.
    pub library_dir: PathBuf,
    pub fixture_dir: PathBuf,
    /// Library sources, relative to `library_dir`.
    pub sources: Vec<PathBuf>,
    pub header: String,
    pub entry_point: String,
    pub cc: String,
    pub valgrind: String,
    pub timeout: Duration,
    pub default_buffer_size: i64,
    pub driver_file: String,
    pub artifact_file: String,
    pub report_file: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            library_dir: PathBuf::from("."),
            fixture_dir: PathBuf::from("test_files"),
            sources: vec![
                PathBuf::from("get_next_line.c"),
                PathBuf::from("get_next_line_utils.c"),
            ],
            header: DEFAULT_HEADER.to_string(),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            cc: DEFAULT_CC.to_string(),
            valgrind: DEFAULT_VALGRIND.to_string(),
            timeout: DEFAULT_TIMEOUT,
            default_buffer_size: DEFAULT_BUFFER_SIZE,
            driver_file: String::from("test_main.c"),
            artifact_file: String::from("gnl_test"),
            report_file: String::from("valgrind_output.txt"),
        }
    }
}

impl HarnessConfig {
    /// Apply overrides from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Blank or unparsable values are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };
        if let Some(cc) = value(ENV_CC) {
            self.cc = cc;
        }
        if let Some(valgrind) = value(ENV_VALGRIND) {
            self.valgrind = valgrind;
        }
        if let Some(timeout) = value(ENV_TIMEOUT_SECS).and_then(|raw| parse_timeout_loose(&raw)) {
            self.timeout = timeout;
        }
        self
    }

    #[must_use]
    pub fn driver_path(&self) -> PathBuf {
        self.work_dir.join(&self.driver_file)
    }

    /// Joined with the work directory so the auditor never searches `PATH`.
    #[must_use]
    pub fn artifact_path(&self) -> PathBuf {
        self.work_dir.join(&self.artifact_file)
    }

    #[must_use]
    pub fn report_path(&self) -> PathBuf {
        self.work_dir.join(&self.report_file)
    }

    #[must_use]
    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.sources
            .iter()
            .map(|src| self.library_dir.join(src))
            .collect()
    }

    /// `-I` directory, needed only when the driver is not beside the header.
    #[must_use]
    pub fn include_dir(&self) -> Option<&Path> {
        (self.library_dir != self.work_dir).then_some(self.library_dir.as_path())
    }

    #[must_use]
    pub fn fixture(&self, name: &str) -> PathBuf {
        self.fixture_dir.join(name)
    }

    #[must_use]
    pub fn compiler(&self) -> CcCompiler {
        CcCompiler::new(&self.cc)
    }

    #[must_use]
    pub fn sandbox(&self) -> AuditedSandbox {
        AuditedSandbox::memcheck(&self.valgrind, self.report_path())
    }

    #[must_use]
    pub fn driver(&self) -> DriverSynthesizer {
        DriverSynthesizer::new(&self.header, &self.entry_point)
    }
}

/// Whole or fractional seconds; zero, negative and garbage are rejected.
#[must_use]
pub fn parse_timeout_loose(raw: &str) -> Option<Duration> {
    let raw = raw.trim().trim_end_matches('s').trim_end();
    let secs: f64 = raw.parse().ok()?;
    (secs.is_finite() && secs > 0.0).then(|| Duration::from_secs_f64(secs))
}
