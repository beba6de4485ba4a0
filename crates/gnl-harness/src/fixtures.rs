//! Test case model and case-table loading.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Where a case gets its input from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaseInput {
    /// Fixture path passed as the driver's only argument.
    Fixture { path: PathBuf },
    /// Payload fed through the default input stream.
    Stdin { payload: String },
    /// Fixture whose permissions are revoked for the duration of the case.
    RevokedFixture { path: PathBuf },
}

impl CaseInput {
    /// Arguments handed to the artifact.
    #[must_use]
    pub fn args(&self) -> Vec<OsString> {
        match self {
            Self::Fixture { path } | Self::RevokedFixture { path } => {
                vec![path.as_os_str().to_owned()]
            }
            Self::Stdin { .. } => Vec::new(),
        }
    }

    #[must_use]
    pub fn stdin_payload(&self) -> Option<&[u8]> {
        match self {
            Self::Stdin { payload } => Some(payload.as_bytes()),
            Self::Fixture { .. } | Self::RevokedFixture { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_stdin(&self) -> bool {
        matches!(self, Self::Stdin { .. })
    }

    #[must_use]
    pub fn fixture_path(&self) -> Option<&Path> {
        match self {
            Self::Fixture { path } | Self::RevokedFixture { path } => Some(path),
            Self::Stdin { .. } => None,
        }
    }
}

/// Exit status a non-stdin case must produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitExpectation {
    /// Exit code zero.
    #[default]
    Success,
    /// A non-zero exit code; death by signal does not qualify.
    Failure,
}

impl ExitExpectation {
    #[must_use]
    pub const fn accepts(self, exit_code: Option<i32>) -> bool {
        match (self, exit_code) {
            (Self::Success, Some(0)) => true,
            (Self::Failure, Some(code)) => code != 0,
            _ => false,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "exit code 0",
            Self::Failure => "non-zero exit code",
        }
    }
}

/// How a case's verdict should be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseRole {
    /// The verdict asserts required behavior.
    #[default]
    Oracle,
    /// The verdict records what the library did; no behavior is required.
    Observation,
}

/// One named scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub input: CaseInput,
    /// Exact stdout the driver must produce, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
    /// Buffer-size override; `None` uses the run's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<i64>,
    #[serde(default)]
    pub expected_exit: ExitExpectation,
    #[serde(default)]
    pub role: CaseRole,
}

impl TestCase {
    fn with_input(name: impl Into<String>, input: CaseInput) -> Self {
        Self {
            name: name.into(),
            input,
            expected_output: None,
            buffer_size: None,
            expected_exit: ExitExpectation::Success,
            role: CaseRole::Oracle,
        }
    }

    #[must_use]
    pub fn fixture(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::with_input(name, CaseInput::Fixture { path: path.into() })
    }

    /// A stdin case whose expected output is its own payload.
    #[must_use]
    pub fn stdin_round_trip(name: impl Into<String>, payload: impl Into<String>) -> Self {
        let payload = payload.into();
        Self {
            expected_output: Some(payload.clone()),
            ..Self::with_input(name, CaseInput::Stdin { payload })
        }
    }

    /// A fixture read with permissions revoked; the driver must fail to open it.
    #[must_use]
    pub fn revoked_fixture(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            expected_exit: ExitExpectation::Failure,
            ..Self::with_input(name, CaseInput::RevokedFixture { path: path.into() })
        }
    }

    #[must_use]
    pub const fn with_buffer_size(mut self, buffer_size: i64) -> Self {
        self.buffer_size = Some(buffer_size);
        self
    }

    #[must_use]
    pub const fn with_role(mut self, role: CaseRole) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }

    #[must_use]
    pub const fn buffer_size_or(&self, default: i64) -> i64 {
        match self.buffer_size {
            Some(size) => size,
            None => default,
        }
    }
}

/// A serialized list of cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseTable {
    /// Schema version.
    pub version: String,
    pub cases: Vec<TestCase>,
}

impl CaseTable {
    #[must_use]
    pub fn new(cases: Vec<TestCase>) -> Self {
        Self {
            version: String::from("v1"),
            cases,
        }
    }

    /// Load a case table from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the case table to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load a case table from a file path.
    ///
    /// # Errors
    ///
    /// [`HarnessError::Io`] when unreadable, [`HarnessError::CaseTable`] when
    /// malformed.
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            HarnessError::io(format!("failed to read case table '{}'", path.display()), err)
        })?;
        Self::from_json(&content).map_err(|source| HarnessError::CaseTable {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_expectation_rules() {
        assert!(ExitExpectation::Success.accepts(Some(0)));
        assert!(!ExitExpectation::Success.accepts(Some(1)));
        assert!(!ExitExpectation::Success.accepts(None));
        assert!(ExitExpectation::Failure.accepts(Some(1)));
        assert!(!ExitExpectation::Failure.accepts(Some(0)));
        assert!(
            !ExitExpectation::Failure.accepts(None),
            "a crash is not the distinguished failure outcome"
        );
    }

    #[test]
    fn constructors_set_case_shape() {
        let stdin = TestCase::stdin_round_trip("stdin", "a\nb");
        assert_eq!(stdin.expected_output.as_deref(), Some("a\nb"));
        assert!(stdin.input.args().is_empty());
        assert_eq!(stdin.input.stdin_payload(), Some(b"a\nb".as_slice()));

        let revoked = TestCase::revoked_fixture("denied", "test_files/read_error.txt");
        assert_eq!(revoked.expected_exit, ExitExpectation::Failure);
        assert_eq!(revoked.input.args(), [OsString::from("test_files/read_error.txt")]);

        let sized = TestCase::fixture("f", "x.txt").with_buffer_size(-1);
        assert_eq!(sized.buffer_size_or(42), -1);
        assert_eq!(TestCase::fixture("g", "x.txt").buffer_size_or(42), 42);
    }

    #[test]
    fn table_parses_minimal_json_with_defaults() {
        let table = CaseTable::from_json(
            r#"{
                "version":"v1",
                "cases":[
                    {"name":"empty","input":{"kind":"fixture","path":"test_files/empty.txt"}},
                    {"name":"stdin","input":{"kind":"stdin","payload":"x\n"},"expected_output":"x\n","buffer_size":1},
                    {"name":"denied","input":{"kind":"revoked_fixture","path":"r.txt"},"expected_exit":"failure","role":"observation"}
                ]
            }"#,
        )
        .expect("valid case table json");

        assert_eq!(table.cases.len(), 3);
        assert_eq!(table.cases[0].buffer_size, None);
        assert_eq!(table.cases[0].expected_exit, ExitExpectation::Success);
        assert_eq!(table.cases[0].role, CaseRole::Oracle);
        assert_eq!(table.cases[1].buffer_size, Some(1));
        assert!(table.cases[1].input.is_stdin());
        assert_eq!(table.cases[2].role, CaseRole::Observation);
        assert_eq!(
            table.cases[2].input.fixture_path(),
            Some(Path::new("r.txt"))
        );
    }

    #[test]
    fn table_survives_serialization() {
        let table = CaseTable::new(vec![
            TestCase::fixture("a", "a.txt"),
            TestCase::stdin_round_trip("b", "payload"),
        ]);
        let json = table.to_json().unwrap();
        assert_eq!(CaseTable::from_json(&json).unwrap(), table);
    }

    #[test]
    fn from_file_reports_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            CaseTable::from_file(&path),
            Err(HarnessError::CaseTable { .. })
        ));
        assert!(matches!(
            CaseTable::from_file(&dir.path().join("missing.json")),
            Err(HarnessError::Io { .. })
        ));
    }
}
