//! Built-in case table and the buffer-size sweep.

use crate::config::HarnessConfig;
use crate::fixtures::{CaseRole, TestCase};

/// Buffer size used by cases that do not choose one.
pub const DEFAULT_BUFFER_SIZE: i64 = 42;

/// Buffer sizes exercised by the sweep over the many-lines fixture.
pub const SWEEP_BUFFER_SIZES: &[i64] = &[1, 5, 42, 1000, 10_000_000];

pub const STDIN_PAYLOAD: &str = "Test d'entrée standard\nAvec plusieurs lignes\n";

/// Fixture reused by the invalid-configuration case and the sweep.
pub const SWEEP_FIXTURE: &str = "multiple_nl.txt";
pub const READ_ERROR_FIXTURE: &str = "read_error.txt";

/// Every fixture file the standard table reads.
pub const FIXTURE_FILES: &[&str] = &[
    "empty.txt",
    "1char.txt",
    "one_line_no_nl.txt",
    "only_nl.txt",
    "multiple_nl.txt",
    "variable_nls.txt",
    "lines_around_10.txt",
    "giant_line.txt",
    READ_ERROR_FIXTURE,
];

/// The eleven standard cases, in execution order.
#[must_use]
pub fn standard_cases(config: &HarnessConfig) -> Vec<TestCase> {
    let fixture = |name: &str, file: &str| TestCase::fixture(name, config.fixture(file));
    vec![
        fixture("Empty file", "empty.txt"),
        fixture("Single character", "1char.txt"),
        fixture("One line without newline", "one_line_no_nl.txt"),
        fixture("Only newlines", "only_nl.txt"),
        fixture("Multiple lines", SWEEP_FIXTURE),
        fixture("Variable newlines", "variable_nls.txt"),
        fixture("About ten lines", "lines_around_10.txt"),
        fixture("Giant line", "giant_line.txt"),
        TestCase::stdin_round_trip("Standard input", STDIN_PAYLOAD),
        fixture("Invalid BUFFER_SIZE", SWEEP_FIXTURE)
            .with_buffer_size(-1)
            .with_role(CaseRole::Observation),
        TestCase::revoked_fixture("Read error", config.fixture(READ_ERROR_FIXTURE)),
    ]
}

/// The many-lines fixture at each sweep size, named `BUFFER_SIZE=<n>`.
#[must_use]
pub fn sweep_cases(config: &HarnessConfig) -> Vec<TestCase> {
    SWEEP_BUFFER_SIZES
        .iter()
        .map(|&size| {
            TestCase::fixture(format!("BUFFER_SIZE={size}"), config.fixture(SWEEP_FIXTURE))
                .with_buffer_size(size)
        })
        .collect()
}

/// Assemble the run's case list.
///
/// `table` replaces the standard cases when given. `only` keeps the cases
/// whose name contains it.
#[must_use]
pub fn suite_cases(
    config: &HarnessConfig,
    table: Option<Vec<TestCase>>,
    include_sweep: bool,
    only: Option<&str>,
) -> Vec<TestCase> {
    let mut cases = table.unwrap_or_else(|| standard_cases(config));
    if include_sweep {
        cases.extend(sweep_cases(config));
    }
    if let Some(filter) = only {
        cases.retain(|case| case.name.contains(filter));
    }
    cases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{CaseInput, ExitExpectation};
    use std::path::Path;

    #[test]
    fn standard_table_order_and_shape() {
        let cases = standard_cases(&HarnessConfig::default());
        assert_eq!(cases.len(), 11);
        assert_eq!(
            cases[0].input,
            CaseInput::Fixture {
                path: "test_files/empty.txt".into()
            }
        );
        assert!(cases.iter().take(8).all(|c| c.buffer_size.is_none()));

        let stdin = &cases[8];
        assert_eq!(stdin.input.stdin_payload(), Some(STDIN_PAYLOAD.as_bytes()));
        assert_eq!(stdin.expected_output.as_deref(), Some(STDIN_PAYLOAD));

        let invalid = &cases[9];
        assert_eq!(invalid.buffer_size, Some(-1));
        assert_eq!(invalid.role, CaseRole::Observation);

        let denied = &cases[10];
        assert_eq!(denied.expected_exit, ExitExpectation::Failure);
        assert_eq!(
            denied.input.fixture_path(),
            Some(Path::new("test_files/read_error.txt"))
        );
    }

    #[test]
    fn every_fixture_in_table_is_listed() {
        for case in standard_cases(&HarnessConfig::default()) {
            if let Some(path) = case.input.fixture_path() {
                let file = path.file_name().unwrap().to_str().unwrap();
                assert!(FIXTURE_FILES.contains(&file), "{file} not listed");
            }
        }
    }

    #[test]
    fn sweep_follows_standard_cases() {
        let cases = suite_cases(&HarnessConfig::default(), None, true, None);
        assert_eq!(cases.len(), 16);
        let names: Vec<&str> = cases[11..].iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "BUFFER_SIZE=1",
                "BUFFER_SIZE=5",
                "BUFFER_SIZE=42",
                "BUFFER_SIZE=1000",
                "BUFFER_SIZE=10000000"
            ]
        );
        assert_eq!(cases[15].buffer_size, Some(10_000_000));
    }

    #[test]
    fn table_replaces_standard_cases_and_filter_applies() {
        let config = HarnessConfig::default();
        let table = vec![TestCase::fixture("custom", "x.txt")];
        assert_eq!(suite_cases(&config, Some(table.clone()), false, None), table);

        let only = suite_cases(&config, None, true, Some("BUFFER_SIZE"));
        // Invalid BUFFER_SIZE plus the five sweep entries.
        assert_eq!(only.len(), 6);
    }
}
