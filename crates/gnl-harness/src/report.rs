//! Suite report: ordered case records with mapping semantics.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::verify::CaseRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub records: Vec<CaseRecord>,
}

/// Flat totals written alongside the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    totals: ReportTotals,
    records: &'a [CaseRecord],
}

impl SuiteReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a case. A name recorded twice keeps its first position and
    /// its latest verdict.
    pub fn record(&mut self, record: CaseRecord) {
        match self.records.iter_mut().find(|r| r.name == record.name) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CaseRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    #[must_use]
    pub fn passes(&self) -> usize {
        self.records.iter().filter(|r| r.passed()).count()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn totals(&self) -> ReportTotals {
        let passed = self.passes();
        ReportTotals {
            total: self.total(),
            passed,
            failed: self.total() - passed,
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.passes() == self.total()
    }

    /// Human summary: one glyph line per case, then the pass count.
    #[must_use]
    pub fn render_summary(&self) -> String {
        let mut out = String::from("\n=== Test summary ===\n");
        for record in &self.records {
            let _ = writeln!(
                out,
                "{} {}{}",
                record.summary_glyph(),
                record.name,
                record.verdict.role_note(record.role)
            );
        }
        let _ = writeln!(out, "\nTests passed: {}/{}", self.passes(), self.total());
        out
    }

    /// Render the report as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&ReportDocument {
            totals: self.totals(),
            records: &self.records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::CaseRole;
    use crate::verify::CaseVerdict;

    fn record(name: &str, verdict: CaseVerdict) -> CaseRecord {
        CaseRecord {
            name: name.to_string(),
            buffer_size: 42,
            role: CaseRole::Oracle,
            verdict,
        }
    }

    fn leaked() -> CaseVerdict {
        CaseVerdict::Leaked {
            audit_text: String::new(),
        }
    }

    #[test]
    fn rerecording_replaces_in_place() {
        let mut report = SuiteReport::new();
        report.record(record("a", CaseVerdict::Pass));
        report.record(record("b", leaked()));
        report.record(record("a", leaked()));
        assert_eq!(report.total(), 2);
        assert_eq!(report.records[0].name, "a");
        assert!(!report.records[0].passed());
        assert_eq!(report.passes(), 0);
    }

    #[test]
    fn summary_lists_every_case_and_count() {
        let mut report = SuiteReport::new();
        report.record(record("Empty file", CaseVerdict::Pass));
        report.record(record("Giant line", leaked()));
        report.record(CaseRecord {
            role: CaseRole::Observation,
            ..record("Invalid BUFFER_SIZE", CaseVerdict::Pass)
        });
        let summary = report.render_summary();
        assert!(summary.contains("=== Test summary ==="));
        assert!(summary.contains("✓ Empty file\n"));
        assert!(summary.contains("✗ Giant line\n"));
        assert!(summary.contains("✓ Invalid BUFFER_SIZE (observed)\n"));
        assert!(summary.trim_end().ends_with("Tests passed: 2/3"));
    }

    #[test]
    fn observed_build_rejection_is_flagged_but_counted() {
        let mut report = SuiteReport::new();
        report.record(CaseRecord {
            role: CaseRole::Observation,
            ..record(
                "Invalid BUFFER_SIZE",
                CaseVerdict::BuildFailed {
                    diagnostic: "error: size".into(),
                },
            )
        });
        let summary = report.render_summary();
        assert!(summary.contains("! Invalid BUFFER_SIZE (observed: rejected at build time)\n"));
        assert!(summary.trim_end().ends_with("Tests passed: 0/1"));
    }

    #[test]
    fn empty_report_counts_zero() {
        let report = SuiteReport::new();
        assert!(report.render_summary().contains("Tests passed: 0/0"));
        assert!(report.all_passed());
    }

    #[test]
    fn json_has_totals_and_records() {
        let mut report = SuiteReport::new();
        report.record(record("a", CaseVerdict::Pass));
        report.record(record("b", leaked()));
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["totals"]["total"], 2);
        assert_eq!(value["totals"]["passed"], 1);
        assert_eq!(value["totals"]["failed"], 1);
        assert_eq!(value["records"][1]["verdict"], "leaked");
    }
}
