//! Leak classification of memory-auditor reports.
//!
//! The verdict is fail-closed: a report is clean only when it contains the
//! auditor's canonical "no leaks" phrase. Anything else, including an empty,
//! truncated or foreign-format report, reads as leaked.

use std::fmt;

/// Memcheck's line for an execution that freed every heap block.
pub const MEMCHECK_CLEAN_PHRASE: &str = "All heap blocks were freed -- no leaks are possible";

/// Outcome of classifying one audit report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeakVerdict {
    Clean,
    Leaked,
}

impl LeakVerdict {
    #[must_use]
    pub const fn is_leaked(self) -> bool {
        matches!(self, Self::Leaked)
    }
}

/// Capability: reduce raw audit text to a verdict.
pub trait LeakAuditor {
    fn classify(&self, report: &str) -> LeakVerdict;
}

/// Classifier for valgrind memcheck `--log-file` reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemcheckClassifier;

impl LeakAuditor for MemcheckClassifier {
    fn classify(&self, report: &str) -> LeakVerdict {
        if report.contains(MEMCHECK_CLEAN_PHRASE) {
            LeakVerdict::Clean
        } else {
            LeakVerdict::Leaked
        }
    }
}

/// Byte counts from a memcheck `LEAK SUMMARY`, for diagnostics only.
///
/// Never consulted for the verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeakSummary {
    pub definitely_lost: Option<u64>,
    pub indirectly_lost: Option<u64>,
    pub possibly_lost: Option<u64>,
    pub still_reachable: Option<u64>,
    pub errors: Option<u64>,
}

impl LeakSummary {
    #[must_use]
    pub fn parse(report: &str) -> Self {
        let mut summary = Self::default();
        for line in report.lines() {
            let body = strip_pid_prefix(line);
            if let Some(rest) = body.strip_prefix("definitely lost:") {
                summary.definitely_lost = leading_count(rest);
            } else if let Some(rest) = body.strip_prefix("indirectly lost:") {
                summary.indirectly_lost = leading_count(rest);
            } else if let Some(rest) = body.strip_prefix("possibly lost:") {
                summary.possibly_lost = leading_count(rest);
            } else if let Some(rest) = body.strip_prefix("still reachable:") {
                summary.still_reachable = leading_count(rest);
            } else if let Some(rest) = body.strip_prefix("ERROR SUMMARY:") {
                summary.errors = leading_count(rest);
            }
        }
        summary
    }

    /// True when none of the summary lines were found.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitely_lost.is_none()
            && self.indirectly_lost.is_none()
            && self.possibly_lost.is_none()
            && self.still_reachable.is_none()
            && self.errors.is_none()
    }
}

impl fmt::Display for LeakSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no leak summary in report");
        }
        let mut parts = Vec::new();
        for (label, value) in [
            ("definitely lost", self.definitely_lost),
            ("indirectly lost", self.indirectly_lost),
            ("possibly lost", self.possibly_lost),
            ("still reachable", self.still_reachable),
        ] {
            if let Some(bytes) = value {
                parts.push(format!("{label} {bytes} B"));
            }
        }
        if let Some(errors) = self.errors {
            parts.push(format!("{errors} error(s)"));
        }
        f.write_str(&parts.join(", "))
    }
}

/// `==1234==    definitely lost: ...` -> `definitely lost: ...`
fn strip_pid_prefix(line: &str) -> &str {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix("==")
        && let Some(end) = rest.find("==")
    {
        return rest[end + 2..].trim_start();
    }
    trimmed
}

fn leading_count(rest: &str) -> Option<u64> {
    let token = rest.split_whitespace().next()?;
    token.replace(',', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN_REPORT: &str = "\
==4242== HEAP SUMMARY:
==4242==     in use at exit: 0 bytes in 0 blocks
==4242==   total heap usage: 12 allocs, 12 frees, 5,120 bytes allocated
==4242==
==4242== All heap blocks were freed -- no leaks are possible
==4242==
==4242== ERROR SUMMARY: 0 errors from 0 contexts (suppressed: 0 from 0)
";

    const LEAKY_REPORT: &str = "\
==77== LEAK SUMMARY:
==77==    definitely lost: 1,024 bytes in 2 blocks
==77==    indirectly lost: 0 bytes in 0 blocks
==77==      possibly lost: 16 bytes in 1 blocks
==77==    still reachable: 0 bytes in 0 blocks
==77==         suppressed: 0 bytes in 0 blocks
==77== ERROR SUMMARY: 2 errors from 2 contexts (suppressed: 0 from 0)
";

    #[test]
    fn canonical_phrase_is_clean() {
        assert_eq!(MemcheckClassifier.classify(CLEAN_REPORT), LeakVerdict::Clean);
    }

    #[test]
    fn leak_summary_is_leaked() {
        assert_eq!(MemcheckClassifier.classify(LEAKY_REPORT), LeakVerdict::Leaked);
    }

    #[test]
    fn empty_report_fails_closed() {
        assert!(MemcheckClassifier.classify("").is_leaked());
    }

    #[test]
    fn truncated_phrase_fails_closed() {
        let truncated = "==1== All heap blocks were freed -- no leaks are";
        assert!(MemcheckClassifier.classify(truncated).is_leaked());
    }

    #[test]
    fn foreign_format_fails_closed() {
        let asan = "SUMMARY: AddressSanitizer: no leaks detected";
        assert!(MemcheckClassifier.classify(asan).is_leaked());
    }

    #[test]
    fn summary_parses_counts_with_separators() {
        let summary = LeakSummary::parse(LEAKY_REPORT);
        assert_eq!(summary.definitely_lost, Some(1024));
        assert_eq!(summary.indirectly_lost, Some(0));
        assert_eq!(summary.possibly_lost, Some(16));
        assert_eq!(summary.still_reachable, Some(0));
        assert_eq!(summary.errors, Some(2));
        assert_eq!(
            summary.to_string(),
            "definitely lost 1024 B, indirectly lost 0 B, possibly lost 16 B, still reachable 0 B, 2 error(s)"
        );
    }

    #[test]
    fn summary_of_clean_report_has_only_error_count() {
        let summary = LeakSummary::parse(CLEAN_REPORT);
        assert_eq!(summary.definitely_lost, None);
        assert_eq!(summary.errors, Some(0));
    }

    #[test]
    fn summary_of_garbage_is_empty() {
        let summary = LeakSummary::parse("segmentation fault (core dumped)");
        assert!(summary.is_empty());
        assert_eq!(summary.to_string(), "no leak summary in report");
    }
}
