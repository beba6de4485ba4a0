//! Diff rendering for output comparison.

use std::fmt::Write;

/// Longest escaped rendering of one side of a comparison.
pub const PREVIEW_CHARS: usize = 200;

/// Render a line diff between expected and actual output.
///
/// Lines are compared with their terminators, so a missing final newline
/// shows up as a difference. Each line is printed escaped and capped at
/// [`PREVIEW_CHARS`].
#[must_use]
pub fn render_diff(expected: &str, actual: &str) -> String {
    if expected == actual {
        return String::from("[identical]");
    }

    let expected_lines: Vec<&str> = expected.split_inclusive('\n').collect();
    let actual_lines: Vec<&str> = actual.split_inclusive('\n').collect();

    let mut out = String::new();
    out.push_str("--- expected\n");
    out.push_str("+++ actual\n");
    for i in 0..expected_lines.len().max(actual_lines.len()) {
        let e = expected_lines.get(i);
        let a = actual_lines.get(i);
        if e == a {
            continue;
        }
        let _ = writeln!(out, "@@ line {} @@", i + 1);
        if let Some(e) = e {
            let _ = writeln!(out, "-{}", escape_preview(e, PREVIEW_CHARS));
        }
        if let Some(a) = a {
            let _ = writeln!(out, "+{}", escape_preview(a, PREVIEW_CHARS));
        }
    }
    out
}

/// One-line escaped rendering, truncated to `max_chars`.
#[must_use]
pub fn escape_preview(text: &str, max_chars: usize) -> String {
    let escaped = format!("{text:?}");
    if escaped.chars().count() <= max_chars {
        return escaped;
    }
    let mut cut: String = escaped.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}
