//! GitHub Summary Output
//!
//! Markdown suitable for `$GITHUB_STEP_SUMMARY`.

use crate::report::{CaseStatus, Report};

/// Generate a GitHub Actions step summary.
pub fn generate_github_summary(report: &Report) -> String {
    let s = &report.summary;
    let mut md = String::new();

    md.push_str("## Fluxcase Results\n\n");
    md.push_str("| Cases | Matched | Mismatched | Harness errors | Parse errors | Timeouts |\n");
    md.push_str("|------:|--------:|-----------:|---------------:|-------------:|---------:|\n");
    md.push_str(&format!(
        "| {} | {} | {} | {} | {} | {} |\n\n",
        s.total_cases, s.matched, s.mismatched, s.harness_errors, s.parse_errors, s.timeouts
    ));

    if let Some(baseline) = &report.baseline_meta {
        md.push_str(&format!(
            "Compared against baseline `{}`: {} case(s) changed.\n\n",
            baseline.git_commit.as_deref().unwrap_or("unknown"),
            s.changed_vs_baseline
        ));
    }

    let failures: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.status.is_failure())
        .collect();

    if failures.is_empty() {
        md.push_str(&format!(
            ":white_check_mark: All {} case(s) across {} method(s) matched.\n",
            s.total_cases, s.total_methods
        ));
        return md;
    }

    md.push_str("### Failures\n\n");
    md.push_str("| Method | Case | Expected | Actual | Status |\n");
    md.push_str("|--------|------|----------|--------|--------|\n");
    for r in failures {
        let actual = match r.status {
            CaseStatus::Mismatch => r.actual.clone().unwrap_or_default(),
            _ => r.message.clone().unwrap_or_default(),
        };
        md.push_str(&format!(
            "| `{}` | `{}` | {} | {} | {} |\n",
            r.method_id,
            cell(r.args.as_deref().unwrap_or(&r.source)),
            cell(&r.expected.join(" \\| ")),
            cell(&actual),
            r.status.as_str()
        ));
    }

    md
}

/// Keep table cells on one row.
fn cell(text: &str) -> String {
    text.replace('\n', " ").replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::{report, result};

    #[test]
    fn test_all_matched() {
        let md = generate_github_summary(&report(vec![result("a", 0, CaseStatus::Match, Some("ok"))]));
        assert!(md.contains("All 1 case(s) across 1 method(s) matched"));
        assert!(!md.contains("### Failures"));
    }

    #[test]
    fn test_failures_table() {
        let mut broken = result("a", 1, CaseStatus::HarnessError, None);
        broken.message = Some("arity mismatch: expected 0 arguments, got 1".to_string());
        let md = generate_github_summary(&report(vec![
            result("a", 0, CaseStatus::Mismatch, Some("divide by zero")),
            broken,
        ]));

        assert!(md.contains("### Failures"));
        assert!(md.contains("| divide by zero | mismatch |"));
        assert!(md.contains("arity mismatch"));
    }
}
