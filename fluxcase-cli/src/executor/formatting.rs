//! Output Formatting
//!
//! Human-readable output for case reports: results grouped by class, one
//! line per case with a status icon (✓/✗/💥/?), then a corpus summary.

use fluxcase_report::{CaseReportResult, CaseStatus, Report};

fn status_icon(status: CaseStatus) -> &'static str {
    match status {
        CaseStatus::Match => "✓",
        CaseStatus::Mismatch => "✗",
        CaseStatus::HarnessError => "💥",
        CaseStatus::ParseError => "?",
    }
}

fn case_line(result: &CaseReportResult) -> String {
    let input = result.args.as_deref().unwrap_or(&result.source);
    let mut line = format!(
        "    {} #{} {}",
        status_icon(result.status),
        result.case_index,
        input
    );
    match result.status {
        CaseStatus::Match => {
            line.push_str(&format!(" -> {}", result.actual.as_deref().unwrap_or("")));
        }
        CaseStatus::Mismatch => {
            line.push_str(&format!(
                " -> expected {}, got {}",
                result.expected.join(" | "),
                result.actual.as_deref().unwrap_or("")
            ));
        }
        CaseStatus::HarnessError | CaseStatus::ParseError => {
            line.push_str(&format!(
                "\n        {}: {}",
                result.status.as_str(),
                result.message.as_deref().unwrap_or("")
            ));
        }
    }
    if let Some(change) = &result.baseline_change {
        line.push_str(&format!(
            "  [was {}{}]",
            change.previous_status.as_str(),
            change
                .previous_actual
                .as_deref()
                .map(|a| format!(": {}", a))
                .unwrap_or_default()
        ));
    }
    line.push('\n');
    line
}

/// Format a report for human-readable terminal display
///
/// Only non-matching cases are listed unless `verbose` is set.
pub fn format_human_output(report: &Report, verbose: bool) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Fluxcase Results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    // Group by class, keeping declaration order of first appearance
    let mut groups: Vec<(&str, Vec<&CaseReportResult>)> = Vec::new();
    for result in &report.results {
        match groups.iter_mut().find(|(class, _)| *class == result.class) {
            Some((_, members)) => members.push(result),
            None => groups.push((&result.class, vec![result])),
        }
    }

    for (class, results) in groups {
        output.push_str(&format!("Class: {}\n", class));
        output.push_str(&"-".repeat(60));
        output.push('\n');

        let mut current_method: Option<&str> = None;
        for result in results {
            if current_method != Some(result.method_id.as_str()) {
                current_method = Some(result.method_id.as_str());
                let summary = report.methods.iter().find(|m| m.method_id == result.method_id);
                let (matched, total) = summary.map(|m| (m.matched, m.total)).unwrap_or((0, 0));
                let icon = if matched == total { "✓" } else { "✗" };
                output.push_str(&format!(
                    "  {} {} ({}/{})\n",
                    icon, result.method_name, matched, total
                ));
            }
            if verbose || result.status.is_failure() || result.baseline_change.is_some() {
                output.push_str(&case_line(result));
            }
        }
        output.push('\n');
    }

    if let Some(baseline) = &report.baseline_meta {
        output.push_str(&format!(
            "Baseline: {} ({})\n",
            baseline.git_commit.as_deref().unwrap_or("unknown commit"),
            baseline.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        if report.summary.changed_vs_baseline > 0 {
            output.push_str(&format!(
                "  {} case(s) changed verdict since the baseline; unstable results point at nondeterministic corpus methods\n",
                report.summary.changed_vs_baseline
            ));
        }
        output.push('\n');
    }

    // Summary
    let s = &report.summary;
    output.push_str("Summary\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "  Methods: {}  Cases: {}  Matched: {}  Mismatched: {}  Harness errors: {}  Parse errors: {}\n",
        s.total_methods, s.total_cases, s.matched, s.mismatched, s.harness_errors, s.parse_errors
    ));
    if s.timeouts > 0 {
        output.push_str(&format!("  Timeouts: {}\n", s.timeouts));
    }
    output.push_str(&format!("  Duration: {:.2} ms\n", s.total_duration_ms));

    output
}
