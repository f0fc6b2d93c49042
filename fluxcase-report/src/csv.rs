//! CSV Output
//!
//! One row per case, in report order.

use crate::report::Report;

const HEADER: &[&str] = &[
    "method_id",
    "class",
    "method",
    "case_index",
    "args",
    "expected",
    "actual",
    "status",
    "duration_ns",
    "message",
];

/// Generate a CSV report.
pub fn generate_csv_report(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(&HEADER.join(","));
    out.push('\n');

    for r in &report.results {
        let row = [
            escape(&r.method_id),
            escape(&r.class),
            escape(&r.method_name),
            r.case_index.to_string(),
            escape(r.args.as_deref().unwrap_or("")),
            escape(&r.expected.join(" | ")),
            escape(r.actual.as_deref().unwrap_or("")),
            r.status.as_str().to_string(),
            r.duration_ns.to_string(),
            escape(r.message.as_deref().unwrap_or("")),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

/// Quote a field when it contains a separator, quote or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
