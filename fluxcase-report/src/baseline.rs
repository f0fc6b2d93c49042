//! Baseline Comparison
//!
//! Marks cases whose verdict differs from a previous run. Cases are matched
//! by method id and declaration index.

use crate::report::{BaselineChange, CaseStatus, Report};
use std::collections::HashMap;

/// Outcome of comparing a report against a baseline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaselineComparison {
    /// Cases whose status or actual outcome changed
    pub changed: usize,
    /// Cases that failed in the baseline and match now
    pub fixed: usize,
    /// Cases that matched in the baseline and fail now
    pub broken: usize,
    /// Cases with no counterpart in the baseline
    pub new_cases: usize,
}

/// Annotate `report` with differences from `baseline`.
///
/// Sets [`Report::baseline_meta`], fills `baseline_change` on changed cases
/// and updates `summary.changed_vs_baseline`.
pub fn compare_with_baseline(report: &mut Report, baseline: &Report) -> BaselineComparison {
    report.baseline_meta = Some(baseline.meta.clone());

    let previous: HashMap<(&str, usize), (CaseStatus, Option<&str>)> = baseline
        .results
        .iter()
        .map(|r| (r.key(), (r.status, r.actual.as_deref())))
        .collect();

    let mut comparison = BaselineComparison::default();
    for result in &mut report.results {
        let Some(&(status, actual)) = previous.get(&result.key()) else {
            comparison.new_cases += 1;
            result.baseline_change = None;
            continue;
        };
        if status == result.status && actual == result.actual.as_deref() {
            result.baseline_change = None;
            continue;
        }

        comparison.changed += 1;
        match (status.is_failure(), result.status.is_failure()) {
            (true, false) => comparison.fixed += 1,
            (false, true) => comparison.broken += 1,
            _ => {}
        }
        result.baseline_change = Some(BaselineChange {
            previous_status: status,
            previous_actual: actual.map(str::to_string),
        });
    }

    report.summary.changed_vs_baseline = comparison.changed;
    comparison
}
