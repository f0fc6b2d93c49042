//! Report Building
//!
//! Turns execution results into the serializable report: one entry per
//! case in plan order, then per-method and corpus summaries.

use super::execution::CaseExecutionResult;
use super::metadata::build_report_meta;
use fluxcase_logic::Verdict;
use fluxcase_report::{CaseReportResult, CaseStatus, Report, ReportConfig, summarize};

/// Report status of a verdict
fn status_of(verdict: &Verdict) -> CaseStatus {
    match verdict {
        Verdict::Match { .. } => CaseStatus::Match,
        Verdict::Mismatch { .. } => CaseStatus::Mismatch,
        Verdict::HarnessError(_) => CaseStatus::HarnessError,
        Verdict::ParseError(_) => CaseStatus::ParseError,
    }
}

/// One report entry
pub fn case_report_result(result: &CaseExecutionResult) -> CaseReportResult {
    let def = result.def;
    let parsed = result.entry.parsed.as_ref().ok();

    CaseReportResult {
        method_id: def.id.to_string(),
        method_name: def.name.to_string(),
        class: def.class_name().to_string(),
        file: def.file.to_string(),
        line: def.line,
        tags: def.tags.iter().map(|t| t.as_str().to_string()).collect(),
        case_index: result.entry.index,
        source: result.entry.source.to_string(),
        args: parsed.map(|case| case.args_text()),
        expected: parsed
            .map(|case| {
                case.expected
                    .phrases()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        actual: result.verdict.actual().map(|a| a.phrase().to_string()),
        status: status_of(&result.verdict),
        message: result.verdict.message(),
        return_value: result.return_value.clone(),
        duration_ns: u64::try_from(result.duration.as_nanos()).unwrap_or(u64::MAX),
        baseline_change: None,
    }
}

/// Build a complete Report from execution results
///
/// # Arguments
/// * `results` - Case execution results in plan order
/// * `config` - Runner settings recorded in the metadata
/// * `total_duration_ms` - Wall-clock time of the whole run
pub fn build_report(
    results: &[CaseExecutionResult],
    config: ReportConfig,
    total_duration_ms: f64,
) -> Report {
    let results: Vec<CaseReportResult> = results.iter().map(case_report_result).collect();
    let (methods, mut summary) = summarize(&results);
    summary.total_duration_ms = total_duration_ms;

    Report {
        meta: build_report_meta(config),
        results,
        methods,
        summary,
        baseline_meta: None,
    }
}
