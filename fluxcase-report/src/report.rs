//! Report Data Structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Complete run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Where and how the run happened
    pub meta: ReportMeta,
    /// One entry per declared case, in plan order
    pub results: Vec<CaseReportResult>,
    /// Tallies per method
    pub methods: Vec<MethodSummary>,
    /// Corpus-wide tallies
    pub summary: ReportSummary,
    /// Metadata of the baseline this report was compared against
    #[serde(default)]
    pub baseline_meta: Option<ReportMeta>,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// Report layout version
    pub schema_version: u32,
    /// fluxcase version that wrote the report
    pub version: String,
    /// When the run finished
    pub timestamp: DateTime<Utc>,
    /// Commit hash, when run inside a git checkout
    pub git_commit: Option<String>,
    /// Current branch, when known
    pub git_branch: Option<String>,
    /// Host the run happened on
    pub system: SystemInfo,
    /// Runner settings in force
    pub config: ReportConfig,
}

/// Runner configuration captured in report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// `process` or `in-process`
    pub isolation: String,
    /// Worker processes or threads
    pub jobs: usize,
    /// Budget for loop/recursive and `*` cases
    pub loop_timeout_ms: u64,
    /// Budget for other cases, if any
    pub case_timeout_ms: Option<u64>,
    /// Checkpoint budget, if any
    pub max_steps: Option<u64>,
    /// Depth at which a stack overflow is raised
    pub max_depth: u32,
}

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system
    pub os: String,
    /// Kernel release or architecture
    pub os_version: String,
    /// CPU model name
    pub cpu: String,
    /// Logical cores
    pub cpu_cores: u32,
}

/// Verdict status of one case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Outcome in the expected set
    Match,
    /// Outcome outside the expected set
    Mismatch,
    /// No outcome could be produced
    HarnessError,
    /// Case text did not parse
    ParseError,
}

impl CaseStatus {
    /// Serialized name.
    pub fn as_str(self) -> &'static str {
        match self {
            CaseStatus::Match => "match",
            CaseStatus::Mismatch => "mismatch",
            CaseStatus::HarnessError => "harness_error",
            CaseStatus::ParseError => "parse_error",
        }
    }

    /// Anything but a match.
    pub fn is_failure(self) -> bool {
        !matches!(self, CaseStatus::Match)
    }
}

/// One case in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReportResult {
    /// Registered method id
    pub method_id: String,
    /// Function name
    pub method_name: String,
    /// Class the method is listed under
    pub class: String,
    /// Source file of the method
    pub file: String,
    /// Source line of the method
    pub line: u32,
    /// Method tags, e.g. `loop`
    pub tags: Vec<String>,
    /// Declaration index within the method
    pub case_index: usize,
    /// Case text as declared
    pub source: String,
    /// Canonical argument text; absent when the case did not parse
    pub args: Option<String>,
    /// Expected phrases; empty when the case did not parse
    pub expected: Vec<String>,
    /// Actual outcome phrase (`timeout` for a timeout); absent for errors
    pub actual: Option<String>,
    /// Verdict
    pub status: CaseStatus,
    /// Diagnostic for mismatches and errors
    pub message: Option<String>,
    /// `Debug` text of a non-unit return value
    pub return_value: Option<String>,
    /// Wall-clock time of the call
    pub duration_ns: u64,
    /// Set when the verdict differs from the baseline run
    #[serde(default)]
    pub baseline_change: Option<BaselineChange>,
}

impl CaseReportResult {
    /// Identity of the case across runs.
    pub fn key(&self) -> (&str, usize) {
        (&self.method_id, self.case_index)
    }

    /// Whether the call ran out of budget.
    pub fn is_timeout(&self) -> bool {
        self.actual.as_deref() == Some("timeout")
    }
}

/// Verdict of the same case in the baseline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineChange {
    /// Verdict in the baseline
    pub previous_status: CaseStatus,
    /// Actual outcome in the baseline
    pub previous_actual: Option<String>,
}

/// Counts for one method
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSummary {
    /// Registered method id
    pub method_id: String,
    /// Class the method is listed under
    pub class: String,
    /// Function name
    pub name: String,
    /// Cases of the method
    pub total: usize,
    /// Match verdicts
    pub matched: usize,
    /// Mismatch verdicts
    pub mismatched: usize,
    /// HarnessError verdicts
    pub harness_errors: usize,
    /// ParseError verdicts
    pub parse_errors: usize,
    /// Cases that ran out of budget
    pub timeouts: usize,
}

/// Report summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Methods in the run
    pub total_methods: usize,
    /// Cases in the run
    pub total_cases: usize,
    /// Match verdicts
    pub matched: usize,
    /// Mismatch verdicts
    pub mismatched: usize,
    /// HarnessError verdicts
    pub harness_errors: usize,
    /// ParseError verdicts
    pub parse_errors: usize,
    /// Cases that ran out of budget
    pub timeouts: usize,
    /// Cases whose verdict differs from the baseline
    pub changed_vs_baseline: usize,
    /// Sum of case durations
    pub total_duration_ms: f64,
}

impl ReportSummary {
    /// Any mismatch, harness error or parse error.
    pub fn has_failures(&self) -> bool {
        self.mismatched + self.harness_errors + self.parse_errors > 0
    }
}

/// Per-method and corpus summaries from case results (in result order).
pub fn summarize(results: &[CaseReportResult]) -> (Vec<MethodSummary>, ReportSummary) {
    let mut methods: Vec<MethodSummary> = Vec::new();
    let mut summary = ReportSummary::default();

    for result in results {
        let needs_new = methods
            .last()
            .is_none_or(|m| m.method_id != result.method_id);
        if needs_new {
            methods.push(MethodSummary {
                method_id: result.method_id.clone(),
                class: result.class.clone(),
                name: result.method_name.clone(),
                ..Default::default()
            });
        }
        let Some(method) = methods.last_mut() else {
            continue;
        };

        method.total += 1;
        summary.total_cases += 1;
        match result.status {
            CaseStatus::Match => {
                method.matched += 1;
                summary.matched += 1;
            }
            CaseStatus::Mismatch => {
                method.mismatched += 1;
                summary.mismatched += 1;
            }
            CaseStatus::HarnessError => {
                method.harness_errors += 1;
                summary.harness_errors += 1;
            }
            CaseStatus::ParseError => {
                method.parse_errors += 1;
                summary.parse_errors += 1;
            }
        }
        if result.is_timeout() {
            method.timeouts += 1;
            summary.timeouts += 1;
        }
        if result.baseline_change.is_some() {
            summary.changed_vs_baseline += 1;
        }
    }

    summary.total_methods = methods.len();
    (methods, summary)
}
