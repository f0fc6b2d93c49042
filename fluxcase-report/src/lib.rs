#![warn(missing_docs)]
//! Reports of a corpus run
//!
//! A [`Report`] holds one [`CaseReportResult`] per declared case plus
//! per-method and corpus-wide tallies. It renders as JSON (also the
//! baseline format), CSV or a GitHub step summary.

mod baseline;
mod csv;
mod github;
mod json;
mod report;

pub use baseline::{BaselineComparison, compare_with_baseline};
pub use csv::generate_csv_report;
pub use github::generate_github_summary;
pub use json::{ReportError, generate_json_report, parse_json_report};
pub use report::{
    BaselineChange, CaseReportResult, CaseStatus, MethodSummary, Report, ReportConfig, ReportMeta,
    ReportSummary, SystemInfo, summarize,
};

/// Version of the report layout written into [`ReportMeta::schema_version`]
pub const SCHEMA_VERSION: u32 = 1;

/// Report renderings selectable with `--format`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Full report, reloadable as a baseline
    Json,
    /// Markdown for `$GITHUB_STEP_SUMMARY`
    GithubSummary,
    /// One row per case
    Csv,
    /// Terminal listing
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match s.to_ascii_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "github" | "github-summary" => OutputFormat::GithubSummary,
            "csv" => OutputFormat::Csv,
            "human" | "text" => OutputFormat::Human,
            other => {
                return Err(format!(
                    "unknown format '{}' (expected human, json, github or csv)",
                    other
                ));
            }
        };
        Ok(format)
    }
}
