//! JSON Output
//!
//! The JSON report is also the baseline format, so it must reload.

use crate::SCHEMA_VERSION;
use crate::report::Report;
use thiserror::Error;

/// Why a saved report could not be used
#[derive(Debug, Error)]
pub enum ReportError {
    /// Not a report at all
    #[error("malformed report: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Written by an incompatible version
    #[error("report schema v{found} is not supported (expected v{})", SCHEMA_VERSION)]
    Schema {
        /// Version found in the file
        found: u32,
    },
}

/// Generate a prettified JSON report.
pub fn generate_json_report(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Parse a report previously written by [`generate_json_report`].
pub fn parse_json_report(json: &str) -> Result<Report, ReportError> {
    let report: Report = serde_json::from_str(json)?;
    match report.meta.schema_version {
        SCHEMA_VERSION => Ok(report),
        found => Err(ReportError::Schema { found }),
    }
}
