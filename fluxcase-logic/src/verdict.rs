//! Verdicts
//!
//! Comparison of an execution against a case's expected set, and the
//! aggregate counts reported per method and per corpus.

use crate::case::{Case, ExpectedOutcome};
use crate::error::ParseError;
use fluxcase_core::{Actual, Execution, HarnessError};
use serde::{Deserialize, Serialize};

/// Result of evaluating one case.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The actual outcome is in the expected set
    Match { actual: Actual },
    /// Well-formed evaluation whose outcome is not in the expected set
    Mismatch {
        /// Outcomes the case accepts
        expected: ExpectedOutcome,
        /// What the call did
        actual: Actual,
    },
    /// The harness could not produce a meaningful outcome
    HarnessError(HarnessError),
    /// The case text itself did not parse; the method was never called
    ParseError(ParseError),
}

/// Discriminant of a [`Verdict`], used for reporting and baselines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    /// Outcome in the expected set
    Match,
    /// Outcome outside the expected set
    Mismatch,
    /// No outcome could be produced
    HarnessError,
    /// Case text did not parse
    ParseError,
}

impl VerdictKind {
    /// Name used in reports and baselines.
    pub fn as_str(self) -> &'static str {
        match self {
            VerdictKind::Match => "match",
            VerdictKind::Mismatch => "mismatch",
            VerdictKind::HarnessError => "harness_error",
            VerdictKind::ParseError => "parse_error",
        }
    }
}

impl Verdict {
    /// Which kind of verdict this is.
    pub fn kind(&self) -> VerdictKind {
        match self {
            Verdict::Match { .. } => VerdictKind::Match,
            Verdict::Mismatch { .. } => VerdictKind::Mismatch,
            Verdict::HarnessError(_) => VerdictKind::HarnessError,
            Verdict::ParseError(_) => VerdictKind::ParseError,
        }
    }

    /// Whether the case matched.
    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Match { .. })
    }

    /// Actual outcome of an evaluated case.
    pub fn actual(&self) -> Option<Actual> {
        match self {
            Verdict::Match { actual } | Verdict::Mismatch { actual, .. } => Some(*actual),
            _ => None,
        }
    }

    /// Whether the call ran out of budget.
    pub fn is_timeout(&self) -> bool {
        self.actual() == Some(Actual::Timeout)
    }

    /// Diagnostic text for the non-matching kinds.
    pub fn message(&self) -> Option<String> {
        match self {
            Verdict::Match { .. } => None,
            Verdict::Mismatch { expected, actual } => {
                Some(format!("expected {}, got {}", expected, actual))
            }
            Verdict::HarnessError(err) => Some(err.to_string()),
            Verdict::ParseError(err) => Some(err.to_string()),
        }
    }
}

/// Compare one execution against the case's expectation.
pub fn compare(case: &Case, execution: &Execution) -> Verdict {
    match &execution.result {
        Ok(actual) if case.expected.accepts(*actual) => Verdict::Match { actual: *actual },
        Ok(actual) => Verdict::Mismatch {
            expected: case.expected.clone(),
            actual: *actual,
        },
        Err(err) => Verdict::HarnessError(err.clone()),
    }
}

/// Verdict counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictSummary {
    /// Cases recorded
    pub total: usize,
    /// Match verdicts
    pub matched: usize,
    /// Mismatch verdicts
    pub mismatched: usize,
    /// HarnessError verdicts
    pub harness_errors: usize,
    /// ParseError verdicts
    pub parse_errors: usize,
    /// Cases whose actual outcome was a timeout (matched or not)
    pub timeouts: usize,
}

impl VerdictSummary {
    /// Count one verdict.
    pub fn record(&mut self, verdict: &Verdict) {
        self.total += 1;
        match verdict.kind() {
            VerdictKind::Match => self.matched += 1,
            VerdictKind::Mismatch => self.mismatched += 1,
            VerdictKind::HarnessError => self.harness_errors += 1,
            VerdictKind::ParseError => self.parse_errors += 1,
        }
        if verdict.is_timeout() {
            self.timeouts += 1;
        }
    }

    /// Every case matched.
    pub fn all_matched(&self) -> bool {
        self.matched == self.total
    }
}

/// Aggregate verdicts into summary counts.
pub fn aggregate_verdicts<'a>(verdicts: impl IntoIterator<Item = &'a Verdict>) -> VerdictSummary {
    let mut summary = VerdictSummary::default();
    for verdict in verdicts {
        summary.record(verdict);
    }
    summary
}
