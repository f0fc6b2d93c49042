#![warn(missing_docs)]
//! Fluxcase Logic - Case Grammar and Verdicts
//!
//! Parses case strings into argument vectors and expected-outcome sets,
//! loads the registered corpus, and compares executions against cases.

mod case;
mod corpus;
mod error;
mod lexer;
mod parser;
mod verdict;

pub use case::{Case, Expected, ExpectedOutcome};
pub use corpus::{CaseEntry, Corpus, MethodUnderTest};
pub use error::{ParseError, ParseErrorKind};
pub use parser::{parse_args, parse_case, parse_expected};
pub use verdict::{Verdict, VerdictKind, VerdictSummary, aggregate_verdicts, compare};
