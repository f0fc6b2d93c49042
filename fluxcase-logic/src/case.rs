//! Case Model
//!
//! A case is one oracle: an argument vector and the set of outcomes a
//! correct analysis may predict for it.

use crate::error::ParseError;
use crate::parser;
use fluxcase_core::{Actual, ArgValue, OutcomeCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// One acceptable outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expected {
    /// A taxonomy category
    Category(OutcomeCategory),
    /// `*`: the call is expected not to terminate
    NonTermination,
}

impl Expected {
    /// Phrase as written in case text.
    pub fn phrase(self) -> &'static str {
        match self {
            Expected::Category(category) => category.phrase(),
            Expected::NonTermination => "*",
        }
    }

    /// Only a timeout satisfies non-termination; a timeout satisfies nothing else.
    pub fn accepts(self, actual: Actual) -> bool {
        match (self, actual) {
            (Expected::Category(expected), Actual::Completed(got)) => expected == got,
            (Expected::NonTermination, Actual::Timeout) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

/// The set of outcomes a case accepts. Never empty once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpectedOutcome(BTreeSet<Expected>);

impl ExpectedOutcome {
    /// Set holding one outcome.
    pub fn single(expected: Expected) -> Self {
        Self(BTreeSet::from([expected]))
    }

    /// Set holding one taxonomy category.
    pub fn category(category: OutcomeCategory) -> Self {
        Self::single(Expected::Category(category))
    }

    /// Add an outcome; `false` if already present.
    pub fn insert(&mut self, expected: Expected) -> bool {
        self.0.insert(expected)
    }

    /// Outcomes in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Expected> + '_ {
        self.0.iter().copied()
    }

    /// Number of distinct outcomes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Only before anything is inserted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `actual` is a member of the expected set.
    pub fn accepts(&self, actual: Actual) -> bool {
        self.0.iter().any(|expected| expected.accepts(actual))
    }

    /// Whether `*` is in the set.
    pub fn expects_nontermination(&self) -> bool {
        self.0.contains(&Expected::NonTermination)
    }

    /// Phrases in canonical order.
    pub fn phrases(&self) -> Vec<&'static str> {
        self.0.iter().map(|e| e.phrase()).collect()
    }
}

impl FromIterator<Expected> for ExpectedOutcome {
    fn from_iter<I: IntoIterator<Item = Expected>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for ExpectedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.phrases().join(" | "))
    }
}

/// A parsed case: `(args) -> outcome`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    /// Arguments in call order
    pub args: Vec<ArgValue>,
    /// Outcomes this case accepts
    pub expected: ExpectedOutcome,
}

impl Case {
    /// Case from parts.
    pub fn new(args: Vec<ArgValue>, expected: ExpectedOutcome) -> Self {
        Self { args, expected }
    }

    /// Parse `(args) -> outcome`.
    pub fn parse(src: &str) -> Result<Self, ParseError> {
        parser::parse_case(src)
    }

    /// Canonical argument text, `(a, b)`.
    pub fn args_text(&self) -> String {
        ArgValue::format_list(&self.args)
    }

    /// Whether the case expects `*`.
    pub fn expects_nontermination(&self) -> bool {
        self.expected.expects_nontermination()
    }
}

impl FromStr for Case {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Case::parse(s)
    }
}

impl fmt::Display for Case {
    /// Canonical form; parses back to an equal case.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.args_text(), self.expected)
    }
}
