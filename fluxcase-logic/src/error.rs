//! Parse errors for case text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What went wrong while parsing a case string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    /// A character that starts no token
    #[error("unexpected character")]
    UnexpectedChar,
    /// A token out of place
    #[error("unexpected token")]
    UnexpectedToken,
    /// Input ended mid-case
    #[error("unexpected end of input")]
    UnexpectedEnd,
    /// `(` without `)` or the reverse
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    /// `[` without `]` or the reverse
    #[error("unbalanced brackets")]
    UnbalancedBrackets,
    /// `"` without its closing quote
    #[error("unterminated string literal")]
    UnterminatedString,
    /// `'` without its closing quote
    #[error("unterminated character literal")]
    UnterminatedChar,
    /// Digits that form no number
    #[error("malformed number")]
    InvalidNumber,
    /// Integer outside `i64`
    #[error("integer literal out of range")]
    IntegerOverflow,
    /// Double that is not finite
    #[error("double literal out of range")]
    DoubleOverflow,
    /// Unquoted word among other arguments
    #[error("bare identifier must be the only argument")]
    BareIdentifier,
    /// Array type letter other than `I`, `C`, `Z` or `D`
    #[error("unknown array element type")]
    BadArrayType,
    /// Array element of another kind
    #[error("array element does not match the array's type")]
    MixedArray,
    /// No `->` after the arguments
    #[error("expected `->`")]
    MissingArrow,
    /// Nothing after `->` or `|`
    #[error("expected an outcome")]
    MissingOutcome,
    /// Phrase outside the outcome taxonomy
    #[error("unknown outcome phrase")]
    UnknownOutcome,
    /// Text after the outcome
    #[error("trailing input")]
    TrailingInput,
}

/// A case string that could not be parsed.
///
/// `offset` is a byte offset into the source; `fragment` is the offending text.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind} at offset {offset}: `{fragment}`")]
pub struct ParseError {
    /// Error class
    pub kind: ParseErrorKind,
    /// Byte offset of the fragment
    pub offset: usize,
    /// Offending source text
    pub fragment: String,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, src: &str, start: usize, end: usize) -> Self {
        let end = end.clamp(start, src.len());
        let fragment = src.get(start..end).unwrap_or_default();
        Self {
            kind,
            offset: start,
            fragment: fragment.to_string(),
        }
    }
}
