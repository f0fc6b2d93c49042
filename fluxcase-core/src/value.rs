//! Argument Values
//!
//! Typed representation of the literals a case passes to a benchmark method,
//! plus the parameter types a method declares for them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded argument literal.
///
/// `Null` is its own variant so a `null` argument can be passed to a nullable
/// parameter. An empty `Array` is distinct from `Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ArgValue {
    /// Signed decimal integer
    Integer(i64),
    /// Floating literal (always written with a `.`)
    Double(f64),
    /// `true` / `false`
    Boolean(bool),
    /// Single-quoted character
    Char(char),
    /// Double-quoted string
    #[serde(rename = "string")]
    Str(String),
    /// The literal `null`
    Null,
    /// Homogeneous, ordered sequence
    Array(Vec<ArgValue>),
}

/// Coarse kind of a value, used for array homogeneity and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// `42`
    Integer,
    /// `1.5`
    Double,
    /// `true`
    Boolean,
    /// `'a'`
    Char,
    /// `"abc"`
    Str,
    /// `null`
    Null,
    /// `[I: 1, 2]`
    Array,
}

impl ValueKind {
    /// Whether `null` may stand in for a value of this kind.
    pub fn is_reference(self) -> bool {
        matches!(self, ValueKind::Str | ValueKind::Array | ValueKind::Null)
    }

    /// Name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Integer => "integer",
            ValueKind::Double => "double",
            ValueKind::Boolean => "boolean",
            ValueKind::Char => "char",
            ValueKind::Str => "string",
            ValueKind::Null => "null",
            ValueKind::Array => "array",
        }
    }
}

impl ArgValue {
    /// Coarse kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            ArgValue::Integer(_) => ValueKind::Integer,
            ArgValue::Double(_) => ValueKind::Double,
            ArgValue::Boolean(_) => ValueKind::Boolean,
            ArgValue::Char(_) => ValueKind::Char,
            ArgValue::Str(_) => ValueKind::Str,
            ArgValue::Null => ValueKind::Null,
            ArgValue::Array(_) => ValueKind::Array,
        }
    }

    /// Whether this is the `null` literal.
    pub fn is_null(&self) -> bool {
        matches!(self, ArgValue::Null)
    }

    /// Render a whole argument vector as `(a, b, c)`.
    pub fn format_list(values: &[ArgValue]) -> String {
        let inner: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        format!("({})", inner.join(", "))
    }
}

impl fmt::Display for ArgValue {
    /// Canonical literal text, re-parseable by the case grammar.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Integer(v) => write!(f, "{}", v),
            ArgValue::Double(v) => {
                let text = v.to_string();
                if text.contains('.') {
                    f.write_str(&text)
                } else {
                    write!(f, "{}.0", text)
                }
            }
            ArgValue::Boolean(v) => write!(f, "{}", v),
            ArgValue::Char(c) => write!(f, "'{}'", c),
            ArgValue::Str(s) => write!(f, "\"{}\"", s),
            ArgValue::Null => f.write_str("null"),
            ArgValue::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Declared type of a benchmark parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// 64-bit float
    Double,
    /// `true` or `false`
    Boolean,
    /// Unicode scalar
    Char,
    /// Non-null string
    Str,
    /// Sequence of the element type
    Array(Box<ParamType>),
    /// Accepts `null` as well as the inner type
    Nullable(Box<ParamType>),
}

impl ParamType {
    /// Shallow check that `value` could bind to this type.
    ///
    /// Range checks (e.g. an integer literal outside `i32`) happen at binding time.
    pub fn accepts(&self, value: &ArgValue) -> bool {
        match (self, value) {
            (ParamType::Nullable(_), ArgValue::Null) => true,
            (ParamType::Nullable(inner), other) => inner.accepts(other),
            (ParamType::Int | ParamType::Long, ArgValue::Integer(_)) => true,
            (ParamType::Double, ArgValue::Double(_)) => true,
            (ParamType::Boolean, ArgValue::Boolean(_)) => true,
            (ParamType::Char, ArgValue::Char(_)) => true,
            (ParamType::Str, ArgValue::Str(_)) => true,
            (ParamType::Array(elem), ArgValue::Array(items)) => {
                items.iter().all(|item| elem.accepts(item))
            }
            _ => false,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Int => f.write_str("int"),
            ParamType::Long => f.write_str("long"),
            ParamType::Double => f.write_str("double"),
            ParamType::Boolean => f.write_str("boolean"),
            ParamType::Char => f.write_str("char"),
            ParamType::Str => f.write_str("string"),
            ParamType::Array(elem) => write!(f, "{}[]", elem),
            ParamType::Nullable(inner) => write!(f, "{}?", inner),
        }
    }
}
