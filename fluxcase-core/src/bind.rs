//! Argument Binding
//!
//! Positional conversion of [`ArgValue`]s to the Rust parameter types a
//! benchmark method declares. The `#[method]` macro calls [`FromArg`] for
//! every parameter; a mismatch is a [`BindError`], never a coerced value.

use crate::ops::raise;
use crate::outcome::Fault;
use crate::value::{ArgValue, ParamType};
use thiserror::Error;

/// Errors raised while binding a case's arguments to a method signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The case supplies a different number of arguments
    #[error("arity mismatch: method takes {expected} argument(s), case supplies {got}")]
    Arity {
        /// Parameters of the method
        expected: usize,
        /// Arguments in the case
        got: usize,
    },

    /// An argument does not convert to its parameter's type
    #[error("argument {index}: expected {expected}, got {got}")]
    Type {
        /// Zero-based argument position
        index: usize,
        /// Declared parameter type
        expected: ParamType,
        /// Canonical text of the offending argument
        got: String,
    },
}

impl BindError {
    /// Type mismatch for the argument at `index`.
    pub fn type_mismatch(index: usize, expected: ParamType, got: &ArgValue) -> Self {
        BindError::Type {
            index,
            expected,
            got: got.to_string(),
        }
    }
}

/// Conversion from a parsed literal to a parameter type.
pub trait FromArg: Sized {
    /// Declared type, used for signature checks and diagnostics.
    fn param_type() -> ParamType;

    /// Convert, or `None` when the literal does not fit this type.
    fn from_arg(value: &ArgValue) -> Option<Self>;
}

impl FromArg for i32 {
    fn param_type() -> ParamType {
        ParamType::Int
    }

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Integer(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromArg for i64 {
    fn param_type() -> ParamType {
        ParamType::Long
    }

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromArg for f64 {
    fn param_type() -> ParamType {
        ParamType::Double
    }

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Double(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromArg for bool {
    fn param_type() -> ParamType {
        ParamType::Boolean
    }

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromArg for char {
    fn param_type() -> ParamType {
        ParamType::Char
    }

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Char(c) => Some(*c),
            _ => None,
        }
    }
}

impl FromArg for String {
    fn param_type() -> ParamType {
        ParamType::Str
    }

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl<T: FromArg> FromArg for Vec<T> {
    fn param_type() -> ParamType {
        ParamType::Array(Box::new(T::param_type()))
    }

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Array(items) => items.iter().map(T::from_arg).collect(),
            _ => None,
        }
    }
}

impl<T: FromArg> FromArg for Ref<T> {
    fn param_type() -> ParamType {
        ParamType::Nullable(Box::new(T::param_type()))
    }

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Null => Some(Ref::null()),
            other => T::from_arg(other).map(Ref::new),
        }
    }
}

/// A nullable reference.
///
/// Reading through a null `Ref` raises [`Fault::NullPointer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Ref<T>(Option<T>);

impl<T> Ref<T> {
    /// Non-null reference to `value`.
    pub fn new(value: T) -> Self {
        Ref(Some(value))
    }

    /// The null reference.
    pub fn null() -> Self {
        Ref(None)
    }

    /// Whether this is the null reference.
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// Dereference, faulting on null.
    #[track_caller]
    pub fn get(&self) -> &T {
        match &self.0 {
            Some(value) => value,
            None => raise(Fault::NullPointer),
        }
    }

    /// Mutable dereference, faulting on null.
    #[track_caller]
    pub fn get_mut(&mut self) -> &mut T {
        match &mut self.0 {
            Some(value) => value,
            None => raise(Fault::NullPointer),
        }
    }

    /// Borrow without faulting.
    pub fn as_option(&self) -> Option<&T> {
        self.0.as_ref()
    }
}

impl<T> Default for Ref<T> {
    fn default() -> Self {
        Ref::null()
    }
}

impl<T> From<Option<T>> for Ref<T> {
    fn from(value: Option<T>) -> Self {
        Ref(value)
    }
}
