//! Outcome Taxonomy
//!
//! The closed set of result categories, the typed faults benchmark bodies
//! raise, and the single table that maps a caught panic payload to a category.
//!
//! Classification is by payload type only. A panic that does not carry a
//! [`Fault`] (or an [`Interrupted`] marker) is reported as unmapped; its
//! message is kept for diagnostics and never inspected.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Category of an observed or expected result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeCategory {
    /// Returned normally
    Ok,
    /// `assertion error`
    AssertionError,
    /// `null pointer`
    NullPointer,
    /// `divide by zero`
    DivideByZero,
    /// `out of bounds`
    OutOfBounds,
    /// `class cast`
    ClassCast,
    /// `negative array size`
    NegativeArraySize,
    /// `stack overflow`
    StackOverflow,
}

/// Surface phrase for each category. Parsing and rendering both go through here.
const PHRASES: &[(OutcomeCategory, &str)] = &[
    (OutcomeCategory::Ok, "ok"),
    (OutcomeCategory::AssertionError, "assertion error"),
    (OutcomeCategory::NullPointer, "null pointer"),
    (OutcomeCategory::DivideByZero, "divide by zero"),
    (OutcomeCategory::OutOfBounds, "out of bounds"),
    (OutcomeCategory::ClassCast, "class cast"),
    (OutcomeCategory::NegativeArraySize, "negative array size"),
    (OutcomeCategory::StackOverflow, "stack overflow"),
];

impl OutcomeCategory {
    /// All categories in taxonomy order.
    pub const ALL: [OutcomeCategory; 8] = [
        OutcomeCategory::Ok,
        OutcomeCategory::AssertionError,
        OutcomeCategory::NullPointer,
        OutcomeCategory::DivideByZero,
        OutcomeCategory::OutOfBounds,
        OutcomeCategory::ClassCast,
        OutcomeCategory::NegativeArraySize,
        OutcomeCategory::StackOverflow,
    ];

    /// Surface phrase used in case text and reports.
    pub fn phrase(self) -> &'static str {
        PHRASES
            .iter()
            .find(|(category, _)| *category == self)
            .map(|(_, phrase)| *phrase)
            .unwrap_or("ok")
    }

    /// Exact lookup; callers normalise whitespace first.
    pub fn from_phrase(phrase: &str) -> Option<Self> {
        PHRASES
            .iter()
            .find(|(_, p)| *p == phrase)
            .map(|(category, _)| *category)
    }
}

impl fmt::Display for OutcomeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

/// A fault raised by a benchmark body.
///
/// Raised with [`raise`](crate::ops::raise) as a panic payload so it unwinds
/// to the call boundary. Every variant maps to exactly one non-`Ok` category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fault {
    /// An assertion evaluated to false
    Assertion,
    /// Dereference of a null reference
    NullPointer,
    /// Integer division or remainder by zero
    DivideByZero,
    /// Index or substring range violation
    OutOfBounds,
    /// Invalid type conversion
    ClassCast,
    /// Array allocation with a negative length
    NegativeArraySize,
    /// Call depth exceeded the configured maximum
    StackOverflow,
}

impl Fault {
    /// The category this fault is reported as.
    pub fn category(self) -> OutcomeCategory {
        match self {
            Fault::Assertion => OutcomeCategory::AssertionError,
            Fault::NullPointer => OutcomeCategory::NullPointer,
            Fault::DivideByZero => OutcomeCategory::DivideByZero,
            Fault::OutOfBounds => OutcomeCategory::OutOfBounds,
            Fault::ClassCast => OutcomeCategory::ClassCast,
            Fault::NegativeArraySize => OutcomeCategory::NegativeArraySize,
            Fault::StackOverflow => OutcomeCategory::StackOverflow,
        }
    }

    /// Inverse of [`Fault::category`]; `Ok` has no fault.
    pub fn from_category(category: OutcomeCategory) -> Option<Self> {
        match category {
            OutcomeCategory::Ok => None,
            OutcomeCategory::AssertionError => Some(Fault::Assertion),
            OutcomeCategory::NullPointer => Some(Fault::NullPointer),
            OutcomeCategory::DivideByZero => Some(Fault::DivideByZero),
            OutcomeCategory::OutOfBounds => Some(Fault::OutOfBounds),
            OutcomeCategory::ClassCast => Some(Fault::ClassCast),
            OutcomeCategory::NegativeArraySize => Some(Fault::NegativeArraySize),
            OutcomeCategory::StackOverflow => Some(Fault::StackOverflow),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category().phrase())
    }
}

/// Unwind marker for a call stopped at a budget point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    /// The harness abandoned the call after its wall-clock budget
    Cancelled,
    /// The step budget counted by `checkpoint()` ran out
    StepsExhausted,
}

/// What a single invocation actually did, as seen at the method boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "category", rename_all = "snake_case")]
pub enum Actual {
    /// Completed (normally or by an escaping fault)
    Completed(OutcomeCategory),
    /// Exceeded its execution budget
    Timeout,
}

impl Actual {
    /// Phrase for reports; `timeout` for a timeout.
    pub fn phrase(self) -> &'static str {
        match self {
            Actual::Completed(category) => category.phrase(),
            Actual::Timeout => "timeout",
        }
    }
}

impl fmt::Display for Actual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

/// Result of classifying a caught panic payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// A typed fault
    Fault(Fault),
    /// A cancellation or step-budget stop
    Interrupted(Interrupted),
    /// Payload outside the taxonomy; carries the panic message if it had one
    Unmapped(String),
}

/// Map a panic payload to its classification.
pub fn classify_panic(payload: &(dyn Any + Send)) -> Classified {
    if let Some(fault) = payload.downcast_ref::<Fault>() {
        return Classified::Fault(*fault);
    }
    if let Some(interrupted) = payload.downcast_ref::<Interrupted>() {
        return Classified::Interrupted(*interrupted);
    }
    Classified::Unmapped(panic_message(payload))
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_table_is_bijective() {
        for category in OutcomeCategory::ALL {
            assert_eq!(OutcomeCategory::from_phrase(category.phrase()), Some(category));
        }
        assert_eq!(OutcomeCategory::from_phrase("segfault"), None);
    }

    #[test]
    fn test_each_fault_has_a_dedicated_category() {
        let faults = [
            Fault::Assertion,
            Fault::NullPointer,
            Fault::DivideByZero,
            Fault::OutOfBounds,
            Fault::ClassCast,
            Fault::NegativeArraySize,
            Fault::StackOverflow,
        ];
        let mut seen = std::collections::HashSet::new();
        for fault in faults {
            let category = fault.category();
            assert_ne!(category, OutcomeCategory::Ok);
            assert!(seen.insert(category), "{category} mapped twice");
            assert_eq!(Fault::from_category(category), Some(fault));
        }
    }

    #[test]
    fn test_classify_typed_payload() {
        let payload: Box<dyn Any + Send> = Box::new(Fault::DivideByZero);
        assert_eq!(
            classify_panic(payload.as_ref()),
            Classified::Fault(Fault::DivideByZero)
        );
    }

    #[test]
    fn test_classify_plain_panic_is_unmapped() {
        let payload: Box<dyn Any + Send> = Box::new("attempt to divide by zero");
        assert_eq!(
            classify_panic(payload.as_ref()),
            Classified::Unmapped("attempt to divide by zero".to_string())
        );
    }

    #[test]
    fn test_timeout_phrase() {
        assert_eq!(Actual::Timeout.to_string(), "timeout");
        assert_eq!(
            Actual::Completed(OutcomeCategory::OutOfBounds).to_string(),
            "out of bounds"
        );
    }
}
