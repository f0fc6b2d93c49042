//! Faulting Operations
//!
//! Checked counterparts of the operations whose failure modes make up the
//! outcome taxonomy. Benchmark bodies call these instead of the native
//! operators so a fault surfaces as a typed [`Fault`] payload rather than a
//! plain panic.

use crate::outcome::Fault;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Unwind with `fault` as the panic payload.
#[track_caller]
pub fn raise(fault: Fault) -> ! {
    panic::panic_any(fault)
}

/// Assert a condition inside a benchmark body, raising [`Fault::Assertion`].
///
/// ```ignore
/// flux_assert!(x > 0);
/// ```
#[macro_export]
macro_rules! flux_assert {
    ($cond:expr $(,)?) => {
        if !$cond {
            $crate::ops::raise($crate::Fault::Assertion);
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::ops::raise($crate::Fault::Assertion);
        }
    };
}

/// Integer types with checked division.
pub trait Integral: Copy {
    /// Whether this is the zero divisor
    fn is_zero(self) -> bool;
    /// Truncating quotient; `MIN / -1` wraps
    fn wrapping_quot(self, rhs: Self) -> Self;
    /// Remainder with the dividend's sign; `MIN % -1` is zero
    fn wrapping_modulo(self, rhs: Self) -> Self;
}

macro_rules! impl_integral {
    ($($t:ty),*) => {
        $(
            impl Integral for $t {
                #[inline]
                fn is_zero(self) -> bool {
                    self == 0
                }

                #[inline]
                fn wrapping_quot(self, rhs: Self) -> Self {
                    self.wrapping_div(rhs)
                }

                #[inline]
                fn wrapping_modulo(self, rhs: Self) -> Self {
                    self.wrapping_rem(rhs)
                }
            }
        )*
    };
}

impl_integral!(i8, i16, i32, i64);

/// Truncating division; a zero divisor raises [`Fault::DivideByZero`].
///
/// `MIN / -1` wraps.
#[track_caller]
pub fn div<T: Integral>(lhs: T, rhs: T) -> T {
    if rhs.is_zero() {
        raise(Fault::DivideByZero);
    }
    lhs.wrapping_quot(rhs)
}

/// Remainder with the sign of the dividend; a zero divisor raises [`Fault::DivideByZero`].
#[track_caller]
pub fn rem<T: Integral>(lhs: T, rhs: T) -> T {
    if rhs.is_zero() {
        raise(Fault::DivideByZero);
    }
    lhs.wrapping_modulo(rhs)
}

/// Character at a zero-based position (counted in chars).
#[track_caller]
pub fn char_at(s: &str, index: i32) -> char {
    usize::try_from(index)
        .ok()
        .and_then(|i| s.chars().nth(i))
        .unwrap_or_else(|| raise(Fault::OutOfBounds))
}

/// Substring over the char range `begin..end`.
///
/// Raises [`Fault::OutOfBounds`] unless `0 <= begin <= end <= len`.
#[track_caller]
pub fn substring(s: &str, begin: i32, end: i32) -> String {
    let len = s.chars().count();
    let (Ok(b), Ok(e)) = (usize::try_from(begin), usize::try_from(end)) else {
        raise(Fault::OutOfBounds);
    };
    if b > e || e > len {
        raise(Fault::OutOfBounds);
    }
    s.chars().skip(b).take(e - b).collect()
}

/// Bounds-checked element access.
#[track_caller]
pub fn index<T>(items: &[T], i: i32) -> &T {
    usize::try_from(i)
        .ok()
        .and_then(|i| items.get(i))
        .unwrap_or_else(|| raise(Fault::OutOfBounds))
}

/// Bounds-checked mutable element access.
#[track_caller]
pub fn index_mut<T>(items: &mut [T], i: i32) -> &mut T {
    match usize::try_from(i) {
        Ok(i) if i < items.len() => &mut items[i],
        _ => raise(Fault::OutOfBounds),
    }
}

/// Allocate a default-filled array; a negative length raises [`Fault::NegativeArraySize`].
#[track_caller]
pub fn new_array<T: Default + Clone>(len: i32) -> Vec<T> {
    match usize::try_from(len) {
        Ok(len) => vec![T::default(); len],
        Err(_) => raise(Fault::NegativeArraySize),
    }
}

/// Downcast a dynamically typed value, raising [`Fault::ClassCast`] on a type mismatch.
#[track_caller]
pub fn cast<T: Any>(value: &dyn Any) -> &T {
    value
        .downcast_ref::<T>()
        .unwrap_or_else(|| raise(Fault::ClassCast))
}

/// Run `body`, handling exactly one fault kind.
///
/// Returns `Err(fault)` when `body` raised `handled`. Any other payload
/// (other faults, interruptions, plain panics) continues unwinding.
pub fn catching<T>(handled: Fault, body: impl FnOnce() -> T) -> Result<T, Fault> {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast_ref::<Fault>() {
            Some(fault) if *fault == handled => Err(*fault),
            _ => panic::resume_unwind(payload),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fault_of<T>(f: impl FnOnce() -> T) -> Option<Fault> {
        let payload = panic::catch_unwind(AssertUnwindSafe(f)).err()?;
        payload.downcast_ref::<Fault>().copied()
    }

    #[test]
    fn test_div_by_zero() {
        assert_eq!(fault_of(|| div(1, 0)), Some(Fault::DivideByZero));
        assert_eq!(fault_of(|| rem(1i64, 0)), Some(Fault::DivideByZero));
        assert_eq!(div(7, 2), 3);
        assert_eq!(rem(-7, 2), -1);
    }

    #[test]
    fn test_div_min_wraps() {
        assert_eq!(div(i32::MIN, -1), i32::MIN);
        assert_eq!(rem(i32::MIN, -1), 0);
    }

    #[test]
    fn test_char_at_bounds() {
        assert_eq!(char_at("hello", 1), 'e');
        assert_eq!(fault_of(|| char_at("hello", 5)), Some(Fault::OutOfBounds));
        assert_eq!(fault_of(|| char_at("hello", -1)), Some(Fault::OutOfBounds));
    }

    #[test]
    fn test_substring_bounds() {
        assert_eq!(substring("hello", 1, 3), "el");
        assert_eq!(substring("hello", 5, 5), "");
        assert_eq!(fault_of(|| substring("hello", 3, 2)), Some(Fault::OutOfBounds));
        assert_eq!(fault_of(|| substring("hello", 0, 6)), Some(Fault::OutOfBounds));
    }

    #[test]
    fn test_new_array_negative() {
        assert_eq!(new_array::<i32>(3), vec![0, 0, 0]);
        assert!(new_array::<i32>(0).is_empty());
        assert_eq!(
            fault_of(|| new_array::<i32>(-5)),
            Some(Fault::NegativeArraySize)
        );
    }

    #[test]
    fn test_cast() {
        let boxed: Box<dyn Any> = Box::new(42i32);
        assert_eq!(*cast::<i32>(&*boxed), 42);
        assert_eq!(
            fault_of(|| *cast::<String>(&*boxed) == "x"),
            Some(Fault::ClassCast)
        );
    }

    #[test]
    fn test_flux_assert() {
        assert_eq!(fault_of(|| crate::flux_assert!(1 > 2)), Some(Fault::Assertion));
        assert_eq!(fault_of(|| crate::flux_assert!(2 > 1)), None);
    }

    #[test]
    fn test_catching_handles_only_named_fault() {
        let handled = catching(Fault::DivideByZero, || div(1, 0));
        assert_eq!(handled, Err(Fault::DivideByZero));

        let escaped = fault_of(|| catching(Fault::NullPointer, || div(1, 0)));
        assert_eq!(escaped, Some(Fault::DivideByZero));
    }
}
