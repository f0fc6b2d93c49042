//! Sign and magnitude of numeric results.

use fluxcase::prelude::*;

#[method]
#[case("() -> ok")]
fn return_positive() -> i32 {
    1
}

#[method]
#[case("() -> ok")]
fn return_zero() -> i32 {
    0
}

#[method]
#[case("() -> ok")]
fn return_negative() -> i32 {
    -5
}

#[method]
#[case("(1.0, 2.5) -> ok")]
#[case("(-1.0, 2.0) -> ok")]
#[case("(-1.0, -2.0) -> ok")]
fn add_doubles(a: f64, b: f64) {
    flux_assert!(a + b > -1_000_000.0);
}

#[method]
#[case("(1.0, 2.5) -> ok")]
#[case("(3.0, 3.0) -> assertion error")]
fn compare_doubles(a: f64, b: f64) {
    flux_assert!(a < b);
}

#[method]
#[case("(\"foo\", \"bar\") -> ok")]
#[case("(\"hi\", \"baz\") -> ok")]
fn concat_strings(a: String, b: String) {
    let s = a + &b;
    flux_assert!(s.len() >= b.len());
}

#[method]
#[case("(5) -> ok")]
#[case("(0) -> ok")]
#[case("(-5) -> ok")]
fn classify_sign(x: i32) -> i32 {
    x.signum()
}

#[method]
#[case("(5, 5) -> ok")]
#[case("(5, -5) -> ok")]
#[case("(-5, -5) -> ok")]
#[case("(-999999, -1) -> assertion error")]
fn add_signs(a: i32, b: i32) {
    flux_assert!(a.wrapping_add(b) > -1_000_000);
}

#[method]
#[case("(5) -> ok")]
#[case("(0) -> assertion error")]
#[case("(-5) -> assertion error")]
fn require_positive(x: i32) {
    flux_assert!(x > 0);
}

#[method]
#[case("() -> ok")]
fn trivially_true() {
    flux_assert!(true);
}
