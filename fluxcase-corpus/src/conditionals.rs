//! Branching over integers and booleans.

use fluxcase::prelude::*;

#[method]
#[case("(5) -> ok")]
#[case("(0) -> ok")]
#[case("(-5) -> ok")]
fn if_else_chain(x: i32) {
    if x > 0 {
        flux_assert!(x > 0);
    } else if x < 0 {
        flux_assert!(x < 0);
    } else {
        flux_assert!(x == 0);
    }
}

#[method]
#[case("(true, true) -> ok")]
#[case("(true, false) -> assertion error")]
#[case("(false, true) -> ok")]
#[case("(false, false) -> ok")]
fn and_condition(a: bool, b: bool) {
    if a {
        flux_assert!(b);
    }
}

#[method]
#[case("(true, true) -> ok")]
#[case("(true, false) -> ok")]
#[case("(false, true) -> ok")]
#[case("(false, false) -> assertion error")]
fn or_condition(a: bool, b: bool) {
    flux_assert!(a || b);
}

#[method]
#[case("(true) -> assertion error")]
#[case("(false) -> ok")]
fn not_condition(a: bool) {
    flux_assert!(!a);
}

#[method]
#[case("(5, 10) -> ok")]
#[case("(10, 5) -> assertion error")]
fn comparison(a: i32, b: i32) {
    flux_assert!(a < b);
}

#[method]
#[case("(5) -> ok")]
#[case("(0) -> assertion error")]
#[case("(15) -> assertion error")]
fn range_check(x: i32) {
    flux_assert!((1..=10).contains(&x));
}

#[method]
#[case("(1) -> ok")]
#[case("(2) -> ok")]
#[case("(3) -> ok")]
#[case("(4) -> assertion error")]
fn switch_case(x: i32) {
    match x {
        1..=3 => {}
        _ => flux_assert!(false),
    }
}

#[method]
#[case("(10) -> ok")]
#[case("(5) -> assertion error")]
fn switch_with_fallthrough(x: i32) {
    match x {
        10 | 20 => flux_assert!(x >= 10),
        _ => flux_assert!(false),
    }
}

#[method]
#[case("(true, true, true) -> ok")]
#[case("(true, true, false) -> assertion error")]
#[case("(false, true, false) -> ok")]
fn nested_conditions(a: bool, b: bool, c: bool) {
    if a && b {
        flux_assert!(c);
    }
}

#[method]
#[case("(5, 3) -> ok")]
#[case("(3, 5) -> ok")]
fn max(a: i32, b: i32) -> i32 {
    if a > b { a } else { b }
}

#[method]
#[case("(5, 3) -> ok")]
#[case("(3, 5) -> ok")]
fn min(a: i32, b: i32) -> i32 {
    if a < b { a } else { b }
}

#[method]
#[case("(5, 3, 8) -> ok")]
fn min_max_range(a: i32, b: i32, c: i32) {
    let lo = min(a, min(b, c));
    let hi = max(a, max(b, c));
    flux_assert!(lo <= hi);
}

#[method]
#[case("(10) -> ok")]
#[case("(5) -> assertion error")]
fn ternary_operator(x: i32) {
    let result = if x > 5 { x } else { 0 };
    flux_assert!(result > 5);
}

#[method]
#[case("(0, 1) -> ok")]
#[case("(0, 0) -> ok")]
fn short_circuit_and(a: i32, b: i32) {
    if b != 0 && ops::div(a, b) > 0 {
        flux_assert!(a > 0);
    }
}

// `&` on bools evaluates both sides
#[method]
#[case("(1, 1) -> ok")]
#[case("(0, 0) -> divide by zero")]
fn no_short_circuit_bitwise(a: i32, b: i32) {
    if (b != 0) & (ops::div(a, b) > 0) {
        flux_assert!(a > 0);
    }
}

#[method]
#[case("(5) -> ok")]
#[case("(-5) -> ok")]
#[case("(0) -> ok")]
#[case("(-2147483648) -> assertion error")]
fn absolute_value(x: i32) {
    let abs = if x < 0 { x.wrapping_neg() } else { x };
    flux_assert!(abs >= 0);
}

#[method]
#[case("(100) -> ok")]
#[case("(50) -> assertion error")]
#[case("(0) -> assertion error")]
fn grade_evaluation(score: i32) {
    flux_assert!(score >= 90);
}

#[method(tags = "loop")]
#[case("(2020) -> ok")]
#[case("(2000) -> ok")]
#[case("(1900) -> assertion error")]
#[case("(2021) -> assertion error")]
fn leap_year(year: i32) {
    let leap = ops::rem(year, 4) == 0 && (ops::rem(year, 100) != 0 || ops::rem(year, 400) == 0);
    flux_assert!(leap);
}

#[method]
#[case("(5, 5) -> ok")]
#[case("(5, 3) -> assertion error")]
fn equality_check(a: i32, b: i32) {
    flux_assert!(a.wrapping_sub(b) == 0);
}
