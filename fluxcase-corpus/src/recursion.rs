//! Self-calls, bounded and unbounded.

use fluxcase::prelude::*;

#[method(tags = "recursive")]
#[case("(0) -> ok")]
#[case("(10) -> ok")]
#[case("(-1) -> stack overflow")]
fn factorial(n: i64) -> i64 {
    let _frame = enter_frame();
    if n == 0 {
        1
    } else {
        n.wrapping_mul(factorial(n - 1))
    }
}

#[method(tags = "recursive")]
#[case("(20) -> ok")]
#[case("(-3) -> stack overflow")]
fn fibonacci(n: i32) -> i64 {
    fn fib(n: i32, a: i64, b: i64) -> i64 {
        let _frame = enter_frame();
        if n == 0 { a } else { fib(n - 1, b, a.wrapping_add(b)) }
    }
    fib(n, 0, 1)
}

#[method(tags = "recursive")]
#[case("(\"racecar\") -> ok")]
#[case("(\"fluxcase\") -> assertion error")]
#[case("(\"\") -> ok")]
fn palindrome(s: String) {
    fn check(chars: &[char]) -> bool {
        let _frame = enter_frame();
        match chars {
            [] | [_] => true,
            [first, middle @ .., last] => first == last && check(middle),
        }
    }
    let chars: Vec<char> = s.chars().collect();
    flux_assert!(check(&chars));
}

#[method(tags = "recursive")]
#[case("([I: 1, 3, 5, 7, 9], 7) -> ok")]
#[case("([I: 1, 3, 5, 7, 9], 4) -> assertion error")]
#[case("([I: ], 1) -> assertion error")]
fn binary_search(items: Vec<i32>, target: i32) -> i32 {
    fn search(items: &[i32], target: i32, lo: i32, hi: i32) -> i32 {
        let _frame = enter_frame();
        if lo > hi {
            return -1;
        }
        let mid = lo + ops::div(hi - lo, 2);
        let value = *ops::index(items, mid);
        if value == target {
            mid
        } else if value < target {
            search(items, target, mid + 1, hi)
        } else {
            search(items, target, lo, mid - 1)
        }
    }
    let last = i32::try_from(items.len()).unwrap_or(i32::MAX) - 1;
    let found = search(&items, target, 0, last);
    flux_assert!(found >= 0);
    found
}
