//! Iteration whose termination is hard to decide.

use fluxcase::prelude::*;

#[method(tags = "loop")]
#[case("(0) -> assertion error")]
#[case("(24) -> ok")]
#[case("(27) -> ok")]
fn collatz(n: i32) -> u32 {
    flux_assert!(n > 0);
    let mut n = n;
    let mut steps = 0;
    while n != 1 {
        checkpoint();
        n = if ops::rem(n, 2) == 0 {
            ops::div(n, 2)
        } else {
            n.wrapping_mul(3).wrapping_add(1)
        };
        steps += 1;
    }
    steps
}

// Odd inputs step over zero forever
#[method(tags = "loop")]
#[case("(4) -> ok")]
#[case("(0) -> ok")]
#[case("(3) -> *")]
fn countdown_by_two(n: i32) -> u32 {
    let mut i = n;
    let mut steps = 0;
    while i != 0 {
        checkpoint();
        i = i.wrapping_sub(2);
        steps += 1;
    }
    steps
}

#[method(tags = "loop")]
#[case("(0) -> *")]
#[case("(1) -> ok")]
fn spin(n: i32) {
    loop {
        if n != 0 {
            break;
        }
        checkpoint();
    }
}
