//! Faults raised, caught and re-raised.

use fluxcase::Fault;
use fluxcase::prelude::*;
use std::any::Any;

#[method]
#[case("() -> null pointer")]
fn dereference_null() {
    let obj: Ref<String> = Ref::null();
    let _ = obj.get().clone();
}

#[method]
#[case("() -> ok")]
fn check_before_deref() {
    let obj: Ref<String> = Ref::null();
    if !obj.is_null() {
        let _ = obj.get().clone();
    }
}

#[method]
#[case("(true) -> ok")]
#[case("(false) -> null pointer")]
fn conditional_null(create: bool) {
    let obj = if create {
        Ref::new(String::from("object"))
    } else {
        Ref::null()
    };
    let _ = obj.get().clone();
}

#[method]
#[case("(5) -> ok")]
#[case("(0) -> null pointer")]
fn sometimes_null(x: i32) {
    let mut result: Ref<String> = Ref::null();
    if x > 0 {
        result = Ref::new(String::from("positive"));
    }
    flux_assert!(!result.get().is_empty());
}

#[method]
#[case("() -> class cast")]
fn bad_cast() {
    let obj: Box<dyn Any> = Box::new(String::from("string"));
    let _ = ops::cast::<i32>(&*obj);
}

#[method]
#[case("() -> ok")]
fn good_cast() {
    let obj: Box<dyn Any> = Box::new(String::from("string"));
    let s = ops::cast::<String>(&*obj);
    flux_assert!(s.len() == 6);
}

#[method]
#[case("(10) -> ok")]
#[case("(0) -> ok")]
#[case("(-5) -> negative array size")]
fn negative_array_size(size: i32) {
    let arr = ops::new_array::<i32>(size);
    flux_assert!(arr.len() == size as usize);
}

#[method]
#[case("() -> ok")]
fn catch_exception() {
    let caught = ops::catching(Fault::DivideByZero, || ops::div(1, 0));
    flux_assert!(caught.is_err());
}

// The handler covers the wrong fault kind, so the division escapes
#[method]
#[case("() -> divide by zero")]
fn uncaught_exception() {
    let _ = ops::catching(Fault::NullPointer, || ops::div(1, 0));
}

#[method]
#[case("(null) -> null pointer")]
#[case("(\"test\") -> ok")]
#[case("(\"\") -> ok")]
fn null_check(input: Ref<String>) -> usize {
    input.get().len()
}

#[method]
#[case("() -> ok")]
fn multiple_null_checks() {
    let a: Ref<String> = Ref::null();
    let b: Ref<String> = Ref::null();
    if a.is_null() && b.is_null() {
        return;
    }
    let _ = a.get().clone();
}

#[method]
#[case("() -> null pointer")]
fn null_in_array() {
    let arr = ops::new_array::<Ref<String>>(5);
    flux_assert!(!ops::index(&arr, 0).get().is_empty());
}

#[method]
#[case("() -> ok")]
fn initialized_array() {
    let arr = vec![Ref::new("a"), Ref::new("b"), Ref::new("c")];
    flux_assert!(!ops::index(&arr, 0).get().is_empty());
}

#[method]
#[case("([I: 1, 2, 3], 1) -> ok")]
#[case("([I: 1, 2, 3], 3) -> out of bounds")]
#[case("([I: ], 0) -> out of bounds")]
#[case("(null, 0) -> null pointer")]
fn array_access(arr: Ref<Vec<i32>>, i: i32) -> i32 {
    *ops::index(arr.get(), i)
}

#[method]
#[case("(3, 0) -> ok")]
#[case("(3, 3) -> out of bounds")]
#[case("(-1, 0) -> negative array size")]
fn array_store(size: i32, i: i32) -> Vec<i32> {
    let mut arr = ops::new_array::<i32>(size);
    *ops::index_mut(&mut arr, i) = 7;
    arr
}
