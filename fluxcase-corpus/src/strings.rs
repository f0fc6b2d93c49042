//! String indexing, searching and comparison.

use fluxcase::prelude::*;

#[method]
#[case("() -> ok")]
fn empty_string_length() {
    flux_assert!(String::new().is_empty());
}

#[method]
#[case("() -> ok")]
fn string_length() {
    flux_assert!("hello".len() == 5);
}

#[method]
#[case("(\"abc\", \"def\") -> ok")]
#[case("(\"\", \"\") -> ok")]
fn concatenation(a: String, b: String) {
    let result = format!("{}{}", a, b);
    flux_assert!(result.len() >= a.len());
    flux_assert!(result.len() >= b.len());
}

#[method]
#[case("(\"hello\", 0) -> ok")]
#[case("(\"hello\", 5) -> out of bounds")]
#[case("(\"hello\", -1) -> out of bounds")]
fn char_at(s: String, index: i32) -> char {
    ops::char_at(&s, index)
}

#[method]
#[case("(\"hello\", \"h\") -> ok")]
#[case("(\"hello\", \"x\") -> assertion error")]
fn starts_with(s: String, prefix: String) {
    flux_assert!(s.starts_with(&prefix));
}

#[method]
#[case("(\"hello\", \"o\") -> ok")]
#[case("(\"hello\", \"x\") -> assertion error")]
fn ends_with(s: String, suffix: String) {
    flux_assert!(s.ends_with(&suffix));
}

#[method]
#[case("(\"hello world\", \" \") -> ok")]
fn split(s: String, delimiter: String) -> usize {
    let parts = s.split(delimiter.as_str()).count();
    flux_assert!(parts > 0);
    parts
}

#[method]
#[case("(\"  trim  \") -> ok")]
fn trim(s: String) {
    flux_assert!(s.trim().len() <= s.len());
}

#[method]
#[case("(\"HELLO\") -> ok")]
#[case("(\"hello\") -> ok")]
fn to_lower_case(s: String) -> String {
    let lower = s.to_lowercase();
    flux_assert!(lower.len() == s.len());
    lower
}

#[method]
#[case("(\"hello\") -> ok")]
#[case("(\"HELLO\") -> ok")]
fn to_upper_case(s: String) -> String {
    let upper = s.to_uppercase();
    flux_assert!(upper.len() == s.len());
    upper
}

#[method]
#[case("(\"hello\", \"ell\") -> ok")]
#[case("(\"hello\", \"xyz\") -> assertion error")]
fn contains(s: String, needle: String) {
    flux_assert!(s.contains(needle.as_str()));
}

fn index_of(s: &str, target: &str) -> i32 {
    s.find(target)
        .and_then(|i| i32::try_from(s[..i].chars().count()).ok())
        .unwrap_or(-1)
}

#[method]
#[case("(\"hello\", \"l\") -> ok")]
#[case("(\"hello\", \"x\") -> assertion error")]
fn index_of_found(s: String, target: String) -> i32 {
    let index = index_of(&s, &target);
    flux_assert!(index >= 0);
    index
}

#[method]
#[case("(\"hello\", 1, 4) -> ok")]
#[case("(\"hello\", 0, 10) -> out of bounds")]
#[case("(\"hello\", 3, 2) -> out of bounds")]
fn substring(s: String, start: i32, end: i32) -> String {
    ops::substring(&s, start, end)
}

#[method]
#[case("(\"hello\", \"hello\") -> ok")]
#[case("(\"hello\", \"world\") -> assertion error")]
fn equals(a: String, b: String) {
    flux_assert!(a == b);
}

#[method]
#[case("(\"Hello\", \"hello\") -> ok")]
#[case("(\"hello\", \"world\") -> assertion error")]
fn equals_ignore_case(a: String, b: String) {
    flux_assert!(a.eq_ignore_ascii_case(&b));
}

// Declares an argument the method does not take
#[method]
#[case("(\"abc\") -> ok")]
fn string_builder() {
    let mut sb = String::new();
    sb.push('a');
    sb.push('b');
    sb.push('c');
    flux_assert!(sb == "abc");
}

#[method]
#[case("(\"hello\", 'l', 'r') -> ok")]
fn replace(s: String, from: char, to: char) -> String {
    let replaced: String = s.chars().map(|c| if c == from { to } else { c }).collect();
    flux_assert!(replaced.chars().count() == s.chars().count());
    replaced
}

#[method]
#[case("(\"abc\", \"xyz\") -> assertion error")]
#[case("(\"abc\", \"abc\") -> ok")]
#[case("(\"xyz\", \"abc\") -> ok")]
fn compare_strings(a: String, b: String) {
    flux_assert!(a >= b);
}
