//! Integration tests for Fluxcase
//!
//! These tests register methods through the attribute macros and drive the
//! parser, invocation harness and comparator end to end.

use fluxcase::prelude::*;
use fluxcase::{
    Actual, CallLimits, HarnessError, OutcomeCategory, Tag, Verdict, VerdictKind, compare,
    execute, execute_with_budget, find_method, parse_args, parse_case,
};
use fluxcase_cli::{ExecutionConfig, Executor, build_plan, build_report};
use fluxcase_report::{CaseStatus, ReportConfig};
use std::any::Any;
use std::time::Duration;

#[method(class = "Arithmetic")]
#[case("(4, 2) -> ok")]
#[case("(1, 0) -> divide by zero")]
#[case("(1, 0) -> ok")]
fn divide(a: i32, b: i32) -> i32 {
    ops::div(a, b)
}

#[method(class = "Strings")]
#[case("(\"abc\", 1) -> ok")]
#[case("(\"abc\", 5) -> out of bounds")]
fn char_at(s: String, i: i32) -> char {
    ops::char_at(&s, i)
}

#[method(class = "Objects")]
#[case("(null) -> null pointer")]
#[case("(\"x\") -> ok")]
fn length(s: Ref<String>) -> usize {
    s.get().len()
}

#[method(class = "Arrays")]
#[case("(-1) -> negative array size")]
#[case("(3) -> ok")]
fn allocate(n: i32) -> usize {
    ops::new_array::<i32>(n).len()
}

#[method(class = "Objects")]
#[case("(true) -> class cast")]
#[case("(false) -> ok")]
fn downcast(boxed_int: bool) -> usize {
    let value: Box<dyn Any> = if boxed_int {
        Box::new(1_i32)
    } else {
        Box::new(String::from("text"))
    };
    ops::cast::<String>(&*value).len()
}

#[method(class = "Asserts")]
#[case("(0) -> assertion error")]
#[case("(1) -> ok | assertion error")]
#[case("(1 -> ok")]
#[case("(1, 2) -> ok")]
fn positive(x: i32) {
    flux_assert!(x > 0);
}

#[method(class = "Calls", tags = "recursive")]
#[case("(10) -> ok")]
#[case("(100000) -> stack overflow")]
fn depth(n: i64) -> i64 {
    let _frame = enter_frame();
    if n == 0 { 0 } else { 1 + depth(n - 1) }
}

#[method(class = "Loops", tags = "loop")]
#[case("(0) -> *")]
#[case("(1) -> ok")]
fn spin(n: i32) -> i32 {
    let mut count = 0;
    loop {
        if n != 0 {
            break;
        }
        checkpoint();
        count += 1;
    }
    count
}

#[method(class = "Loops")]
#[case("() -> ok")]
fn unmapped() {
    panic!("plain panic outside the taxonomy");
}

fn run_case(method: &str, input: &str) -> fluxcase::Execution {
    let def = find_method(method).unwrap();
    let args = parse_args(input).unwrap();
    if def.is_budgeted() {
        execute_with_budget(
            def,
            args,
            CallLimits::default(),
            Duration::from_millis(200),
            None,
        )
    } else {
        execute(def, &args, CallLimits::default())
    }
}

#[test]
fn test_registration_metadata() {
    let def = find_method("Arithmetic::divide").unwrap();
    assert_eq!(def.id, "integration::divide");
    assert_eq!(def.signature(), "divide(int, int)");
    assert_eq!(def.cases.len(), 3);

    let depth = find_method("depth").unwrap();
    assert!(depth.has_tag(Tag::Recursive));
    assert!(depth.is_budgeted());
}

#[test]
fn test_every_fault_category_is_reachable() {
    let cases = [
        ("divide", "(1, 0)", OutcomeCategory::DivideByZero),
        ("char_at", "(\"abc\", 5)", OutcomeCategory::OutOfBounds),
        ("length", "(null)", OutcomeCategory::NullPointer),
        ("allocate", "(-1)", OutcomeCategory::NegativeArraySize),
        ("downcast", "(true)", OutcomeCategory::ClassCast),
        ("positive", "(0)", OutcomeCategory::AssertionError),
        ("depth", "(100000)", OutcomeCategory::StackOverflow),
        ("divide", "(4, 2)", OutcomeCategory::Ok),
    ];

    for (method, input, category) in cases {
        let execution = run_case(method, input);
        assert_eq!(
            execution.result,
            Ok(Actual::Completed(category)),
            "{}{}",
            method,
            input
        );
    }
}

#[test]
fn test_return_value_is_recorded() {
    let execution = run_case("divide", "(9, 3)");
    assert_eq!(execution.return_value.as_deref(), Some("3"));
}

#[test]
fn test_non_terminating_loop_times_out() {
    let execution = run_case("spin", "(0)");
    assert_eq!(execution.result, Ok(Actual::Timeout));

    let case = parse_case("(0) -> *").unwrap();
    assert!(compare(&case, &execution).is_match());

    let case = parse_case("(0) -> ok").unwrap();
    assert_eq!(compare(&case, &execution).kind(), VerdictKind::Mismatch);
}

#[test]
fn test_arity_and_unmapped_faults_are_harness_errors() {
    let execution = run_case("positive", "(1, 2)");
    assert!(matches!(execution.result, Err(HarnessError::Bind(_))));

    let execution = run_case("unmapped", "()");
    match execution.result {
        Err(HarnessError::UnmappedFault { message }) => {
            assert!(message.contains("plain panic"));
        }
        other => panic!("expected unmapped fault, got {:?}", other),
    }
}

#[test]
fn test_corpus_run_in_process() {
    let plan = build_plan(fluxcase::Corpus::load(), None, None, None, None);
    assert_eq!(plan.method_count(), 9);

    let config = ExecutionConfig {
        loop_timeout: Duration::from_millis(200),
        jobs: 4,
        ..ExecutionConfig::default()
    };
    let results = Executor::new(config).execute(&plan);
    assert_eq!(results.len(), plan.case_count());

    let verdict_of = |name: &str, index: usize| {
        results
            .iter()
            .find(|r| r.def.name == name && r.entry.index == index)
            .map(|r| r.verdict.clone())
            .unwrap()
    };

    assert!(verdict_of("divide", 0).is_match());
    assert!(verdict_of("divide", 1).is_match());
    assert_eq!(verdict_of("divide", 2).kind(), VerdictKind::Mismatch);
    assert!(verdict_of("positive", 1).is_match());
    assert_eq!(verdict_of("positive", 2).kind(), VerdictKind::ParseError);
    assert_eq!(verdict_of("positive", 3).kind(), VerdictKind::HarnessError);
    assert!(verdict_of("spin", 0).is_timeout());
    assert!(verdict_of("depth", 1).is_match());
    assert!(matches!(
        verdict_of("unmapped", 0),
        Verdict::HarnessError(HarnessError::UnmappedFault { .. })
    ));

    let report = build_report(
        &results,
        ReportConfig {
            isolation: "in-process".to_string(),
            jobs: 4,
            loop_timeout_ms: 200,
            case_timeout_ms: None,
            max_steps: None,
            max_depth: 1000,
        },
        0.0,
    );
    assert_eq!(report.summary.total_cases, results.len());
    assert_eq!(report.summary.mismatched, 1);
    assert_eq!(report.summary.parse_errors, 1);
    assert_eq!(report.summary.harness_errors, 2);
    assert_eq!(report.summary.timeouts, 1);
    assert_eq!(report.summary.matched, 16);
    assert_eq!(
        report
            .results
            .iter()
            .filter(|r| r.status == CaseStatus::Match)
            .count(),
        16
    );
}
