//! Fluxcase reference corpus.
//!
//! Every class of the outcome taxonomy is exercised by at least one case.
//! Run with `cargo run -p fluxcase-corpus`, or `-- list` to see the methods.

mod conditionals;
mod exceptions;
mod recursion;
mod signs;
mod strings;
mod tricky;

fn main() -> anyhow::Result<()> {
    fluxcase::run()
}

#[cfg(test)]
mod tests {
    use fluxcase::{Corpus, OutcomeCategory, VerdictKind, aggregate_verdicts};
    use fluxcase_cli::{CaseExecutionResult, ExecutionConfig, Executor, build_plan};
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn run_corpus() -> Vec<CaseExecutionResult> {
        let plan = build_plan(Corpus::load(), None, None, None, None);
        let config = ExecutionConfig {
            loop_timeout: Duration::from_millis(300),
            jobs: 4,
            ..ExecutionConfig::default()
        };
        Executor::new(config).execute(&plan)
    }

    fn find<'a>(
        results: &'a [CaseExecutionResult],
        name: &str,
        index: usize,
    ) -> &'a CaseExecutionResult {
        results
            .iter()
            .find(|r| r.def.name == name && r.entry.index == index)
            .unwrap()
    }

    #[test]
    fn test_whole_corpus_matches() {
        let results = run_corpus();
        assert!(results.len() > 100);

        let unexpected: Vec<String> = results
            .iter()
            .filter(|r| !r.verdict.is_match() && r.def.name != "string_builder")
            .map(|r| {
                format!(
                    "{} #{} {}: {:?}",
                    r.def.id, r.entry.index, r.entry.source, r.verdict
                )
            })
            .collect();
        assert!(
            unexpected.is_empty(),
            "unexpected verdicts:\n{}",
            unexpected.join("\n")
        );

        let summary = aggregate_verdicts(results.iter().map(|r| &r.verdict));
        assert_eq!(summary.total, results.len());
        assert_eq!(summary.harness_errors, 1);
        assert_eq!(summary.parse_errors, 0);
        assert_eq!(summary.matched, results.len() - 1);
        assert!(!summary.all_matched());
    }

    #[test]
    fn test_arity_drift_is_a_harness_error() {
        let results = run_corpus();
        let drift = find(&results, "string_builder", 0);
        assert_eq!(drift.verdict.kind(), VerdictKind::HarnessError);
        assert!(drift.verdict.message().unwrap().contains("arity mismatch"));
    }

    #[test]
    fn test_every_category_is_covered() {
        let results = run_corpus();
        let seen: BTreeSet<_> = results
            .iter()
            .filter_map(|r| r.verdict.actual())
            .map(|a| a.phrase())
            .collect();

        for category in OutcomeCategory::ALL {
            assert!(
                seen.contains(category.phrase()),
                "no case produced {}",
                category
            );
        }
        assert!(seen.contains("timeout"));
    }

    #[test]
    fn test_declaration_order_is_kept() {
        let results = run_corpus();
        let collatz: Vec<_> = results
            .iter()
            .filter(|r| r.def.name == "collatz")
            .map(|r| r.entry.index)
            .collect();
        assert_eq!(collatz, vec![0, 1, 2]);
        assert_eq!(find(&results, "collatz", 2).return_value.as_deref(), Some("111"));
        assert_eq!(
            find(&results, "array_store", 0).return_value.as_deref(),
            Some("[7, 0, 0]")
        );
    }
}
