//! Case Execution
//!
//! Runs every planned case exactly once and turns the result into a verdict.
//!
//! ## Execution Modes
//!
//! - **In-process (`Executor`)**: Cases run on a rayon pool inside the runner.
//!   Faults are caught at the call boundary; budgeted cases run on a detached
//!   thread that is abandoned on timeout.
//!
//! - **Isolated (`IsolatedExecutor`)**: Cases run in reusable worker
//!   processes. A timed-out worker is killed and replaced, and a worker that
//!   dies mid-case only costs that case.
//!
//! ## Data Flow
//!
//! ```text
//! ExecutionPlan (corpus filtered by the planner)
//!        │
//!        ▼
//! ┌──────────────────┐
//! │  Executor/       │  bind → call → classify, under the case budget
//! │  IsolatedExecutor│
//! └────────┬─────────┘
//!          │
//!          ▼
//!  CaseExecutionResult (verdict, return value, duration)
//! ```

use crate::planner::{ExecutionPlan, PlannedCase};
use crate::supervisor::{CaseJob, Supervisor};
use fluxcase_core::{
    CallLimits, Execution, HarnessError, MethodDef, execute, execute_with_budget,
};
use fluxcase_logic::{Case, CaseEntry, MethodUnderTest, ParseError, Verdict, compare};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for case execution
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Depth and step limits for every call
    pub limits: CallLimits,
    /// Budget for loop/recursive cases and cases expecting `*`
    pub loop_timeout: Duration,
    /// Budget for every other case
    pub case_timeout: Option<Duration>,
    /// Stack size for budgeted call threads
    pub stack_size: Option<usize>,
    /// Time allowed for a worker process to start
    pub worker_timeout: Duration,
    /// Executable started as a worker; the current one when unset
    pub worker_binary: Option<PathBuf>,
    /// Parallel threads or worker processes
    pub jobs: usize,
    /// Draw a progress bar
    pub show_progress: bool,
}

impl ExecutionConfig {
    /// Wall-clock budget for one case, if it runs under one.
    pub fn budget_for(&self, method: &MethodUnderTest, entry: &CaseEntry) -> Option<Duration> {
        if method.is_budgeted(entry) {
            Some(self.loop_timeout)
        } else {
            self.case_timeout
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            limits: CallLimits::default(),
            loop_timeout: Duration::from_secs(2),
            case_timeout: None,
            stack_size: None,
            worker_timeout: Duration::from_secs(10),
            worker_binary: None,
            jobs: 1,
            show_progress: false,
        }
    }
}

/// Result from executing a single case
#[derive(Debug, Clone)]
pub struct CaseExecutionResult {
    /// Method the case belongs to
    pub def: &'static MethodDef,
    /// The case as declared
    pub entry: CaseEntry,
    /// Verdict against the expected outcomes
    pub verdict: Verdict,
    /// `Debug` text of a non-unit return value
    pub return_value: Option<String>,
    /// Wall-clock time of the call
    pub duration: Duration,
}

impl CaseExecutionResult {
    fn evaluated(planned: &PlannedCase<'_>, case: &Case, execution: Execution) -> Self {
        Self {
            def: planned.def(),
            entry: planned.entry.clone(),
            verdict: compare(case, &execution),
            return_value: execution.return_value,
            duration: execution.duration,
        }
    }

    /// A case of a method whose id is shared; the method is never called.
    fn ambiguous(planned: &PlannedCase<'_>, case: &Case) -> Self {
        let execution = Execution::harness_error(
            HarnessError::DuplicateMethodId(planned.def().id.to_string()),
            Duration::ZERO,
        );
        Self::evaluated(planned, case, execution)
    }

    /// Result for a case that never reaches a call, if it is one.
    fn skipped(planned: &PlannedCase<'_>) -> Option<Self> {
        match planned.entry.parsed.as_ref() {
            Err(err) => Some(Self::unparsed(planned, err)),
            Ok(case) if planned.method.duplicate_id => Some(Self::ambiguous(planned, case)),
            Ok(_) => None,
        }
    }

    /// A case whose text did not parse; the method is never called.
    fn unparsed(planned: &PlannedCase<'_>, err: &ParseError) -> Self {
        Self {
            def: planned.def(),
            entry: planned.entry.clone(),
            verdict: Verdict::ParseError(err.clone()),
            return_value: None,
            duration: Duration::ZERO,
        }
    }
}

fn progress_bar(len: usize, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Execute cases and produce results (in-process mode)
pub struct Executor {
    config: ExecutionConfig,
}

impl Executor {
    /// Create a new in-process executor
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    /// Execute all planned cases; results follow plan order.
    pub fn execute(&self, plan: &ExecutionPlan) -> Vec<CaseExecutionResult> {
        let cases = plan.cases();
        let pb = progress_bar(cases.len(), self.config.show_progress);
        fluxcase_core::install_quiet_panic_hook();

        let mut builder = ThreadPoolBuilder::new().num_threads(self.config.jobs.max(1));
        if let Some(size) = self.config.stack_size {
            builder = builder.stack_size(size);
        }

        let results = match builder.build() {
            Ok(pool) => pool.install(|| {
                cases
                    .par_iter()
                    .map(|planned| {
                        let result = self.execute_single(planned);
                        pb.inc(1);
                        result
                    })
                    .collect()
            }),
            Err(e) => {
                tracing::warn!("Failed to build thread pool, running sequentially: {}", e);
                cases
                    .iter()
                    .map(|planned| {
                        let result = self.execute_single(planned);
                        pb.inc(1);
                        result
                    })
                    .collect()
            }
        };

        pb.finish_and_clear();
        results
    }

    /// Execute a single case
    fn execute_single(&self, planned: &PlannedCase<'_>) -> CaseExecutionResult {
        let case = match planned.entry.parsed.as_ref() {
            Err(err) => return CaseExecutionResult::unparsed(planned, err),
            Ok(case) if planned.method.duplicate_id => {
                return CaseExecutionResult::ambiguous(planned, case);
            }
            Ok(case) => case,
        };

        let def = planned.def();
        let execution = match self.config.budget_for(planned.method, planned.entry) {
            Some(budget) => execute_with_budget(
                def,
                case.args.clone(),
                self.config.limits,
                budget,
                self.config.stack_size,
            ),
            None => execute(def, &case.args, self.config.limits),
        };

        tracing::debug!(
            method = def.id,
            case = planned.entry.index,
            outcome = ?execution.result,
            "Case evaluated"
        );
        CaseExecutionResult::evaluated(planned, case, execution)
    }
}

/// Executor that runs cases in isolated worker processes via IPC
///
/// A case that crashes its worker does not take down the runner.
pub struct IsolatedExecutor {
    config: ExecutionConfig,
}

impl IsolatedExecutor {
    /// Create a new isolated executor
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    /// Execute all planned cases in worker processes; results follow plan order.
    pub fn execute(&self, plan: &ExecutionPlan) -> Vec<CaseExecutionResult> {
        let cases = plan.cases();
        let pb = progress_bar(cases.len(), self.config.show_progress);
        pb.set_message("Starting isolated workers...");

        // Only parseable cases of uniquely named methods reach a worker
        let runnable: Vec<(usize, &Case)> = cases
            .iter()
            .enumerate()
            .filter(|(_, planned)| !planned.method.duplicate_id)
            .filter_map(|(i, planned)| planned.entry.parsed.as_ref().ok().map(|case| (i, case)))
            .collect();

        let jobs: Vec<CaseJob> = runnable
            .iter()
            .map(|&(i, case)| {
                let planned = &cases[i];
                CaseJob {
                    method_id: planned.def().id,
                    case_index: planned.entry.index,
                    args: case.args_text(),
                    budget: self.config.budget_for(planned.method, planned.entry),
                }
            })
            .collect();

        let mut supervisor = Supervisor::new(
            self.config.limits,
            self.config.worker_timeout,
            self.config.jobs,
        );
        if let Some(binary) = &self.config.worker_binary {
            supervisor = supervisor.with_binary(binary);
        }
        let executions = match supervisor.run_all(&jobs, &|| pb.inc(1)) {
            Ok(executions) => executions,
            Err(e) => {
                // Supervisor-level failure: every runnable case is a harness error
                tracing::error!("Supervisor error: {}", e);
                jobs.iter()
                    .map(|_| {
                        Execution::harness_error(
                            HarnessError::WorkerCrashed {
                                message: format!("supervisor error: {}", e),
                            },
                            Duration::ZERO,
                        )
                    })
                    .collect()
            }
        };

        let mut evaluated: Vec<Option<CaseExecutionResult>> = vec![None; cases.len()];
        for (&(i, case), execution) in runnable.iter().zip(executions) {
            evaluated[i] = Some(CaseExecutionResult::evaluated(&cases[i], case, execution));
        }

        let results = cases
            .iter()
            .zip(evaluated)
            .filter_map(|(planned, result)| {
                result.or_else(|| {
                    pb.inc(1);
                    CaseExecutionResult::skipped(planned)
                })
            })
            .collect();

        pb.finish_and_clear();
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::build_plan;
    use fluxcase_core::{Actual, ArgValue, BindError, OutcomeCategory, ParamType, Tag};
    use fluxcase_logic::{Corpus, VerdictKind};

    fn int_param() -> Vec<ParamType> {
        vec![ParamType::Int]
    }

    fn invoke_positive(args: &[ArgValue]) -> Result<Option<String>, BindError> {
        if args.len() != 1 {
            return Err(BindError::Arity {
                expected: 1,
                got: args.len(),
            });
        }
        match args[0] {
            ArgValue::Integer(x) => {
                fluxcase_core::flux_assert!(x > 0);
                Ok(None)
            }
            ref other => Err(BindError::type_mismatch(0, ParamType::Int, other)),
        }
    }

    fn invoke_spin(_args: &[ArgValue]) -> Result<Option<String>, BindError> {
        loop {
            fluxcase_core::checkpoint();
        }
    }

    static POSITIVE: MethodDef = MethodDef {
        id: "exec_tests::positive",
        name: "positive",
        class: None,
        tags: &[],
        cases: &[
            "(5) -> ok",
            "(0) -> assertion error",
            "(0) -> ok",
            "(1, 2) -> ok",
            "(5 -> ok",
        ],
        params_fn: int_param,
        invoke_fn: invoke_positive,
        file: "exec_tests.rs",
        line: 1,
        module_path: "exec_tests",
    };

    static SPIN: MethodDef = MethodDef {
        id: "exec_tests::spin",
        name: "spin",
        class: None,
        tags: &[Tag::Loop],
        cases: &["(0) -> ok", "(0) -> *"],
        params_fn: int_param,
        invoke_fn: invoke_spin,
        file: "exec_tests.rs",
        line: 2,
        module_path: "exec_tests",
    };

    static SHARED_FIRST: MethodDef = MethodDef {
        id: "exec_tests::shared",
        name: "shared_first",
        class: None,
        tags: &[],
        cases: &["(5) -> ok"],
        params_fn: int_param,
        invoke_fn: invoke_positive,
        file: "exec_tests.rs",
        line: 3,
        module_path: "exec_tests",
    };

    static SHARED_SECOND: MethodDef = MethodDef {
        id: "exec_tests::shared",
        name: "shared_second",
        class: None,
        tags: &[],
        cases: &["(5) -> ok", "(0) -> assertion error"],
        params_fn: int_param,
        invoke_fn: invoke_positive,
        file: "exec_tests.rs",
        line: 4,
        module_path: "exec_tests",
    };

    fn config() -> ExecutionConfig {
        ExecutionConfig {
            loop_timeout: Duration::from_millis(50),
            jobs: 2,
            ..ExecutionConfig::default()
        }
    }

    #[test]
    fn test_in_process_verdicts_in_order() {
        let plan = build_plan(Corpus::from_defs([&POSITIVE]), None, None, None, None);
        let results = Executor::new(config()).execute(&plan);

        let kinds: Vec<VerdictKind> = results.iter().map(|r| r.verdict.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                VerdictKind::Match,
                VerdictKind::Match,
                VerdictKind::Mismatch,
                VerdictKind::HarnessError,
                VerdictKind::ParseError,
            ]
        );
        assert_eq!(
            results[2].verdict.actual(),
            Some(Actual::Completed(OutcomeCategory::AssertionError))
        );
        assert!(results.iter().enumerate().all(|(i, r)| r.entry.index == i));
    }

    #[test]
    fn test_timeout_never_matches_ok() {
        let plan = build_plan(Corpus::from_defs([&SPIN]), None, None, None, None);
        let results = Executor::new(config()).execute(&plan);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].verdict.kind(), VerdictKind::Mismatch);
        assert!(results[0].verdict.is_timeout());
        assert_eq!(results[1].verdict.kind(), VerdictKind::Match);
    }

    #[test]
    fn test_budget_policy() {
        let corpus = Corpus::from_defs([&POSITIVE, &SPIN]);
        let cfg = ExecutionConfig {
            case_timeout: Some(Duration::from_secs(7)),
            ..config()
        };
        let positive = &corpus.methods[0];
        let spin = &corpus.methods[1];
        assert_eq!(
            cfg.budget_for(positive, &positive.cases[0]),
            Some(Duration::from_secs(7))
        );
        assert_eq!(
            cfg.budget_for(spin, &spin.cases[0]),
            Some(Duration::from_millis(50))
        );
        assert_eq!(config().budget_for(positive, &positive.cases[0]), None);
    }

    #[test]
    fn test_shared_id_cases_are_reported() {
        let corpus = Corpus::from_defs([&SHARED_FIRST, &POSITIVE, &SHARED_SECOND]);
        let plan = build_plan(corpus, None, None, None, None);
        let results = Executor::new(config()).execute(&plan);

        assert_eq!(results.len(), 1 + 5 + 2);
        let shared: Vec<&CaseExecutionResult> = results
            .iter()
            .filter(|r| r.def.id == "exec_tests::shared")
            .collect();
        assert_eq!(shared.len(), 3);
        for result in shared {
            assert_eq!(
                result.verdict,
                Verdict::HarnessError(HarnessError::DuplicateMethodId(
                    "exec_tests::shared".to_string()
                ))
            );
        }
        assert_eq!(
            results
                .iter()
                .filter(|r| r.def.id == "exec_tests::positive")
                .filter(|r| r.verdict.kind() == VerdictKind::Match)
                .count(),
            2
        );
    }
}
