//! Running a plan
//!
//! [`Executor`] runs cases on a thread pool inside this process;
//! [`IsolatedExecutor`] hands them to worker processes. Both produce one
//! [`CaseExecutionResult`] per planned case, in plan order, which
//! [`build_report`] folds into a report and [`format_human_output`] prints.

mod execution;
mod formatting;
mod metadata;
mod report;

pub use execution::{CaseExecutionResult, ExecutionConfig, Executor, IsolatedExecutor};
pub use formatting::format_human_output;
pub use metadata::num_cpus;
pub use report::{build_report, case_report_result};
