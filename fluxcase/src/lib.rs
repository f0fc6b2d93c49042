#![warn(missing_docs)]
//! # Fluxcase
//!
//! Annotated test-case harness for Rust.
//!
//! Benchmark methods declare their own test oracles as case strings: an
//! argument list and the outcome the call is expected to produce. Fluxcase
//! parses every case, runs the method once per case, classifies what happened
//! into a closed outcome taxonomy and reports a verdict per case.
//!
//! - **Case Grammar**: `(1, "abc", [I: 1, 2]) -> out of bounds`, with `|` for
//!   alternative outcomes and `*` for non-termination
//! - **Typed Faults**: `ops::div`, `ops::char_at`, `Ref::get` and friends raise
//!   typed payloads instead of relying on panic text
//! - **Budgets**: loop and recursive methods run under a wall-clock budget;
//!   `checkpoint()` and `enter_frame()` make them stoppable and bounded
//! - **Process Isolation**: cases run in reusable worker processes by default
//! - **CI Integration**: JSON/CSV/GitHub reports, baselines and annotations
//!
//! ## Quick Start
//!
//! ```ignore
//! use fluxcase::prelude::*;
//!
//! #[method]
//! #[case("(0) -> divide by zero")]
//! #[case("(2) -> ok")]
//! fn reciprocal(n: i32) -> i32 {
//!     ops::div(100, n)
//! }
//!
//! #[method(tags = "loop")]
//! #[case("(0) -> *")]
//! fn spin(n: i32) {
//!     while n == 0 {
//!         checkpoint();
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     fluxcase::run()
//! }
//! ```

// Re-export core types
pub use fluxcase_core::{
    Actual, ArgValue, BindError, CallLimits, Execution, Fault, FrameGuard, FromArg, HarnessError,
    MethodDef, OutcomeCategory, ParamType, RawOutcome, Ref, Tag, call, checkpoint, current_depth,
    enter_frame, execute, execute_with_budget, find_method, flux_assert, ops, registered_methods,
};

// Re-export macros
pub use fluxcase_macros::{case, method};

// Re-export logic types
pub use fluxcase_logic::{
    Case, CaseEntry, Corpus, Expected, ExpectedOutcome, MethodUnderTest, ParseError,
    ParseErrorKind, Verdict, VerdictKind, VerdictSummary, aggregate_verdicts, compare, parse_args,
    parse_case, parse_expected,
};

/// Internal re-exports for macro use
#[doc(hidden)]
pub mod internal {
    pub use inventory;
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Ref, case, checkpoint, enter_frame, flux_assert, method, ops};
}

/// Run the Fluxcase CLI harness.
///
/// Call this from your corpus binary's `main()`:
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     fluxcase::run()
/// }
/// ```
pub use fluxcase_cli::run;
