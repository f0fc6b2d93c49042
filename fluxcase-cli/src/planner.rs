//! Case Planner
//!
//! Builds the execution plan by filtering methods of the loaded corpus.
//!
//! Filtering options:
//! - Regex pattern matching on method ID
//! - Class filtering
//! - Tag inclusion/exclusion
//!
//! Ordering: declaration order is kept (methods by source file and line,
//! cases by marker order), so reports are stable across runs.

use fluxcase_core::{MethodDef, Tag};
use fluxcase_logic::{CaseEntry, Corpus, MethodUnderTest};

/// Execution plan for a run
pub struct ExecutionPlan {
    /// Selected methods in declaration order
    pub corpus: Corpus,
}

/// One case of the plan
#[derive(Debug, Clone, Copy)]
pub struct PlannedCase<'a> {
    /// Method the case belongs to
    pub method: &'a MethodUnderTest,
    /// The case as declared
    pub entry: &'a CaseEntry,
}

impl<'a> PlannedCase<'a> {
    /// Registry entry of the method.
    pub fn def(&self) -> &'static MethodDef {
        self.method.def
    }
}

impl ExecutionPlan {
    /// Every case of every selected method, in report order.
    pub fn cases(&self) -> Vec<PlannedCase<'_>> {
        self.corpus
            .methods
            .iter()
            .flat_map(|method| {
                method
                    .cases
                    .iter()
                    .map(move |entry| PlannedCase { method, entry })
            })
            .collect()
    }

    /// Selected methods.
    pub fn method_count(&self) -> usize {
        self.corpus.methods.len()
    }

    /// Declared cases, parsed or not.
    pub fn case_count(&self) -> usize {
        self.corpus.total_cases()
    }
}

/// Build execution plan from the loaded corpus
pub fn build_plan(
    mut corpus: Corpus,
    filter: Option<&regex::Regex>,
    class: Option<&str>,
    tag: Option<Tag>,
    skip_tag: Option<Tag>,
) -> ExecutionPlan {
    corpus.retain(|m| {
        let def = m.def;

        if let Some(re) = filter {
            if !re.is_match(def.id) {
                return false;
            }
        }

        if let Some(c) = class {
            if def.class_name() != c {
                return false;
            }
        }

        if let Some(t) = tag {
            if !def.has_tag(t) {
                return false;
            }
        }

        if let Some(st) = skip_tag {
            if def.has_tag(st) {
                return false;
            }
        }

        true
    });

    ExecutionPlan { corpus }
}
