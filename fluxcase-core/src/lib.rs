#![warn(missing_docs)]
//! Fluxcase Core - Case Runtime
//!
//! This crate provides what a benchmark method needs at run time:
//! - `ArgValue` / `ParamType` value model and `FromArg` binding
//! - The closed outcome taxonomy and typed `Fault` payloads
//! - Faulting operations (`ops`) and depth / step guards
//! - Guarded invocation with an optional wall-clock budget
//! - The link-time registry of `#[fluxcase::method]` definitions

mod bind;
mod guard;
mod invoke;
pub mod ops;
mod outcome;
mod value;

pub use bind::{BindError, FromArg, Ref};
pub use guard::{CallLimits, DEFAULT_MAX_DEPTH, FrameGuard, checkpoint, current_depth, enter_frame};
pub use invoke::{
    Execution, HarnessError, RawOutcome, call, execute, execute_with_budget,
    install_quiet_panic_hook,
};
pub use outcome::{
    Actual, Classified, Fault, Interrupted, OutcomeCategory, classify_panic, panic_message,
};
pub use value::{ArgValue, ParamType, ValueKind};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type-erased entry point generated for every registered method.
pub type InvokeFn = fn(&[ArgValue]) -> Result<Option<String>, BindError>;

/// Method definition registered via `#[fluxcase::method]`
#[derive(Debug, Clone)]
pub struct MethodDef {
    /// Qualified identifier, `module::path::fn_name` unless overridden
    pub id: &'static str,
    /// Function name
    pub name: &'static str,
    /// Explicit class; falls back to the last module segment
    pub class: Option<&'static str>,
    /// Structural tags consulted by the budget policy
    pub tags: &'static [Tag],
    /// Case strings in declaration order, unparsed
    pub cases: &'static [&'static str],
    /// Declared parameter types
    pub params_fn: fn() -> Vec<ParamType>,
    /// Binds arguments and calls the function
    pub invoke_fn: InvokeFn,
    /// Source file path
    pub file: &'static str,
    /// Source line number
    pub line: u32,
    /// Module path
    pub module_path: &'static str,
}

impl MethodDef {
    /// Declared class, or the last module path segment.
    pub fn class_name(&self) -> &'static str {
        self.class.unwrap_or_else(|| {
            self.module_path
                .rsplit("::")
                .next()
                .unwrap_or(self.module_path)
        })
    }

    /// Parameter types in declaration order.
    pub fn params(&self) -> Vec<ParamType> {
        (self.params_fn)()
    }

    /// Whether the method carries `tag`.
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// Whether the method's shape calls for an execution budget.
    pub fn is_budgeted(&self) -> bool {
        self.tags.iter().any(|tag| tag.is_budgeted())
    }

    /// `class::name`, the short form used in listings.
    pub fn short_name(&self) -> String {
        format!("{}::{}", self.class_name(), self.name)
    }

    /// Rendered signature, e.g. `divide(int, int)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params().iter().map(|p| p.to_string()).collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

/// Structural hint about a method's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    /// Contains iteration that may not terminate
    Loop,
    /// Calls itself
    Recursive,
}

impl Tag {
    /// Name as written in `tags = "..."`.
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Loop => "loop",
            Tag::Recursive => "recursive",
        }
    }

    /// Parse a tag name; case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "loop" => Some(Tag::Loop),
            "recursive" => Some(Tag::Recursive),
            _ => None,
        }
    }

    /// Whether methods with this tag run under the loop budget.
    pub fn is_budgeted(self) -> bool {
        matches!(self, Tag::Loop | Tag::Recursive)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Collect all registered methods
inventory::collect!(MethodDef);

/// All registered methods in declaration order (source file, then line).
pub fn registered_methods() -> Vec<&'static MethodDef> {
    let mut methods: Vec<&'static MethodDef> = inventory::iter::<MethodDef>.into_iter().collect();
    methods.sort_by(|a, b| (a.file, a.line, a.id).cmp(&(b.file, b.line, b.id)));
    methods
}

/// Look up a method by qualified id, then by `class::name`, then by bare name.
///
/// Each form only resolves when it is unambiguous.
pub fn find_method(query: &str) -> Option<&'static MethodDef> {
    let methods = registered_methods();
    let exact: Vec<_> = methods.iter().filter(|m| m.id == query).collect();
    match exact.len() {
        0 => {}
        1 => return Some(*exact[0]),
        // Ambiguous id, never guess
        _ => return None,
    }

    let short: Vec<_> = methods
        .iter()
        .filter(|m| m.short_name() == query)
        .collect();
    if short.len() == 1 {
        return Some(*short[0]);
    }

    let bare: Vec<_> = methods.iter().filter(|m| m.name == query).collect();
    if bare.len() == 1 {
        return Some(*bare[0]);
    }
    None
}

/// Anchor to prevent LTO from stripping inventory entries
#[used]
#[doc(hidden)]
pub static REGISTRY_ANCHOR: fn() = || {
    for _ in inventory::iter::<MethodDef> {}
};

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<ParamType> {
        vec![ParamType::Int, ParamType::Nullable(Box::new(ParamType::Str))]
    }

    fn invoke(_args: &[ArgValue]) -> Result<Option<String>, BindError> {
        Ok(None)
    }

    inventory::submit! {
        MethodDef {
            id: "fluxcase_core::tests::registered",
            name: "registered",
            class: None,
            tags: &[Tag::Recursive],
            cases: &["(1, null) -> ok"],
            params_fn: params,
            invoke_fn: invoke,
            file: file!(),
            line: line!(),
            module_path: module_path!(),
        }
    }

    inventory::submit! {
        MethodDef {
            id: "fluxcase_core::tests::shared",
            name: "shared_first",
            class: None,
            tags: &[],
            cases: &["() -> ok"],
            params_fn: Vec::new,
            invoke_fn: invoke,
            file: file!(),
            line: line!(),
            module_path: module_path!(),
        }
    }

    inventory::submit! {
        MethodDef {
            id: "fluxcase_core::tests::shared",
            name: "shared_second",
            class: None,
            tags: &[],
            cases: &["() -> ok"],
            params_fn: Vec::new,
            invoke_fn: invoke,
            file: file!(),
            line: line!(),
            module_path: module_path!(),
        }
    }

    #[test]
    fn test_shared_id_is_not_resolved() {
        assert!(find_method("fluxcase_core::tests::shared").is_none());
        assert_eq!(
            find_method("shared_second").map(|d| d.name),
            Some("shared_second")
        );
    }

    #[test]
    fn test_registry_lookup() {
        let def = find_method("fluxcase_core::tests::registered").unwrap();
        assert_eq!(def.class_name(), "tests");
        assert!(def.is_budgeted());
        assert_eq!(def.signature(), "registered(int, string?)");
        assert_eq!(find_method("tests::registered").map(|d| d.id), Some(def.id));
        assert!(find_method("missing").is_none());
    }

    #[test]
    fn test_tag_names() {
        assert_eq!(Tag::from_name("loop"), Some(Tag::Loop));
        assert_eq!(Tag::from_name("Loop"), None);
        assert_eq!(Tag::Recursive.to_string(), "recursive");
    }
}
