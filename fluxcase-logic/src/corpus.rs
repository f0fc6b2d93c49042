//! Corpus Loading
//!
//! Turns registered method definitions into methods under test with their
//! cases parsed. A case that fails to parse stays in the corpus with its
//! error so it is reported rather than dropped.

use crate::case::Case;
use crate::error::ParseError;
use fluxcase_core::{MethodDef, Tag, registered_methods};
use fxhash::FxHashMap;

/// One declared case of a method.
#[derive(Debug, Clone)]
pub struct CaseEntry {
    /// Zero-based declaration index within the method
    pub index: usize,
    /// Case text as written
    pub source: &'static str,
    /// Parsed case, or why it did not parse
    pub parsed: Result<Case, ParseError>,
}

impl CaseEntry {
    /// Parse the case at `index`.
    pub fn parse(index: usize, source: &'static str) -> Self {
        Self {
            index,
            source,
            parsed: Case::parse(source),
        }
    }
}

/// A registered method and its cases, in declaration order.
#[derive(Debug, Clone)]
pub struct MethodUnderTest {
    /// Registry entry
    pub def: &'static MethodDef,
    /// Cases in declaration order
    pub cases: Vec<CaseEntry>,
    /// Another registered method carries the same id; none of its cases run
    pub duplicate_id: bool,
}

impl MethodUnderTest {
    /// Parse every case of `def`.
    pub fn load(def: &'static MethodDef) -> Self {
        let cases = def
            .cases
            .iter()
            .enumerate()
            .map(|(index, source)| CaseEntry::parse(index, *source))
            .collect();
        Self {
            def,
            cases,
            duplicate_id: false,
        }
    }

    /// Registered id.
    pub fn id(&self) -> &'static str {
        self.def.id
    }

    /// Declared tags.
    pub fn tags(&self) -> &'static [Tag] {
        self.def.tags
    }

    /// Whether `entry` runs under the execution budget.
    ///
    /// Budgeted when the method is tagged `loop`/`recursive` or the case
    /// expects non-termination.
    pub fn is_budgeted(&self, entry: &CaseEntry) -> bool {
        self.def.is_budgeted()
            || entry
                .parsed
                .as_ref()
                .is_ok_and(|case| case.expects_nontermination())
    }

    /// Cases that did not parse, with their errors.
    pub fn parse_errors(&self) -> impl Iterator<Item = (&CaseEntry, &ParseError)> {
        self.cases
            .iter()
            .filter_map(|entry| entry.parsed.as_ref().err().map(|err| (entry, err)))
    }
}

/// All methods under test, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    /// Methods in registry order
    pub methods: Vec<MethodUnderTest>,
    index: FxHashMap<&'static str, usize>,
}

impl Corpus {
    /// Load every method in the link-time registry.
    pub fn load() -> Self {
        Self::from_defs(registered_methods())
    }

    /// Build a corpus from `defs`, keeping their order.
    ///
    /// Every def is kept. Defs sharing an id are flagged with
    /// [`MethodUnderTest::duplicate_id`] and cannot be looked up by id.
    pub fn from_defs(defs: impl IntoIterator<Item = &'static MethodDef>) -> Self {
        let defs: Vec<&'static MethodDef> = defs.into_iter().collect();
        let mut seen: FxHashMap<&'static str, usize> = FxHashMap::default();
        for def in &defs {
            *seen.entry(def.id).or_default() += 1;
        }

        let mut corpus = Corpus::default();
        for def in defs {
            let mut method = MethodUnderTest::load(def);
            if seen.get(def.id).is_some_and(|&n| n > 1) {
                tracing::warn!(
                    method = def.id,
                    name = def.name,
                    "Method id registered more than once"
                );
                method.duplicate_id = true;
            }
            for (entry, err) in method.parse_errors() {
                tracing::warn!(
                    method = def.id,
                    case = entry.index,
                    "Unparseable case {:?}: {}",
                    entry.source,
                    err
                );
            }
            corpus.methods.push(method);
        }
        corpus.reindex();
        tracing::debug!(
            methods = corpus.methods.len(),
            cases = corpus.total_cases(),
            "Corpus loaded"
        );
        corpus
    }

    /// Method with this id, unless the id is shared.
    pub fn get(&self, id: &str) -> Option<&MethodUnderTest> {
        self.index.get(id).map(|&i| &self.methods[i])
    }

    /// Declared cases across all methods, parsed or not.
    pub fn total_cases(&self) -> usize {
        self.methods.iter().map(|m| m.cases.len()).sum()
    }

    /// Keep only methods accepted by `keep`, preserving order.
    pub fn retain(&mut self, mut keep: impl FnMut(&MethodUnderTest) -> bool) {
        self.methods.retain(|m| keep(m));
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .methods
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.duplicate_id)
            .map(|(i, m)| (m.id(), i))
            .collect();
    }

    /// Methods whose id is shared with another registered method.
    pub fn duplicate_ids(&self) -> impl Iterator<Item = &MethodUnderTest> {
        self.methods.iter().filter(|m| m.duplicate_id)
    }

    /// Whether no method is left.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxcase_core::{ArgValue, BindError, ParamType};

    fn no_params() -> Vec<ParamType> {
        Vec::new()
    }

    fn noop(_args: &[ArgValue]) -> Result<Option<String>, BindError> {
        Ok(None)
    }

    static PLAIN: MethodDef = MethodDef {
        id: "corpus_tests::plain",
        name: "plain",
        class: None,
        tags: &[],
        cases: &["(1) -> ok", "(1) -> assertion error", "(1 -> ok", "() -> *"],
        params_fn: no_params,
        invoke_fn: noop,
        file: "a.rs",
        line: 10,
        module_path: "corpus_tests",
    };

    static LOOPING: MethodDef = MethodDef {
        id: "corpus_tests::looping",
        name: "looping",
        class: None,
        tags: &[Tag::Loop],
        cases: &["(24) -> ok"],
        params_fn: no_params,
        invoke_fn: noop,
        file: "a.rs",
        line: 20,
        module_path: "corpus_tests",
    };

    #[test]
    fn test_cases_keep_declaration_order_and_duplicates() {
        let method = MethodUnderTest::load(&PLAIN);
        assert_eq!(method.cases.len(), 4);
        assert_eq!(method.cases[0].index, 0);
        assert_eq!(method.cases[1].source, "(1) -> assertion error");
        assert_eq!(
            method.cases[0].parsed.as_ref().unwrap().args,
            method.cases[1].parsed.as_ref().unwrap().args
        );
    }

    #[test]
    fn test_parse_error_is_kept() {
        let method = MethodUnderTest::load(&PLAIN);
        let errors: Vec<_> = method.parse_errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0.index, 2);
    }

    #[test]
    fn test_budget_policy() {
        let plain = MethodUnderTest::load(&PLAIN);
        assert!(!plain.is_budgeted(&plain.cases[0]));
        assert!(plain.is_budgeted(&plain.cases[3]));

        let looping = MethodUnderTest::load(&LOOPING);
        assert!(looping.is_budgeted(&looping.cases[0]));
    }

    static SHARED_FIRST: MethodDef = MethodDef {
        id: "corpus_tests::shared",
        name: "shared_first",
        class: None,
        tags: &[],
        cases: &["(1) -> ok"],
        params_fn: no_params,
        invoke_fn: noop,
        file: "b.rs",
        line: 1,
        module_path: "corpus_tests",
    };

    static SHARED_SECOND: MethodDef = MethodDef {
        id: "corpus_tests::shared",
        name: "shared_second",
        class: None,
        tags: &[],
        cases: &["(1) -> ok", "(2) -> ok"],
        params_fn: no_params,
        invoke_fn: noop,
        file: "b.rs",
        line: 9,
        module_path: "corpus_tests",
    };

    #[test]
    fn test_shared_id_keeps_every_case() {
        let corpus = Corpus::from_defs([&SHARED_FIRST, &LOOPING, &SHARED_SECOND]);
        assert_eq!(corpus.methods.len(), 3);
        assert_eq!(corpus.total_cases(), 4);

        let flagged: Vec<&str> = corpus.duplicate_ids().map(|m| m.def.name).collect();
        assert_eq!(flagged, vec!["shared_first", "shared_second"]);
        assert!(!corpus.methods[1].duplicate_id);

        assert!(corpus.get("corpus_tests::shared").is_none());
        assert!(corpus.get("corpus_tests::looping").is_some());
    }

    #[test]
    fn test_corpus_index_and_retain() {
        let mut corpus = Corpus::from_defs([&PLAIN, &LOOPING]);
        assert_eq!(corpus.methods.len(), 2);
        assert_eq!(corpus.total_cases(), 5);
        assert!(corpus.get("corpus_tests::looping").is_some());

        corpus.retain(|m| m.def.is_budgeted());
        assert_eq!(corpus.methods.len(), 1);
        assert!(corpus.get("corpus_tests::plain").is_none());
        assert_eq!(corpus.get("corpus_tests::looping").map(|m| m.id()), Some("corpus_tests::looping"));
    }
}
