//! Method ↔ test association.
//!
//! Each [`AssociationRule`] tries one key against a test file's lookup table.
//! Rules run in [`ASSOCIATION_RULES`] order and the first rule that finds
//! associations wins; later rules are not consulted for that method.

use crate::config::DriftConfig;
use crate::test_chains::TestFileIndex;
use crate::types::{SnippetMethod, TestAssociation};
use std::path::Path;

pub type MatchFn = fn(&SnippetMethod, &TestFileIndex, &DriftConfig) -> Option<Vec<TestAssociation>>;

/// A named lookup strategy
#[derive(Clone, Copy)]
pub struct AssociationRule {
    pub name: &'static str,
    pub matches: MatchFn,
}

pub const ASSOCIATION_RULES: [AssociationRule; 7] = [
    AssociationRule {
        name: "cliInvocation",
        matches: by_cli_invocation,
    },
    AssociationRule {
        name: "route",
        matches: by_route,
    },
    AssociationRule {
        name: "name",
        matches: by_name,
    },
    AssociationRule {
        name: "functionUrl",
        matches: by_function_url,
    },
    AssociationRule {
        name: "fileWideInvocation",
        matches: by_file_wide_invocation,
    },
    AssociationRule {
        name: "sourceFilename",
        matches: by_source_filename,
    },
    AssociationRule {
        name: "quickstartPath",
        matches: by_quickstart_path,
    },
];

fn non_empty(associations: Vec<TestAssociation>) -> Option<Vec<TestAssociation>> {
    (!associations.is_empty()).then_some(associations)
}

/// Case-folded file name without extension
fn source_stem(method: &SnippetMethod) -> Option<String> {
    Path::new(&method.source_path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_lowercase)
}

fn by_cli_invocation(
    method: &SnippetMethod,
    index: &TestFileIndex,
    _: &DriftConfig,
) -> Option<Vec<TestAssociation>> {
    let invocation = method.cli_invocation.as_deref()?;
    index.table.flat(invocation).map(<[_]>::to_vec)
}

fn by_route(
    method: &SnippetMethod,
    index: &TestFileIndex,
    _: &DriftConfig,
) -> Option<Vec<TestAssociation>> {
    let url_path = method.extraction.url_path()?;
    let verb = method.extraction.http_method()?;
    let entry = index.table.get(url_path)?;
    non_empty(entry.for_verb(verb).to_vec())
}

fn by_name(
    method: &SnippetMethod,
    index: &TestFileIndex,
    _: &DriftConfig,
) -> Option<Vec<TestAssociation>> {
    index.table.flat(&method.name).map(<[_]>::to_vec)
}

/// URL-invoked handlers: the verb is ignored
fn by_function_url(
    method: &SnippetMethod,
    index: &TestFileIndex,
    _: &DriftConfig,
) -> Option<Vec<TestAssociation>> {
    let function_name = method.extraction.function_name()?;
    let entry = index.table.get(&format!("/{function_name}"))?;
    non_empty(entry.all_verbs())
}

/// Single-case test files that run this method's source file
fn by_file_wide_invocation(
    method: &SnippetMethod,
    index: &TestFileIndex,
    _: &DriftConfig,
) -> Option<Vec<TestAssociation>> {
    if !index.is_single_case() {
        return None;
    }
    let script = index.file_wide_invocation.as_deref()?;
    if source_stem(method)? != script {
        return None;
    }
    non_empty(index.table.first_entry()?.all())
}

/// One snippet per file, invoked by file name
fn by_source_filename(
    method: &SnippetMethod,
    index: &TestFileIndex,
    _: &DriftConfig,
) -> Option<Vec<TestAssociation>> {
    index.table.flat(&source_stem(method)?).map(<[_]>::to_vec)
}

fn by_quickstart_path(
    method: &SnippetMethod,
    index: &TestFileIndex,
    config: &DriftConfig,
) -> Option<Vec<TestAssociation>> {
    if config.quickstart_marker.is_empty() || !method.source_path.contains(&config.quickstart_marker)
    {
        return None;
    }
    index.table.flat(&method.source_path).map(<[_]>::to_vec)
}

/// First rule that yields associations for a method
pub fn first_match(
    method: &SnippetMethod,
    index: &TestFileIndex,
    config: &DriftConfig,
) -> Option<(&'static str, Vec<TestAssociation>)> {
    ASSOCIATION_RULES
        .iter()
        .find_map(|rule| (rule.matches)(method, index, config).map(|found| (rule.name, found)))
}

/// Attach one test file's associations to every method, deduplicating test data
pub fn associate(methods: &mut [SnippetMethod], index: &TestFileIndex, config: &DriftConfig) {
    let mut matched = 0usize;
    for method in methods.iter_mut() {
        if let Some((rule, found)) = first_match(method, index, config) {
            log::debug!(
                "{} ({}) ← {} via {rule} ({} case(s))",
                method.name,
                method.extraction.strategy_name(),
                index.test_path,
                found.len()
            );
            method.test_data.extend(found);
            matched += 1;
        }
        method.dedup_test_data();
    }
    log::debug!("{}: associated {matched} method(s)", index.test_path);
}
