//! Single-pass scans over a test file's top-level declarations.

use crate::config::DriftConfig;
use drift_syntax::{SyntaxNode, SyntaxTree};

fn declared_literals(tree: &SyntaxTree) -> impl Iterator<Item = &SyntaxNode> {
    tree.statements()
        .iter()
        .filter_map(SyntaxNode::first_declarator)
        .filter_map(|declarator| declarator.child_by_field("value"))
        .filter(|value| value.is("string") || value.is("template_string"))
}

/// Values of top-level string and template constants, in declaration order
pub fn top_level_constants(tree: &SyntaxTree) -> Vec<String> {
    declared_literals(tree)
        .filter_map(|value| value.literal_fragments()?.into_iter().next())
        .collect()
}

/// Script a single-case test file runs, as a case-folded file stem.
///
/// Looks at top-level literal declarations (`const cmd = 'node quickstart.js'`)
/// for a path or word ending in the source suffix. The last declaration that
/// names one wins.
pub fn file_wide_invocation(tree: &SyntaxTree, config: &DriftConfig) -> Option<String> {
    let suffix = config.source_suffix();
    if suffix.is_empty() {
        return None;
    }

    let mut script = None;
    for value in declared_literals(tree) {
        let Some(fragments) = value.literal_fragments() else {
            continue;
        };
        let found = fragments
            .iter()
            .flat_map(|f| f.split(|c: char| c == '/' || c.is_whitespace()))
            .find_map(|word| word.strip_suffix(suffix.as_str()))
            .filter(|stem| !stem.is_empty());
        if let Some(stem) = found {
            script = Some(stem.to_lowercase());
        }
    }
    script
}
