//! Snippet-method extraction from source files.
//!
//! ```text
//! SyntaxTree
//!     │
//!     ├──> Strategies (fixed order)
//!     │      ├─ route handlers        app.get('/path', ...)
//!     │      ├─ exported handlers     exports.name = ...
//!     │      ├─ direct declarations   function name() {} / const name = () => {}
//!     │      ├─ wrapped entry point   function main() { function name() {} }
//!     │      └─ wrapped declarations  first function's inner declarations
//!     │
//!     ├──> Structural dedup (first occurrence wins)
//!     ├──> Sibling call children
//!     ├──> Region tags (nesting spans)
//!     └──> CLI invocation names
//! ```

mod strategies;

pub use strategies::{
    DirectDeclarationStrategy, ExportedHandlerStrategy, RouteHandlerStrategy,
    WrappedDirectDeclarationStrategy, WrappedEntryPointStrategy,
};

use crate::cli_commands;
use crate::config::DriftConfig;
use crate::region_tags;
use crate::types::{Diagnostic, SnippetMethod};
use drift_syntax::{SyntaxNode, SyntaxTree};
use std::collections::{BTreeMap, BTreeSet};

/// A method still paired with the node it was extracted from
#[derive(Debug, Clone)]
pub struct Candidate<'t> {
    pub node: &'t SyntaxNode,
    pub method: SnippetMethod,
}

/// Per-file state shared by strategies
pub struct ExtractContext<'c> {
    pub config: &'c DriftConfig,
    pub path: &'c str,
    pub diagnostics: Vec<Diagnostic>,
}

/// One way of recognizing snippet methods in a statement list
pub trait SourceStrategy {
    fn name(&self) -> &'static str;

    fn extract<'t>(
        &self,
        statements: &'t [SyntaxNode],
        ctx: &mut ExtractContext<'_>,
    ) -> Vec<Candidate<'t>>;
}

/// Strategies in the order their results take precedence
pub fn default_strategies() -> Vec<Box<dyn SourceStrategy>> {
    vec![
        Box::new(RouteHandlerStrategy),
        Box::new(ExportedHandlerStrategy),
        Box::new(DirectDeclarationStrategy),
        Box::new(WrappedEntryPointStrategy),
        Box::new(WrappedDirectDeclarationStrategy),
    ]
}

/// Methods extracted from one source file
#[derive(Debug, Clone, Default)]
pub struct ExtractedSource {
    pub methods: Vec<SnippetMethod>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs every strategy over a source file and normalizes the union
pub struct SourceMethodExtractor<'c> {
    config: &'c DriftConfig,
    strategies: Vec<Box<dyn SourceStrategy>>,
}

impl<'c> SourceMethodExtractor<'c> {
    pub fn new(config: &'c DriftConfig) -> Self {
        Self {
            config,
            strategies: default_strategies(),
        }
    }

    /// Extract methods with children, region tags and CLI invocations attached
    pub fn extract(&self, tree: &SyntaxTree, path: &str) -> ExtractedSource {
        let mut ctx = ExtractContext {
            config: self.config,
            path,
            diagnostics: Vec::new(),
        };

        let mut candidates: Vec<Candidate<'_>> = Vec::new();
        for strategy in &self.strategies {
            let found = strategy.extract(tree.statements(), &mut ctx);
            log::debug!("{path}: {} found {} method(s)", strategy.name(), found.len());
            candidates.extend(found);
        }

        let candidates = dedup_candidates(candidates);
        let children = sibling_children(&candidates);

        let regions = region_tags::index(tree, path);
        ctx.diagnostics.extend(regions.diagnostics);
        let cli = cli_commands::extract(tree);

        let methods = candidates
            .into_iter()
            .zip(children)
            .map(|(candidate, children)| {
                let mut method = candidate.method;
                method.children = children;
                method.region_tags = regions
                    .spans
                    .iter()
                    .filter(|span| span.nests_with(method.start_line, method.end_line))
                    .filter(|span| !self.config.is_ignored_tag(&span.tag))
                    .map(|span| span.tag.clone())
                    .collect();
                attach_cli_invocation(&mut method, &cli);
                method
            })
            .collect();

        ExtractedSource {
            methods,
            diagnostics: ctx.diagnostics,
        }
    }
}

/// Remove candidates whose nodes are structurally equal to an earlier one
fn dedup_candidates(candidates: Vec<Candidate<'_>>) -> Vec<Candidate<'_>> {
    let mut unique: Vec<Candidate<'_>> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique
            .iter()
            .any(|kept| kept.node.structurally_eq(candidate.node))
        {
            unique.push(candidate);
        }
    }
    unique
}

/// Bare callee names inside each method that name another extracted method
fn sibling_children(candidates: &[Candidate<'_>]) -> Vec<BTreeSet<String>> {
    let method_names: BTreeSet<&str> = candidates
        .iter()
        .filter(|c| c.method.extraction.url_path().is_none())
        .map(|c| c.method.name.as_str())
        .collect();

    candidates
        .iter()
        .map(|candidate| {
            let mut children = BTreeSet::new();
            candidate.node.walk(&mut |node| {
                let Some(name) = node.callee().and_then(SyntaxNode::identifier_name) else {
                    return;
                };
                if name != candidate.method.name && method_names.contains(name) {
                    children.insert(name.to_string());
                }
            });
            children
        })
        .collect()
}

fn attach_cli_invocation(method: &mut SnippetMethod, cli: &BTreeMap<String, String>) {
    if !method.extraction.is_declaration() {
        return;
    }
    if let Some(invocation) = cli.get(&method.name) {
        method.cli_invocation = Some(invocation.clone());
    }
}

#[cfg(test)]
mod tests;
