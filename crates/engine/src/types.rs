use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Named line span delimited by `[START tag]` / `[END tag]` markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionTagSpan {
    pub tag: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl RegionTagSpan {
    /// True when one span wholly contains the other (bounds inclusive).
    /// Spans that only partially overlap are not nested.
    #[must_use]
    pub const fn nests_with(&self, start_line: usize, end_line: usize) -> bool {
        let method_inside = self.start_line <= start_line && end_line <= self.end_line;
        let tag_inside = start_line <= self.start_line && self.end_line <= end_line;
        method_inside || tag_inside
    }
}

/// Identity of a single test case plus the files it was found in.
///
/// Equality is structural over both fields, which is what `test_data`
/// deduplication relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAssociation {
    pub describe_chain: Vec<String>,
    pub test_paths: BTreeSet<String>,
}

impl TestAssociation {
    pub fn new(describe_chain: Vec<String>, test_path: impl Into<String>) -> Self {
        Self {
            describe_chain,
            test_paths: BTreeSet::from([test_path.into()]),
        }
    }

    /// Chain joined the way xUnit reports name test cases (`group:case`)
    pub fn full_name(&self) -> String {
        self.describe_chain.join(":")
    }
}

/// How a snippet method was found, with the fields that strategy supplies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "camelCase")]
pub enum Extraction {
    /// `app.<verb>('<path>', ...)`
    #[serde(rename_all = "camelCase")]
    RouteHandler { http_method: String, url_path: String },

    /// `exports.<name> = ...`
    #[serde(rename_all = "camelCase")]
    ExportedHandler { function_name: String },

    /// Top-level function, or variable bound to an anonymous function
    DirectDeclaration,

    /// Sole named declaration inside the entry-point function
    WrappedEntryPoint,

    /// Declaration inside the first top-level function
    WrappedDirectDeclaration,
}

impl Extraction {
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Extraction::RouteHandler { .. } => "routeHandler",
            Extraction::ExportedHandler { .. } => "exportedHandler",
            Extraction::DirectDeclaration => "directDeclaration",
            Extraction::WrappedEntryPoint => "wrappedEntryPoint",
            Extraction::WrappedDirectDeclaration => "wrappedDirectDeclaration",
        }
    }

    /// Methods that come from a named declaration (CLI handlers bind to these)
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            Extraction::DirectDeclaration
                | Extraction::WrappedEntryPoint
                | Extraction::WrappedDirectDeclaration
        )
    }

    pub fn url_path(&self) -> Option<&str> {
        match self {
            Extraction::RouteHandler { url_path, .. } => Some(url_path),
            _ => None,
        }
    }

    pub fn http_method(&self) -> Option<&str> {
        match self {
            Extraction::RouteHandler { http_method, .. } => Some(http_method),
            _ => None,
        }
    }

    pub fn function_name(&self) -> Option<&str> {
        match self {
            Extraction::ExportedHandler { function_name } => Some(function_name),
            _ => None,
        }
    }
}

/// A top-level callable construct identified as a candidate documented unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetMethod {
    pub source_path: String,
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,

    #[serde(flatten)]
    pub extraction: Extraction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_invocation: Option<String>,

    #[serde(default)]
    pub region_tags: BTreeSet<String>,

    /// Names of sibling top-level methods called from this method's body
    #[serde(default)]
    pub children: BTreeSet<String>,

    #[serde(default)]
    pub test_data: Vec<TestAssociation>,
}

impl SnippetMethod {
    pub fn new(
        source_path: impl Into<String>,
        name: impl Into<String>,
        start_line: usize,
        end_line: usize,
        extraction: Extraction,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            name: name.into(),
            start_line,
            end_line,
            extraction,
            cli_invocation: None,
            region_tags: BTreeSet::new(),
            children: BTreeSet::new(),
            test_data: Vec::new(),
        }
    }

    pub fn is_tested(&self) -> bool {
        self.test_data.iter().any(|t| !t.test_paths.is_empty())
    }

    /// Drop structurally equal associations, keeping first occurrences
    pub fn dedup_test_data(&mut self) {
        let mut unique: Vec<TestAssociation> = Vec::with_capacity(self.test_data.len());
        for association in self.test_data.drain(..) {
            if !unique.contains(&association) {
                unique.push(association);
            }
        }
        self.test_data = unique;
    }
}

/// Recoverable anomaly surfaced during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// A `[START tag]` marker with no following `[END tag]`
    UnclosedRegionTag { path: String, tag: String, line: usize },

    /// Entry point wrapping several named declarations; none extracted
    AmbiguousEntryPoint { path: String, line: usize, candidates: usize },

    /// A test is already labelled with a different region tag
    ConflictingLabel { path: String, line: usize, proposed: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nesting_excludes_partial_overlap() {
        let span = RegionTagSpan {
            tag: "foo".to_string(),
            start_line: 5,
            end_line: 10,
        };
        assert!(span.nests_with(6, 9));
        assert!(span.nests_with(5, 10));
        assert!(span.nests_with(1, 20));
        assert!(!span.nests_with(1, 7));
        assert!(!span.nests_with(8, 12));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut method = SnippetMethod::new("a.js", "a", 1, 2, Extraction::DirectDeclaration);
        let first = TestAssociation::new(vec!["g".into(), "c".into()], "a.test.js");
        let second = TestAssociation::new(vec!["g".into(), "d".into()], "a.test.js");
        method.test_data = vec![first.clone(), second.clone(), first.clone()];

        method.dedup_test_data();
        assert_eq!(method.test_data, vec![first, second]);
    }

    #[test]
    fn serializes_strategy_fields_flat() {
        let method = SnippetMethod::new(
            "app.js",
            "GET /hello",
            3,
            5,
            Extraction::RouteHandler {
                http_method: "get".to_string(),
                url_path: "/hello".to_string(),
            },
        );
        let json = serde_json::to_value(&method).unwrap();

        assert_eq!(json["strategy"], "routeHandler");
        assert_eq!(json["strategy"], method.extraction.strategy_name());
        assert_eq!(json["httpMethod"], "get");
        assert_eq!(json["urlPath"], "/hello");
        assert_eq!(json["sourcePath"], "app.js");
        assert!(json.get("cliInvocation").is_none());
    }
}
