//! Directory-level pipeline: scan, extract, associate, apply overrides.

use crate::associator::associate;
use crate::config::DriftConfig;
use crate::error::{DriftError, Result};
use crate::overrides::{OverrideSet, ValidationProblem};
use crate::scanner::FileScanner;
use crate::source::SourceMethodExtractor;
use crate::test_chains::TestChainExtractor;
use crate::types::{Diagnostic, SnippetMethod, TestAssociation};
use drift_syntax::{JsParser, SyntaxTree};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// Everything one run learned about a sample directory
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub root: PathBuf,
    pub methods: Vec<SnippetMethod>,
    /// Tags named by any start marker under the root
    pub observed_tags: BTreeSet<String>,
    /// Tags override files mark as not needing tests
    pub suppressed_tags: BTreeSet<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Analysis {
    /// Tags attached to at least one method
    pub fn source_tags(&self) -> BTreeSet<String> {
        self.methods
            .iter()
            .flat_map(|m| m.region_tags.iter().cloned())
            .collect()
    }

    /// Tags attached to at least one tested method
    pub fn tested_tags(&self) -> BTreeSet<String> {
        self.methods
            .iter()
            .filter(|m| m.is_tested())
            .flat_map(|m| m.region_tags.iter().cloned())
            .collect()
    }

    /// Marker-scan tags that no method carries, minus suppressed and placeholder tags
    pub fn undetected_tags(&self, config: &DriftConfig) -> BTreeSet<String> {
        let source = self.source_tags();
        self.observed_tags
            .iter()
            .filter(|tag| !source.contains(*tag))
            .filter(|tag| !self.suppressed_tags.contains(*tag))
            .filter(|tag| !config.is_ignored_tag(tag))
            .cloned()
            .collect()
    }

    /// Number of distinct test cases covering each detected tag
    pub fn test_counts(&self) -> BTreeMap<String, usize> {
        let mut cases: BTreeMap<&str, HashSet<&TestAssociation>> = BTreeMap::new();
        for method in &self.methods {
            for tag in &method.region_tags {
                cases
                    .entry(tag.as_str())
                    .or_default()
                    .extend(method.test_data.iter());
            }
        }
        cases
            .into_iter()
            .map(|(tag, tests)| (tag.to_string(), tests.len()))
            .collect()
    }

    /// Source files holding a method with `tag`
    pub fn source_files_for(&self, tag: &str) -> BTreeSet<String> {
        self.methods
            .iter()
            .filter(|m| m.region_tags.contains(tag))
            .map(|m| m.source_path.clone())
            .collect()
    }

    /// Method records as pretty-printed camelCase JSON
    pub fn methods_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.methods)
            .map_err(|e| DriftError::report(format!("Failed to serialize methods: {e}")))
    }

    /// Write the method records to `path` (`repo.json` by convention)
    pub fn write_methods(&self, path: &Path) -> Result<()> {
        let json = self.methods_json()?;
        std::fs::write(path, json).map_err(|e| DriftError::io(path, e))
    }
}

/// Root-relative path with forward slashes
fn relative_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn parse_file(parser: &mut JsParser, path: &Path) -> Result<SyntaxTree> {
    let text = std::fs::read_to_string(path).map_err(|e| DriftError::io(path, e))?;
    parser.parse(&text).map_err(|e| DriftError::syntax(path, e))
}

/// Run the whole pipeline over a sample directory
pub fn analyze_dir(root: impl AsRef<Path>, config: &DriftConfig) -> Result<Analysis> {
    config.validate()?;
    let root = root.as_ref();
    let scanner = FileScanner::new(root, config);
    let files = scanner.scan();

    let mut parser = JsParser::new().map_err(|e| DriftError::syntax(root, e))?;
    let extractor = SourceMethodExtractor::new(config);
    let mut analysis = Analysis {
        root: root.to_path_buf(),
        ..Default::default()
    };

    for path in &files.sources {
        let tree = parse_file(&mut parser, path)?;
        let extracted = extractor.extract(&tree, &relative_path(path, root));
        log::debug!("{}: {} method(s)", path.display(), extracted.methods.len());
        analysis.methods.extend(extracted.methods);
        analysis.diagnostics.extend(extracted.diagnostics);
    }

    let chains = TestChainExtractor::new(config)?;
    for path in &files.tests {
        let tree = parse_file(&mut parser, path)?;
        let index = chains.extract(&tree, &relative_path(path, root));
        associate(&mut analysis.methods, &index, config);
    }

    let overrides = OverrideSet::load_all(&scanner.override_files())?;
    analysis.suppressed_tags = overrides.apply(&mut analysis.methods)?;
    analysis.observed_tags = scanner.marker_tags()?;

    log::info!(
        "Analyzed {}: {} method(s), {} tested, {} tag(s) observed",
        root.display(),
        analysis.methods.len(),
        analysis.methods.iter().filter(|m| m.is_tested()).count(),
        analysis.observed_tags.len()
    );

    Ok(analysis)
}

/// Validate every override file under `root` against the tags its markers name
pub fn validate_overrides(root: impl AsRef<Path>, config: &DriftConfig) -> Result<Vec<ValidationProblem>> {
    let scanner = FileScanner::new(root.as_ref(), config);
    let overrides = OverrideSet::load_all(&scanner.override_files())?;
    let observed = scanner.marker_tags()?;

    let entries: usize = overrides.files().iter().map(|f| f.tags().count()).sum();
    let problems = overrides.validate(&observed);
    log::info!(
        "Checked {entries} override entr(ies) in {} file(s): {} problem(s)",
        overrides.files().len(),
        problems.len()
    );
    Ok(problems)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Extraction;
    use pretty_assertions::assert_eq;

    fn method(path: &str, name: &str, tags: &[&str], tests: &[&[&str]]) -> SnippetMethod {
        let mut method = SnippetMethod::new(path, name, 1, 5, Extraction::DirectDeclaration);
        method.region_tags = tags.iter().map(|t| t.to_string()).collect();
        method.test_data = tests
            .iter()
            .map(|chain| {
                TestAssociation::new(chain.iter().map(|c| c.to_string()).collect(), "t.test.js")
            })
            .collect();
        method
    }

    fn set(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    fn sample() -> Analysis {
        Analysis {
            methods: vec![
                method("a.js", "a", &["tag_a", "shared"], &[&["g", "one"], &["g", "two"]]),
                method("b.js", "b", &["tag_b", "shared"], &[&["g", "one"]]),
                method("c.js", "c", &["tag_c"], &[]),
            ],
            observed_tags: set(&["tag_a", "tag_b", "tag_c", "ghost", "quiet", "app"]),
            suppressed_tags: set(&["quiet"]),
            ..Default::default()
        }
    }

    #[test]
    fn tag_sets() {
        let analysis = sample();
        assert_eq!(analysis.source_tags(), set(&["shared", "tag_a", "tag_b", "tag_c"]));
        assert_eq!(analysis.tested_tags(), set(&["shared", "tag_a", "tag_b"]));
        assert_eq!(analysis.undetected_tags(&DriftConfig::default()), set(&["ghost"]));
    }

    #[test]
    fn counts_distinct_cases_per_tag() {
        let counts = sample().test_counts();
        assert_eq!(counts["shared"], 2);
        assert_eq!(counts["tag_b"], 1);
        assert_eq!(counts["tag_c"], 0);
    }

    #[test]
    fn source_files_for_shared_tag() {
        assert_eq!(
            sample().source_files_for("shared"),
            set(&["a.js", "b.js"])
        );
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        assert_eq!(
            relative_path(Path::new("/repo/samples/a.js"), Path::new("/repo")),
            "samples/a.js"
        );
    }
}
