//! Directory-level override files.
//!
//! Each top-level key of an override file is a region tag. Its table is one of:
//!
//! ```toml
//! [ghost_tag]            # not required to be tested
//! tested = false
//!
//! [legacy_tag]           # methods tagged `new_tag` also carry `legacy_tag`
//! aliases = ["new_tag"]
//!
//! [manual_tag.upload]    # literal test associations, at any nesting depth
//! describeChain = ["uploads", "should upload"]
//! testPaths = ["test/upload.test.js"]
//! ```

use crate::error::{DriftError, Result};
use crate::types::{SnippetMethod, TestAssociation};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

const TESTED_KEY: &str = "tested";
const ALIASES_KEY: &str = "aliases";
const DESCRIBE_CHAIN_KEY: &str = "describeChain";
const TEST_PATHS_KEY: &str = "testPaths";

/// Interpretation of one override entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideRecord {
    /// `tested = false`
    Suppressed,
    /// Tags that imply this entry's tag
    Aliases(Vec<String>),
    /// Associations attached verbatim
    Manual(Vec<TestAssociation>),
}

/// A parsed override file
#[derive(Debug, Clone)]
pub struct OverrideFile {
    pub path: PathBuf,
    entries: Table,
}

impl OverrideFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| DriftError::io(path, e))?;
        Self::parse(path, &text)
    }

    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self> {
        let path = path.into();
        let entries = text.parse::<Table>().map_err(|e| DriftError::OverrideParse {
            file: path.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { path, entries })
    }

    /// Region tags this file has entries for
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Classify every entry; the first malformed entry is an error
    pub fn records(&self) -> Result<Vec<(String, OverrideRecord)>> {
        self.entries
            .iter()
            .map(|(tag, value)| {
                classify(value)
                    .map(|record| (tag.clone(), record))
                    .map_err(|reason| DriftError::malformed(tag, &self.path, reason))
            })
            .collect()
    }
}

fn classify(value: &Value) -> std::result::Result<OverrideRecord, String> {
    let Some(table) = value.as_table() else {
        return Err("entry must be a table".to_string());
    };

    if let Some(tested) = table.get(TESTED_KEY) {
        return match tested.as_bool() {
            Some(false) => Ok(OverrideRecord::Suppressed),
            _ => Err("`tested` must be false or omitted".to_string()),
        };
    }

    if let Some(aliases) = table.get(ALIASES_KEY) {
        return string_list(aliases)
            .map(OverrideRecord::Aliases)
            .ok_or_else(|| "`aliases` must be a list of region tags".to_string());
    }

    let mut associations = Vec::new();
    collect_associations(table, &mut associations)?;
    if associations.is_empty() {
        return Err(
            "expected `tested = false`, an `aliases` list, or test associations".to_string(),
        );
    }
    Ok(OverrideRecord::Manual(associations))
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Leaf tables carrying `describeChain` and `testPaths`, depth first
fn collect_associations(
    table: &Table,
    out: &mut Vec<TestAssociation>,
) -> std::result::Result<(), String> {
    if table.contains_key(DESCRIBE_CHAIN_KEY) || table.contains_key(TEST_PATHS_KEY) {
        let chain = table.get(DESCRIBE_CHAIN_KEY).and_then(string_list);
        let paths = table.get(TEST_PATHS_KEY).and_then(string_list);
        let (Some(describe_chain), Some(test_paths)) = (chain, paths) else {
            return Err("`describeChain` and `testPaths` must both be string lists".to_string());
        };
        out.push(TestAssociation {
            describe_chain,
            test_paths: test_paths.into_iter().collect(),
        });
        return Ok(());
    }

    for (key, value) in table {
        match value.as_table() {
            Some(nested) => collect_associations(nested, out)?,
            None => return Err(format!("unexpected value under `{key}`")),
        }
    }
    Ok(())
}

/// All override files of a directory tree, applied together
#[derive(Debug, Clone, Default)]
pub struct OverrideSet {
    files: Vec<OverrideFile>,
}

impl OverrideSet {
    pub fn new(files: Vec<OverrideFile>) -> Self {
        Self { files }
    }

    pub fn load_all(paths: &[PathBuf]) -> Result<Self> {
        let files = paths
            .iter()
            .map(OverrideFile::load)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(files))
    }

    pub fn files(&self) -> &[OverrideFile] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// `alias → canonical tag` across all files
    pub fn alias_map(&self) -> Result<BTreeMap<String, String>> {
        let mut aliases = BTreeMap::new();
        for file in &self.files {
            for (tag, record) in file.records()? {
                if let OverrideRecord::Aliases(list) = record {
                    for alias in list {
                        aliases.insert(alias, tag.clone());
                    }
                }
            }
        }
        Ok(aliases)
    }

    /// Add each carried tag's canonical tag. One hop per call: chains of
    /// aliases need repeated calls to saturate.
    pub fn apply_aliases(&self, methods: &mut [SnippetMethod]) -> Result<()> {
        let aliases = self.alias_map()?;
        if aliases.is_empty() {
            return Ok(());
        }

        for method in methods.iter_mut() {
            let canonical: Vec<String> = method
                .region_tags
                .iter()
                .filter_map(|tag| aliases.get(tag).cloned())
                .collect();
            method.region_tags.extend(canonical);
        }
        Ok(())
    }

    /// Attach manual associations. Every entry, whatever its kind, must name
    /// a tag some method carries.
    pub fn apply_manual(&self, methods: &mut [SnippetMethod]) -> Result<()> {
        for file in &self.files {
            for (tag, record) in file.records()? {
                let mut matched = 0usize;
                for method in methods.iter_mut().filter(|m| m.region_tags.contains(&tag)) {
                    if let OverrideRecord::Manual(associations) = &record {
                        method.test_data.extend(associations.iter().cloned());
                        method.dedup_test_data();
                    }
                    matched += 1;
                }

                if matched == 0 {
                    return Err(DriftError::DanglingOverride {
                        tag,
                        file: file.path.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Tags explicitly marked as not needing tests
    pub fn suppressed_tags(&self) -> Result<BTreeSet<String>> {
        let mut suppressed = BTreeSet::new();
        for file in &self.files {
            for (tag, record) in file.records()? {
                if record == OverrideRecord::Suppressed {
                    suppressed.insert(tag);
                }
            }
        }
        Ok(suppressed)
    }

    /// Alias pass, then manual pass; returns the suppression set
    pub fn apply(&self, methods: &mut [SnippetMethod]) -> Result<BTreeSet<String>> {
        self.apply_aliases(methods)?;
        self.apply_manual(methods)?;
        let suppressed = self.suppressed_tags()?;
        log::info!(
            "Applied {} override file(s), {} suppressed tag(s)",
            self.files.len(),
            suppressed.len()
        );
        Ok(suppressed)
    }

    /// Check every file against the tags a marker scan observed
    pub fn validate(&self, observed_tags: &BTreeSet<String>) -> Vec<ValidationProblem> {
        let mut problems = Vec::new();
        let mut seen: BTreeMap<&str, &Path> = BTreeMap::new();

        for file in &self.files {
            for (tag, value) in &file.entries {
                let problem = |kind| ValidationProblem {
                    file: file.path.clone(),
                    tag: tag.clone(),
                    kind,
                };

                if !observed_tags.contains(tag) {
                    problems.push(problem(ProblemKind::UnusedTag));
                }
                if let Some(first) = seen.insert(tag.as_str(), file.path.as_path()) {
                    problems.push(problem(ProblemKind::Duplicate(first.to_path_buf())));
                }

                match classify(value) {
                    Ok(OverrideRecord::Aliases(aliases)) => {
                        let unknown: Vec<String> = aliases
                            .into_iter()
                            .filter(|a| !observed_tags.contains(a))
                            .collect();
                        if !unknown.is_empty() {
                            problems.push(problem(ProblemKind::UnknownAliases(unknown)));
                        }
                    }
                    Ok(_) => {}
                    Err(reason) => problems.push(problem(ProblemKind::Malformed(reason))),
                }
            }
        }

        problems
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProblemKind {
    /// Tag not found by the marker scan
    UnusedTag,
    /// Tag already has an entry in another file
    Duplicate(PathBuf),
    UnknownAliases(Vec<String>),
    Malformed(String),
}

/// One reason an override file fails validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationProblem {
    pub file: PathBuf,
    pub tag: String,
    pub kind: ProblemKind,
}

impl fmt::Display for ValidationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self.file.display();
        let tag = &self.tag;
        match &self.kind {
            ProblemKind::UnusedTag => {
                write!(f, "{file}: region tag {tag} is not used in any source file")
            }
            ProblemKind::Duplicate(first) => write!(
                f,
                "{file}: region tag {tag} already has an entry in {}",
                first.display()
            ),
            ProblemKind::UnknownAliases(aliases) => write!(
                f,
                "{file}: invalid aliases for {tag}: {} not used in any source file",
                aliases.join(", ")
            ),
            ProblemKind::Malformed(reason) => {
                write!(f, "{file}: badly-formatted entry {tag}: {reason}")
            }
        }
    }
}
