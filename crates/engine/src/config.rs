use crate::error::{DriftError, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for extraction and association behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// File extensions treated as sample/test sources
    pub source_extensions: Vec<String>,

    /// Substring that marks a path as a test file
    pub test_file_marker: String,

    /// Directory names never descended into
    pub excluded_dirs: Vec<String>,

    /// Reserved entry-point function name (e.g. `main`)
    pub entry_point_name: String,

    /// Identifier whose properties are exported handlers
    pub exports_identifier: String,

    /// HTTP verbs recognized on route registrations and client calls
    pub http_methods: Vec<String>,

    /// Callee names of test-grouping blocks
    pub group_functions: Vec<String>,

    /// Callee names of leaf test cases
    pub case_functions: Vec<String>,

    /// Callee names of subprocess-execution helpers
    pub exec_functions: Vec<String>,

    /// Runner prefix stripped from shell commands (`node file.js cmd`)
    pub runner_prefix: String,

    /// Pattern a group description must match to be replaced by a top-level constant
    pub region_tag_constant_pattern: String,

    /// Placeholder region tags never attached to methods
    pub ignored_region_tags: Vec<String>,

    /// Path substring enabling the full-path association rule
    pub quickstart_marker: String,

    /// Name of per-directory override files
    pub override_file_name: String,

    /// Extensions whose raw text is scanned for region-tag start markers
    pub marker_scan_extensions: Vec<String>,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            source_extensions: vec!["js".to_string()],
            test_file_marker: ".test.".to_string(),
            excluded_dirs: vec!["node_modules".to_string()],
            entry_point_name: "main".to_string(),
            exports_identifier: "exports".to_string(),
            http_methods: ["get", "post", "put", "patch", "delete"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            group_functions: vec!["describe".to_string()],
            case_functions: vec!["it".to_string()],
            exec_functions: vec!["execSync".to_string()],
            runner_prefix: "node".to_string(),
            region_tag_constant_pattern: "^region(_|)tag$".to_string(),
            ignored_region_tags: vec!["app".to_string(), "all".to_string()],
            quickstart_marker: "quickstart".to_string(),
            override_file_name: ".drift-data.toml".to_string(),
            marker_scan_extensions: ["js", "yaml", "yml", "json", "html", "css", "txt"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl DriftConfig {
    /// Load configuration from a TOML file; missing keys fall back to defaults
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| DriftError::io(path, e))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| DriftError::invalid_config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.source_extensions.is_empty() {
            return Err(DriftError::invalid_config("source_extensions must not be empty"));
        }

        if self.test_file_marker.is_empty() {
            return Err(DriftError::invalid_config("test_file_marker must not be empty"));
        }

        if self.entry_point_name.is_empty() {
            return Err(DriftError::invalid_config("entry_point_name must not be empty"));
        }

        if self.override_file_name.is_empty() {
            return Err(DriftError::invalid_config("override_file_name must not be empty"));
        }

        self.region_tag_constant_regex()?;
        Ok(())
    }

    /// Compiled, case-insensitive region-tag constant pattern
    pub fn region_tag_constant_regex(&self) -> Result<Regex> {
        RegexBuilder::new(&self.region_tag_constant_pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                DriftError::invalid_config(format!(
                    "region_tag_constant_pattern ({}) is invalid: {e}",
                    self.region_tag_constant_pattern
                ))
            })
    }

    pub fn is_test_path(&self, path: &Path) -> bool {
        path.to_string_lossy().contains(&self.test_file_marker)
    }

    pub fn is_source_extension(&self, path: &Path) -> bool {
        has_extension(path, &self.source_extensions)
    }

    pub fn is_marker_scan_extension(&self, path: &Path) -> bool {
        has_extension(path, &self.marker_scan_extensions)
    }

    pub fn is_http_method(&self, verb: &str) -> bool {
        self.http_methods.iter().any(|m| m.eq_ignore_ascii_case(verb))
    }

    pub fn is_ignored_tag(&self, tag: &str) -> bool {
        self.ignored_region_tags.iter().any(|t| t == tag)
    }

    /// Primary source suffix, including the dot (`.js`)
    pub fn source_suffix(&self) -> String {
        self.source_extensions
            .first()
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default()
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
