//! Reports built from an [`Analysis`]: tag listings, per-file coverage and
//! xUnit annotation.

use crate::analyze::Analysis;
use crate::config::DriftConfig;
use crate::error::{DriftError, Result};
use crate::types::SnippetMethod;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

static TESTCASE_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<testcase\b[^>]*>").expect("valid testcase regex"));
static CLASSNAME_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\sclassname="([^"]*)""#).expect("valid classname regex"));
static NAME_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\sname="([^"]*)""#).expect("valid name regex"));

const CUSTOM_PROPERTY: &str = "customProperty=";

/// One detected tag with its coverage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSummary {
    pub tag: String,
    pub test_count: usize,
    pub source_files: BTreeSet<String>,
}

impl TagSummary {
    pub fn is_tested(&self) -> bool {
        self.test_count > 0
    }
}

/// Tags attached to methods, and marker tags nothing picked up
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionTagReport {
    pub detected: Vec<TagSummary>,
    pub undetected: Vec<String>,
}

pub fn region_tag_report(analysis: &Analysis, config: &DriftConfig) -> RegionTagReport {
    let counts = analysis.test_counts();
    let detected = analysis
        .source_tags()
        .into_iter()
        .map(|tag| TagSummary {
            test_count: counts.get(&tag).copied().unwrap_or_default(),
            source_files: analysis.source_files_for(&tag),
            tag,
        })
        .collect();

    RegionTagReport {
        detected,
        undetected: analysis.undetected_tags(config).into_iter().collect(),
    }
}

/// Which source files `list-source-files` prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestedFilter {
    /// Every method in the file is tested
    All,
    /// At least one method is tested
    Some,
    /// No method is tested
    None,
    /// Every file with a method
    Any,
}

impl fmt::Display for TestedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Some => "some",
            Self::None => "none",
            Self::Any => "*",
        })
    }
}

/// Source files whose methods satisfy `filter`, sorted
pub fn source_files(analysis: &Analysis, filter: TestedFilter) -> Vec<String> {
    let mut by_file: BTreeMap<&str, Vec<&SnippetMethod>> = BTreeMap::new();
    for method in &analysis.methods {
        by_file.entry(&method.source_path).or_default().push(method);
    }

    by_file
        .into_iter()
        .filter(|(_, methods)| match filter {
            TestedFilter::All => methods.iter().all(|m| m.is_tested()),
            TestedFilter::Some => methods.iter().any(|m| m.is_tested()),
            TestedFilter::None => !methods.iter().any(|m| m.is_tested()),
            TestedFilter::Any => true,
        })
        .map(|(path, _)| path.to_string())
        .collect()
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Tags of the first tested method with a case named `full_name`
fn tags_for_case<'a>(analysis: &'a Analysis, full_name: &str) -> Option<&'a BTreeSet<String>> {
    analysis
        .methods
        .iter()
        .filter(|m| !m.test_data.is_empty())
        .find(|m| m.test_data.iter().any(|t| t.full_name() == full_name))
        .map(|m| &m.region_tags)
        .filter(|tags| !tags.is_empty())
}

/// Add a `customProperty` attribute listing region tags to each matching xUnit test case
pub fn inject_snippet_mapping(xml: &str, analysis: &Analysis) -> Result<String> {
    if !TESTCASE_ELEMENT.is_match(xml) {
        return Err(DriftError::report("Input has no <testcase> elements"));
    }

    let mut annotated = 0usize;
    let output = TESTCASE_ELEMENT.replace_all(xml, |caps: &Captures<'_>| {
        let element = &caps[0];
        if element.contains(CUSTOM_PROPERTY) {
            return element.to_string();
        }

        let (Some(classname), Some(name)) =
            (CLASSNAME_ATTR.captures(element), NAME_ATTR.captures(element))
        else {
            return element.to_string();
        };
        let full_name = format!("{}:{}", unescape_xml(&classname[1]), unescape_xml(&name[1]));

        let Some(tags) = tags_for_case(analysis, &full_name) else {
            return element.to_string();
        };
        let Some(name_attr) = name.get(0) else {
            return element.to_string();
        };

        annotated += 1;
        let joined = tags.iter().map(String::as_str).collect::<Vec<_>>().join(",");
        format!(
            "{} {CUSTOM_PROPERTY}\"{joined}\"{}",
            &element[..name_attr.end()],
            &element[name_attr.end()..]
        )
    });

    log::info!("Annotated {annotated} test case(s) with region tags");
    Ok(output.into_owned())
}
