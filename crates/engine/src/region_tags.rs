//! Region-tag marker indexing.
//!
//! A region is opened by a comment containing `[START <tag>]` and closed by
//! the first later comment containing `[END <tag>]` with the same tag text.

use crate::types::{Diagnostic, RegionTagSpan};
use drift_syntax::SyntaxTree;
use once_cell::sync::Lazy;
use regex::Regex;

static START_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[START\s+([^\]\s]+)\s*\]").expect("valid start marker regex"));
static END_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[END\s+([^\]\s]+)\s*\]").expect("valid end marker regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
struct Marker {
    tag: String,
    line: usize,
}

/// Spans found in one file, plus markers that never closed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionTagIndex {
    pub spans: Vec<RegionTagSpan>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Pair start and end markers in a file's comment stream
pub fn index(tree: &SyntaxTree, path: &str) -> RegionTagIndex {
    let mut starts = Vec::new();
    let mut ends = Vec::new();

    for comment in &tree.comments {
        collect_markers(&START_MARKER, &comment.text, comment.line, &mut starts);
        collect_markers(&END_MARKER, &comment.text, comment.line, &mut ends);
    }

    let mut result = RegionTagIndex::default();
    for start in starts {
        let end = ends
            .iter()
            .filter(|end| end.line > start.line && end.tag == start.tag)
            .map(|end| end.line)
            .min();

        match end {
            Some(end_line) => result.spans.push(RegionTagSpan {
                tag: start.tag,
                start_line: start.line,
                end_line,
            }),
            None => {
                log::warn!("unclosed region tag: {} ({}:{})", start.tag, path, start.line);
                result.diagnostics.push(Diagnostic::UnclosedRegionTag {
                    path: path.to_string(),
                    tag: start.tag,
                    line: start.line,
                });
            }
        }
    }

    result
}

fn collect_markers(pattern: &Regex, text: &str, first_line: usize, out: &mut Vec<Marker>) {
    for caps in pattern.captures_iter(text) {
        let (Some(whole), Some(tag)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // block comments can hold markers on later lines
        let line = first_line + text[..whole.start()].matches('\n').count();
        out.push(Marker {
            tag: tag.as_str().to_string(),
            line,
        });
    }
}

/// Tags named by start markers anywhere in raw file text.
///
/// Independent of parsing, so it also covers metadata files and sources the
/// extractors do not understand.
pub fn scan_marker_tags(text: &str) -> Vec<String> {
    START_MARKER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|tag| tag.as_str().to_string())
        .collect()
}
