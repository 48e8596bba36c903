//! Wraps a single test block in a region-tag group so xUnit reports carry the tag.

use crate::error::{DriftError, Result};
use crate::types::Diagnostic;
use drift_syntax::Language;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

static JS_DESCRIPTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(describe|it)\(").expect("valid descriptor regex"));
static RUBY_DESCRIPTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"describe\s").expect("valid descriptor regex"));

/// Block syntax of a test-file category
struct BlockRules {
    closing: &'static str,
    descriptor: &'static Regex,
    opening: fn(&str) -> String,
}

impl BlockRules {
    fn for_language(language: Language) -> Result<Self> {
        match language {
            Language::JavaScript | Language::TypeScript => Ok(Self {
                closing: "});",
                descriptor: &JS_DESCRIPTOR,
                opening: |label| format!("describe('{label}', () => {{"),
            }),
            Language::Ruby => Ok(Self {
                closing: "end",
                descriptor: &RUBY_DESCRIPTOR,
                opening: |label| format!("describe \"{label}\" do"),
            }),
            other => Err(DriftError::UnsupportedCategory(other.as_str().to_string())),
        }
    }
}

/// Result of a wrap attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrapOutcome {
    /// The test block now sits inside the new group
    Wrapped(Vec<String>),
    /// The exact group already encloses the test
    AlreadyLabelled,
    /// Another underscore-bearing tag label sits above the test
    ConflictingLabel(Diagnostic),
}

fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn leading_whitespace(line: &str) -> &str {
    &line[..indent_width(line)]
}

/// Index of the first line after `start` that closes a block at `start`'s indentation
pub fn find_closing_block(language: Language, lines: &[String], start: usize) -> Result<Option<usize>> {
    let rules = BlockRules::for_language(language)?;
    let Some(start_line) = lines.get(start) else {
        return Ok(None);
    };
    let indent = indent_width(start_line);
    Ok(lines
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, line)| line.ends_with(rules.closing) && indent_width(line) == indent)
        .map(|(index, _)| index))
}

/// Index of the nearest line before `start` that closes a block at `start`'s indentation
pub fn find_preceding_block(language: Language, lines: &[String], start: usize) -> Result<Option<usize>> {
    let rules = BlockRules::for_language(language)?;
    let Some(start_line) = lines.get(start) else {
        return Ok(None);
    };
    let indent = indent_width(start_line);
    Ok(lines[..start]
        .iter()
        .enumerate()
        .rev()
        .find(|(_, line)| line.ends_with(rules.closing) && indent_width(line) == indent)
        .map(|(index, _)| index))
}

/// Wrap the first test whose line contains `test_filter` in a group labelled with `tags`.
///
/// Tags are deduplicated and sorted before being joined with spaces. Lines
/// above the test that belong to its enclosing blocks are checked for an
/// existing label first.
pub fn wrap_test(
    language: Language,
    path: &str,
    lines: &[String],
    test_filter: &str,
    tags: &[String],
) -> Result<WrapOutcome> {
    let rules = BlockRules::for_language(language)?;

    let tags: BTreeSet<&str> = tags.iter().map(String::as_str).collect();
    if tags.is_empty() {
        return Err(DriftError::report("No region tags to label the test with"));
    }
    let label = tags.iter().copied().collect::<Vec<_>>().join(" ");
    let opening = (rules.opening)(&label);

    let start = lines
        .iter()
        .position(|line| line.contains(test_filter))
        .ok_or_else(|| DriftError::report(format!("No matching test filter: {test_filter}")))?;

    log::info!("Wrapping test: {test_filter} --> {label}");

    let test_indent = indent_width(&lines[start]);
    let mut cursor = start;
    loop {
        let line = &lines[cursor];
        let enclosing =
            line.is_empty() || rules.descriptor.is_match(line) || test_indent <= indent_width(line);
        if !enclosing {
            break;
        }

        if line.ends_with(&opening) {
            log::info!("Exact region tag already present, skipping");
            return Ok(WrapOutcome::AlreadyLabelled);
        }

        if tags.iter().any(|tag| tag.contains('_') && line.contains(tag)) {
            log::warn!("Different region tags present in {path}:{}, label manually (proposed: {label})", cursor + 1);
            return Ok(WrapOutcome::ConflictingLabel(Diagnostic::ConflictingLabel {
                path: path.to_string(),
                line: cursor + 1,
                proposed: label,
            }));
        }

        if cursor == 0 {
            break;
        }
        cursor -= 1;
    }

    let end = find_closing_block(language, lines, start)?.ok_or_else(|| {
        DriftError::report(format!("No closing block for test at {path}:{}", start + 1))
    })?;

    let indent = leading_whitespace(&lines[start]);
    let mut wrapped = Vec::with_capacity(lines.len() + 2);
    wrapped.extend_from_slice(&lines[..start]);
    wrapped.push(format!("{indent}{opening}"));
    wrapped.extend_from_slice(&lines[start..=end]);
    wrapped.push(format!("{indent}{}", rules.closing));
    wrapped.extend_from_slice(&lines[end + 1..]);

    Ok(WrapOutcome::Wrapped(wrapped))
}

/// Wrap a test in place; the file is rewritten only when the outcome is `Wrapped`
pub fn wrap_test_file(path: &Path, test_filter: &str, tags: &[String]) -> Result<WrapOutcome> {
    let text = std::fs::read_to_string(path).map_err(|e| DriftError::io(path, e))?;
    let lines: Vec<String> = text.split('\n').map(str::to_string).collect();

    let outcome = wrap_test(
        Language::from_path(path),
        &path.to_string_lossy(),
        &lines,
        test_filter,
        tags,
    )?;

    if let WrapOutcome::Wrapped(wrapped) = &outcome {
        std::fs::write(path, wrapped.join("\n")).map_err(|e| DriftError::io(path, e))?;
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|t| t.to_string()).collect()
    }

    const JS_TEST: &str = "\
describe('quickstart', () => {
  it('should list buckets', async () => {
    const out = execSync(cmd);
  });

  it('should create a bucket', async () => {
    const out = execSync(`${cmd} create`);
  });
});";

    #[test]
    fn wraps_javascript_test_with_sorted_unique_tags() {
        let outcome = wrap_test(
            Language::JavaScript,
            "quickstart.test.js",
            &lines(JS_TEST),
            "should create a bucket",
            &tags(&["storage_create_bucket", "storage_create_bucket", "storage_a"]),
        )
        .unwrap();

        let expected = lines(
            "\
describe('quickstart', () => {
  it('should list buckets', async () => {
    const out = execSync(cmd);
  });

  describe('storage_a storage_create_bucket', () => {
  it('should create a bucket', async () => {
    const out = execSync(`${cmd} create`);
  });
  });
});",
        );
        assert_eq!(outcome, WrapOutcome::Wrapped(expected));
    }

    #[test]
    fn existing_label_is_left_alone() {
        let source = lines(
            "\
describe('quickstart', () => {
  describe('storage_list', () => {
    it('should list buckets', async () => {
      run();
    });
  });
});",
        );
        let outcome = wrap_test(
            Language::JavaScript,
            "q.test.js",
            &source,
            "should list buckets",
            &tags(&["storage_list"]),
        )
        .unwrap();
        assert_eq!(outcome, WrapOutcome::AlreadyLabelled);
    }

    #[test]
    fn label_on_first_line_is_left_alone() {
        let source = lines(
            "\
describe('storage_list', () => {
  it('should list buckets', async () => {
    run();
  });
});",
        );
        let outcome = wrap_test(
            Language::JavaScript,
            "q.test.js",
            &source,
            "should list buckets",
            &tags(&["storage_list"]),
        )
        .unwrap();
        assert_eq!(outcome, WrapOutcome::AlreadyLabelled);
    }

    #[test]
    fn different_label_mentioning_a_tag_conflicts() {
        let source = lines(
            "\
describe('quickstart', () => {
  describe('storage_list storage_other', () => {
    it('should list buckets', async () => {
      run();
    });
  });
});",
        );
        let outcome = wrap_test(
            Language::JavaScript,
            "q.test.js",
            &source,
            "should list buckets",
            &tags(&["storage_list"]),
        )
        .unwrap();
        assert_eq!(
            outcome,
            WrapOutcome::ConflictingLabel(Diagnostic::ConflictingLabel {
                path: "q.test.js".to_string(),
                line: 2,
                proposed: "storage_list".to_string(),
            })
        );
    }

    #[test]
    fn wraps_ruby_test() {
        let source = lines(
            "\
describe \"Storage\" do
  it \"lists buckets\" do
    list_buckets
  end
end",
        );
        let outcome = wrap_test(
            Language::Ruby,
            "storage_spec.rb",
            &source,
            "lists buckets",
            &tags(&["storage_list_buckets"]),
        )
        .unwrap();

        let WrapOutcome::Wrapped(wrapped) = outcome else {
            panic!("expected wrapped output, got {outcome:?}");
        };
        assert_eq!(wrapped[1], "  describe \"storage_list_buckets\" do");
        assert_eq!(wrapped[5], "  end");
        assert_eq!(wrapped[6], "end");
    }

    #[test]
    fn unsupported_categories_are_fatal() {
        let source = lines("def test_x():\n    pass");
        for language in [Language::Python, Language::Php] {
            let err = wrap_test(language, "t", &source, "test_x", &tags(&["a_b"])).unwrap_err();
            assert!(matches!(err, DriftError::UnsupportedCategory(_)));
            assert!(find_closing_block(language, &source, 0).is_err());
            assert!(find_preceding_block(language, &source, 1).is_err());
        }
    }

    #[test]
    fn unknown_filter_is_reported() {
        let err = wrap_test(
            Language::JavaScript,
            "q.test.js",
            &lines(JS_TEST),
            "no such test",
            &tags(&["a_b"]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("No matching test filter"));
    }

    #[test]
    fn block_lookup_matches_indentation() {
        let source = lines(JS_TEST);
        assert_eq!(find_closing_block(Language::JavaScript, &source, 1).unwrap(), Some(3));
        assert_eq!(find_closing_block(Language::JavaScript, &source, 0).unwrap(), Some(8));
        assert_eq!(find_preceding_block(Language::JavaScript, &source, 5).unwrap(), Some(3));
        assert_eq!(find_preceding_block(Language::JavaScript, &source, 1).unwrap(), None);
    }

    #[test]
    fn wraps_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quickstart.test.js");
        std::fs::write(&path, JS_TEST).unwrap();

        let outcome = wrap_test_file(&path, "should list buckets", &tags(&["storage_list"])).unwrap();
        assert!(matches!(outcome, WrapOutcome::Wrapped(_)));

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("  describe('storage_list', () => {\n  it('should list buckets'"));

        let again = wrap_test_file(&path, "should list buckets", &tags(&["storage_list"])).unwrap();
        assert_eq!(again, WrapOutcome::AlreadyLabelled);
    }
}
