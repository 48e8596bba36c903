//! Test-case chains and the invocation keys each case exercises.
//!
//! ```text
//! describe('group', () => {          chain: ["group"]
//!   before(...)                      hooks are ignored
//!   it('case', async () => {         chain: ["group", "case"]
//!     await listFiles();               ─┐
//!     execSync(`${cmd} upload`);        ├─> matchers ─> LookupTable
//!   });                                ─┘
//! });
//! ```

mod matchers;
mod scans;

pub use matchers::{
    default_matchers, CaseContext, DirectCallMatcher, HandlerInvocationMatcher,
    HttpClientMatcher, RegionTagConstantMatcher, ShellCommandMatcher, TestMatcher,
};
pub use scans::{file_wide_invocation, top_level_constants};

use crate::config::DriftConfig;
use crate::error::Result;
use crate::lookup::LookupTable;
use drift_syntax::{SyntaxNode, SyntaxTree};
use regex::Regex;

/// Everything the associator needs from one test file
#[derive(Debug, Clone, Default)]
pub struct TestFileIndex {
    pub test_path: String,
    pub table: LookupTable,
    /// Script stem referenced by a file holding exactly one test case
    pub file_wide_invocation: Option<String>,
    pub case_count: usize,
}

impl TestFileIndex {
    pub fn is_single_case(&self) -> bool {
        self.case_count == 1
    }
}

struct WalkState<'a> {
    test_path: &'a str,
    constant: Option<&'a str>,
    table: LookupTable,
    case_count: usize,
}

/// Walks nested test groups and feeds every leaf case through the matchers
pub struct TestChainExtractor<'c> {
    config: &'c DriftConfig,
    matchers: Vec<Box<dyn TestMatcher>>,
    constant_pattern: Regex,
}

impl<'c> TestChainExtractor<'c> {
    pub fn new(config: &'c DriftConfig) -> Result<Self> {
        Ok(Self {
            config,
            matchers: default_matchers(),
            constant_pattern: config.region_tag_constant_regex()?,
        })
    }

    pub fn extract(&self, tree: &SyntaxTree, test_path: &str) -> TestFileIndex {
        let constants = top_level_constants(tree);
        let mut state = WalkState {
            test_path,
            constant: constants.first().map(String::as_str),
            table: LookupTable::new(),
            case_count: 0,
        };

        let groups: Vec<&SyntaxNode> = tree
            .statements()
            .iter()
            .filter(|s| self.block_call(s).is_some_and(|(name, _)| self.is_group(name)))
            .collect();

        // files without groups hold bare cases at top level
        if groups.is_empty() {
            self.walk(tree.statements().iter(), &[], &mut state);
        } else {
            self.walk(groups, &[], &mut state);
        }

        let file_wide_invocation = if state.case_count == 1 {
            file_wide_invocation(tree, self.config)
        } else {
            None
        };

        log::debug!(
            "{test_path}: {} case(s), {} key(s)",
            state.case_count,
            state.table.len()
        );

        TestFileIndex {
            test_path: test_path.to_string(),
            table: state.table,
            file_wide_invocation,
            case_count: state.case_count,
        }
    }

    fn is_group(&self, name: &str) -> bool {
        self.config.group_functions.iter().any(|f| f == name)
    }

    fn is_case(&self, name: &str) -> bool {
        self.config.case_functions.iter().any(|f| f == name)
    }

    /// `name(args...)` as a statement, with a bare identifier callee
    fn block_call<'n>(&self, statement: &'n SyntaxNode) -> Option<(&'n str, Vec<&'n SyntaxNode>)> {
        let call = statement.statement_expression()?.unwrap_await();
        let name = call.callee()?.identifier_name()?;
        Some((name, call.call_arguments()))
    }

    fn walk<'n>(
        &self,
        statements: impl IntoIterator<Item = &'n SyntaxNode>,
        chain: &[String],
        state: &mut WalkState<'_>,
    ) {
        for statement in statements {
            let Some((name, args)) = self.block_call(statement) else {
                continue;
            };

            if self.is_group(name) {
                let description = args
                    .first()
                    .and_then(|a| self.group_description(a, state.constant));
                let body = args
                    .get(1)
                    .and_then(|callback| callback.child_by_field("body"))
                    .filter(|body| body.is("statement_block"));
                let (Some(description), Some(body)) = (description, body) else {
                    continue;
                };

                let mut nested = chain.to_vec();
                nested.push(description);
                self.walk(body.children(), &nested, state);
            } else if self.is_case(name) {
                self.visit_case(&args, chain, state);
            }
        }
    }

    fn visit_case(&self, args: &[&SyntaxNode], chain: &[String], state: &mut WalkState<'_>) {
        let Some(description) = args.first().and_then(|a| literal_text(a)) else {
            return;
        };
        let Some(body) = args.get(1).and_then(|callback| callback.child_by_field("body")) else {
            return;
        };

        let expression_statement;
        let statements: Vec<&SyntaxNode> = if body.is("statement_block") {
            collapse_try(body.children())
        } else {
            // `it('x', () => run())`
            expression_statement =
                SyntaxNode::new("expression_statement", body.span(), vec![body.clone()]);
            vec![&expression_statement]
        };

        let mut describe_chain = chain.to_vec();
        describe_chain.push(description);
        state.case_count += 1;

        let case = CaseContext {
            config: self.config,
            describe_chain: &describe_chain,
            test_path: state.test_path,
        };
        let mut table = LookupTable::new();
        for matcher in &self.matchers {
            matcher.collect(&statements, &case, &mut table);
        }
        state.table.merge(table);
    }

    /// Group description; placeholder names defer to the file's first constant
    fn group_description(&self, arg: &SyntaxNode, constant: Option<&str>) -> Option<String> {
        let description = literal_text(arg).or_else(|| arg.identifier_name().map(str::to_string))?;
        match constant {
            Some(constant) if self.constant_pattern.is_match(&description) => {
                Some(constant.to_string())
            }
            _ => Some(description),
        }
    }
}

/// Text of a string literal, or the concatenated fragments of a template
fn literal_text(node: &SyntaxNode) -> Option<String> {
    node.string_value()
        .or_else(|| node.template_fragments().map(|fragments| fragments.concat()))
}

/// Replace each `try { ... }` with the statements of its block
fn collapse_try(statements: &[SyntaxNode]) -> Vec<&SyntaxNode> {
    statements
        .iter()
        .flat_map(|statement| {
            match statement
                .child_by_field("body")
                .filter(|_| statement.is("try_statement"))
            {
                Some(block) => block.children().iter().collect::<Vec<_>>(),
                None => vec![statement],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestAssociation;
    use drift_syntax::parse_source;
    use pretty_assertions::assert_eq;

    fn index(code: &str) -> TestFileIndex {
        let config = DriftConfig::default();
        let tree = parse_source(code).unwrap();
        TestChainExtractor::new(&config)
            .unwrap()
            .extract(&tree, "test/sample.test.js")
    }

    fn chain(parts: &[&str]) -> TestAssociation {
        TestAssociation::new(
            parts.iter().map(|p| p.to_string()).collect(),
            "test/sample.test.js",
        )
    }

    #[test]
    fn single_group_single_case_direct_call() {
        let result = index("describe('foo', () => {\n  it('works', () => {\n    bar();\n  });\n});\n");

        assert_eq!(result.table.flat("bar"), Some(&[chain(&["foo", "works"])][..]));
        assert_eq!(result.case_count, 1);
    }

    #[test]
    fn nested_groups_extend_the_chain() {
        let code = "\
describe('files', () => {
  before(async () => { await setup(); });
  describe('upload', () => {
    it('uploads a file', async () => {
      await uploadFile(bucket);
    });
    it(`lists files`, async () => {
      await listFiles(bucket);
    });
  });
});
";
        let result = index(code);

        assert_eq!(
            result.table.flat("uploadfile"),
            Some(&[chain(&["files", "upload", "uploads a file"])][..])
        );
        assert_eq!(
            result.table.flat("listfiles"),
            Some(&[chain(&["files", "upload", "lists files"])][..])
        );
        assert!(result.table.get("setup").is_none());
        assert_eq!(result.case_count, 2);
        assert_eq!(result.file_wide_invocation, None);
    }

    #[test]
    fn top_level_cases_without_groups() {
        let result = index("it('runs', () => {\n  run();\n});\nit('stops', () => stop());\n");

        assert_eq!(result.table.flat("run"), Some(&[chain(&["runs"])][..]));
        assert_eq!(result.table.flat("stop"), Some(&[chain(&["stops"])][..]));
    }

    #[test]
    fn try_blocks_are_collapsed() {
        let code = "\
describe('g', () => {
  it('c', async () => {
    try {
      await first();
      await second();
    } catch (err) {
      handle(err);
    }
  });
});
";
        let result = index(code);
        assert!(result.table.flat("first").is_some());
        assert!(result.table.flat("second").is_some());
        assert!(result.table.get("handle").is_none());
    }

    #[test]
    fn placeholder_group_name_uses_top_level_constant() {
        let code = "\
const REGION_TAG = 'translate_detect_language';
describe(REGION_TAG, () => {
  it('detects', () => {
    detectLanguage();
  });
});
";
        let result = index(code);
        assert_eq!(
            result.table.flat("detectlanguage"),
            Some(&[chain(&["translate_detect_language", "detects"])][..])
        );
    }

    #[test]
    fn single_case_file_records_invoked_script() {
        let code = "\
const cmd = 'node quickstart.js';
describe('quickstart', () => {
  it('should run', () => {
    const output = execSync(cmd);
  });
});
";
        let result = index(code);
        assert!(result.is_single_case());
        assert_eq!(result.file_wide_invocation.as_deref(), Some("quickstart"));
    }

    #[test]
    fn every_matcher_contributes_to_one_case() {
        let code = "\
describe('app', () => {
  it('serves', async () => {
    await request(app).get('/hello').expect(200);
    const res = await fetch(`${BASE}/helloHttp`);
    const out = execSync(`${cmd} list`);
  });
});
";
        let result = index(code);
        let keys: Vec<&str> = result.table.keys().collect();
        // the direct-call matcher sees the outermost `.expect(...)` link
        assert_eq!(keys, vec!["/hello", "hellohttp", "expect", "list"]);
    }
}
