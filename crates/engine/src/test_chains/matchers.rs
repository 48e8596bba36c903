use crate::config::DriftConfig;
use crate::lookup::LookupTable;
use crate::types::TestAssociation;
use drift_syntax::SyntaxNode;

/// The test case a matcher is looking at
pub struct CaseContext<'a> {
    pub config: &'a DriftConfig,
    pub describe_chain: &'a [String],
    pub test_path: &'a str,
}

impl CaseContext<'_> {
    pub fn association(&self) -> TestAssociation {
        TestAssociation::new(self.describe_chain.to_vec(), self.test_path)
    }
}

/// One way of recognizing what a test case invokes
pub trait TestMatcher {
    fn name(&self) -> &'static str;

    /// Record the case under every key found in its statements
    fn collect(&self, statements: &[&SyntaxNode], case: &CaseContext<'_>, table: &mut LookupTable);
}

/// Matchers in the order they run over each test case
pub fn default_matchers() -> Vec<Box<dyn TestMatcher>> {
    vec![
        Box::new(HttpClientMatcher),
        Box::new(HandlerInvocationMatcher),
        Box::new(DirectCallMatcher),
        Box::new(RegionTagConstantMatcher(ShellCommandMatcher)),
    ]
}

/// Initializer of a statement's first declarator
fn declared_value(statement: &SyntaxNode) -> Option<&SyntaxNode> {
    statement.first_declarator()?.child_by_field("value")
}

/// `await request(app).get('/route').expect(200)`
pub struct HttpClientMatcher;

impl TestMatcher for HttpClientMatcher {
    fn name(&self) -> &'static str {
        "httpClient"
    }

    fn collect(&self, statements: &[&SyntaxNode], case: &CaseContext<'_>, table: &mut LookupTable) {
        for statement in statements {
            let Some(expression) = statement.statement_expression() else {
                continue;
            };

            // walk outward-in: each receiver that is itself `<x>.<verb>(<route>)`
            let mut link = expression.unwrap_await().callee();
            while let Some(member) = link.filter(|l| l.is("member_expression")) {
                let Some(receiver) = member
                    .child_by_field("object")
                    .filter(|o| o.is("call_expression"))
                else {
                    break;
                };

                let verb = receiver
                    .callee()
                    .filter(|c| c.is("member_expression"))
                    .and_then(|c| c.child_by_field("property"))
                    .and_then(SyntaxNode::identifier_name)
                    .map(str::to_lowercase);
                let Some(route) = receiver
                    .call_arguments()
                    .first()
                    .and_then(|arg| arg.string_value())
                    .filter(|route| !route.is_empty())
                else {
                    break;
                };

                if let Some(verb) = verb.filter(|v| case.config.is_http_method(v)) {
                    table.push_route(&route, &verb, case.association());
                }

                link = receiver.callee();
            }
        }
    }
}

/// ``const res = await fetch(`${BASE}/helloHttp?name=x`)``
///
/// Keys by the URL path with the query string and surrounding slashes removed.
pub struct HandlerInvocationMatcher;

impl HandlerInvocationMatcher {
    fn normalize(url: &str) -> String {
        let path = url.split('?').next().unwrap_or_default();
        let path = path.strip_prefix('/').unwrap_or(path);
        let path = path.strip_suffix('/').unwrap_or(path);
        path.to_lowercase()
    }
}

impl TestMatcher for HandlerInvocationMatcher {
    fn name(&self) -> &'static str {
        "handlerInvocation"
    }

    fn collect(&self, statements: &[&SyntaxNode], case: &CaseContext<'_>, table: &mut LookupTable) {
        for statement in statements {
            let Some(awaited) = declared_value(statement).filter(|v| v.is("await_expression"))
            else {
                continue;
            };
            let call = awaited.unwrap_await();
            let Some(fragments) = call
                .call_arguments()
                .first()
                .and_then(|arg| arg.literal_fragments())
            else {
                continue;
            };

            for fragment in fragments.iter().filter(|f| !f.is_empty()) {
                table.push(&Self::normalize(fragment), case.association());
            }
        }
    }
}

/// `await listFiles()` / `sample.listFiles()`, keyed by the callee name
pub struct DirectCallMatcher;

impl TestMatcher for DirectCallMatcher {
    fn name(&self) -> &'static str {
        "directCall"
    }

    fn collect(&self, statements: &[&SyntaxNode], case: &CaseContext<'_>, table: &mut LookupTable) {
        for statement in statements {
            let Some(name) = statement
                .statement_expression()
                .map(SyntaxNode::unwrap_await)
                .and_then(SyntaxNode::callee_name)
            else {
                continue;
            };
            table.push(name, case.association());
        }
    }
}

/// ``execSync(`${cmd} list ${bucket}`)``, keyed by the first command token
pub struct ShellCommandMatcher;

impl ShellCommandMatcher {
    /// Command argument of an exec call or of a call assigned to a variable
    fn command_argument<'n>(
        statement: &'n SyntaxNode,
        config: &DriftConfig,
    ) -> Option<&'n SyntaxNode> {
        if let Some(value) = declared_value(statement) {
            let call = value.unwrap_await();
            let callee = call.callee_name()?;
            if !config.exec_functions.iter().any(|f| f == callee) {
                return None;
            }
            return call.call_arguments().first().copied();
        }

        let assignment = statement
            .statement_expression()
            .filter(|e| e.is("assignment_expression"))?;
        let call = assignment.child_by_field("right")?.unwrap_await();
        if !call.is("call_expression") {
            return None;
        }
        call.call_arguments().first().copied()
    }

    /// `node quickstart.js list` → `quickstart`, ` list ` → `list`
    pub(crate) fn command_token(fragment: &str, config: &DriftConfig) -> Option<String> {
        let merged = fragment.replacen('/', " ", 1);
        let trimmed = merged.trim();
        let without_runner = trimmed
            .strip_prefix(config.runner_prefix.as_str())
            .filter(|rest| rest.starts_with(char::is_whitespace))
            .map(str::trim_start)
            .unwrap_or(trimmed);
        let without_suffix = without_runner.replace(&config.source_suffix(), "");

        let token = without_suffix.split(' ').next()?;
        if token.is_empty() {
            return None;
        }
        Some(token.to_lowercase())
    }
}

impl TestMatcher for ShellCommandMatcher {
    fn name(&self) -> &'static str {
        "shellCommand"
    }

    fn collect(&self, statements: &[&SyntaxNode], case: &CaseContext<'_>, table: &mut LookupTable) {
        for statement in statements {
            let Some(fragments) = Self::command_argument(statement, case.config)
                .and_then(SyntaxNode::literal_fragments)
            else {
                continue;
            };

            let token = fragments
                .iter()
                .filter(|f| !f.is_empty())
                .find_map(|f| Self::command_token(f, case.config));
            if let Some(token) = token {
                table.push(&token, case.association());
            }
        }
    }
}

/// Shell-command matching for files that keep their region tag in a
/// top-level constant.
///
/// Delegates to [`ShellCommandMatcher`] unchanged; the constant only feeds
/// group descriptions.
pub struct RegionTagConstantMatcher(pub ShellCommandMatcher);

impl TestMatcher for RegionTagConstantMatcher {
    fn name(&self) -> &'static str {
        "regionTagConstant"
    }

    fn collect(&self, statements: &[&SyntaxNode], case: &CaseContext<'_>, table: &mut LookupTable) {
        self.0.collect(statements, case, table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_syntax::parse_source;
    use pretty_assertions::assert_eq;

    fn run(matcher: &dyn TestMatcher, code: &str) -> LookupTable {
        let config = DriftConfig::default();
        let tree = parse_source(code).unwrap();
        let statements: Vec<&SyntaxNode> = tree.statements().iter().collect();
        let chain = vec!["group".to_string(), "case".to_string()];
        let case = CaseContext {
            config: &config,
            describe_chain: &chain,
            test_path: "test/sample.test.js",
        };
        let mut table = LookupTable::new();
        matcher.collect(&statements, &case, &mut table);
        table
    }

    fn keys(table: &LookupTable) -> Vec<&str> {
        table.keys().collect()
    }

    #[test]
    fn http_client_nests_route_and_verb() {
        let table = run(
            &HttpClientMatcher,
            "await request(app).get('/Hello').expect(200);\nawait supertest(app).post('/submit').expect(201);\n",
        );

        assert_eq!(keys(&table), vec!["/hello", "/submit"]);
        assert_eq!(table.get("/hello").unwrap().for_verb("get").len(), 1);
        assert_eq!(table.get("/submit").unwrap().for_verb("post").len(), 1);
    }

    #[test]
    fn http_client_stops_at_non_route_link() {
        // `.send({})` has no string route, so the chain is abandoned there
        let table = run(
            &HttpClientMatcher,
            "await request(app).post('/submit').send({}).expect(201);\n",
        );
        assert!(table.is_empty());
    }

    #[test]
    fn http_client_ignores_unknown_verbs() {
        let table = run(&HttpClientMatcher, "await request(app).head('/x').expect(200);\n");
        assert!(table.is_empty());
    }

    #[test]
    fn handler_invocation_strips_query_and_slashes() {
        let table = run(
            &HandlerInvocationMatcher,
            "const res = await fetch(`${BASE_URL}/helloHttp/?name=John`);\nconst other = await fetch('/helloGet');\nconst sync = fetch('/notAwaited');\n",
        );
        assert_eq!(keys(&table), vec!["hellohttp", "helloget"]);
    }

    #[test]
    fn direct_call_keys_by_callee_name() {
        let table = run(
            &DirectCallMatcher,
            "await listFiles(bucket);\nsample.uploadFile();\nconst x = ignored();\n",
        );
        assert_eq!(keys(&table), vec!["listfiles", "uploadfile"]);
    }

    #[test]
    fn shell_command_keys_by_first_token() {
        let table = run(
            &ShellCommandMatcher,
            "\
const out = execSync(`${cmd} list ${bucket}`);
const quick = cp.execSync('node quickstart.js');
output = await exec(`node analyze.js sentiment-text \"hi\"`);
const skipped = spawn('node other.js');
",
        );
        assert_eq!(keys(&table), vec!["list", "quickstart", "analyze"]);
    }

    #[test]
    fn command_token_normalization() {
        let config = DriftConfig::default();
        assert_eq!(
            ShellCommandMatcher::command_token(" node files.js upload ", &config).as_deref(),
            Some("files")
        );
        assert_eq!(
            ShellCommandMatcher::command_token("/Upload x", &config).as_deref(),
            Some("upload")
        );
        assert_eq!(ShellCommandMatcher::command_token("   ", &config), None);
        assert_eq!(
            ShellCommandMatcher::command_token("nodejs run", &config).as_deref(),
            Some("nodejs")
        );
    }

    #[test]
    fn region_tag_constant_matcher_passes_through() {
        let code = "const out = execSync(`${cmd} detect`);\n";
        let plain = run(&ShellCommandMatcher, code);
        let wrapped = run(&RegionTagConstantMatcher(ShellCommandMatcher), code);
        assert_eq!(keys(&plain), keys(&wrapped));
        assert_eq!(plain.flat("detect"), wrapped.flat("detect"));
    }
}
