use super::*;
use crate::types::Extraction;
use drift_syntax::parse_source;
use pretty_assertions::assert_eq;

fn extract(code: &str) -> ExtractedSource {
    let config = DriftConfig::default();
    let tree = parse_source(code).expect("parse failed");
    SourceMethodExtractor::new(&config).extract(&tree, "samples/sample.js")
}

fn names(extracted: &ExtractedSource) -> Vec<&str> {
    extracted.methods.iter().map(|m| m.name.as_str()).collect()
}

fn find<'a>(extracted: &'a ExtractedSource, name: &str) -> &'a SnippetMethod {
    extracted
        .methods
        .iter()
        .find(|m| m.name == name)
        .unwrap_or_else(|| panic!("method {name} not extracted: {:?}", names(extracted)))
}

#[test]
fn tag_span_sharing_method_lines_is_attached() {
    let code = "\
'use strict';
function bar() { // [START foo]
  return 1;
} // [END foo]
";
    let extracted = extract(code);
    let bar = find(&extracted, "bar");

    assert_eq!((bar.start_line, bar.end_line), (2, 4));
    assert_eq!(bar.region_tags, BTreeSet::from(["foo".to_string()]));
    assert_eq!(bar.extraction, Extraction::DirectDeclaration);
}

#[test]
fn partially_overlapping_tags_are_excluded() {
    let code = "\
// [START outer]
function a() {
  // [START inner]
  return 1;
}
// [END outer]
const b = () => {
  return 2;
};
// [END inner]
";
    let extracted = extract(code);

    assert_eq!(
        find(&extracted, "a").region_tags,
        BTreeSet::from(["outer".to_string()])
    );
    // `inner` starts inside `a` but ends after it; it only nests with `b`
    assert_eq!(
        find(&extracted, "b").region_tags,
        BTreeSet::from(["inner".to_string()])
    );
}

#[test]
fn ignored_placeholder_tags_are_dropped() {
    let code = "\
// [START app]
// [START hello]
function hello() {}
// [END hello]
// [END app]
";
    let extracted = extract(code);
    assert_eq!(
        find(&extracted, "hello").region_tags,
        BTreeSet::from(["hello".to_string()])
    );
}

#[test]
fn identical_declarations_are_deduplicated() {
    let code = "\
function twice() { return 1; }
function twice() { return 1; }
";
    let extracted = extract(code);
    assert_eq!(names(&extracted), vec!["twice"]);
    assert_eq!(extracted.methods[0].start_line, 1);
}

#[test]
fn extracts_route_handlers() {
    let code = "\
const app = express();
app.get('/hello', (req, res) => {
  res.send('hi');
});
app.use(bodyParser.json());
router.get(variablePath, handler);
";
    let extracted = extract(code);
    let routes: Vec<_> = extracted
        .methods
        .iter()
        .filter(|m| m.extraction.url_path().is_some())
        .collect();

    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].name, "GET /hello");
    assert_eq!(routes[0].extraction.http_method(), Some("get"));
    assert_eq!(routes[0].extraction.url_path(), Some("/hello"));
    assert_eq!((routes[0].start_line, routes[0].end_line), (2, 4));
}

#[test]
fn extracts_exported_handlers() {
    let code = "\
exports.helloHttp = (req, res) => {
  res.send('ok');
};
module.exports.helloEvent = event => {};
other.thing = 1;
";
    let extracted = extract(code);
    let hello = find(&extracted, "helloHttp");

    assert_eq!(hello.extraction.function_name(), Some("helloHttp"));
    assert_eq!(find(&extracted, "helloEvent").extraction.function_name(), Some("helloEvent"));
    assert!(!names(&extracted).contains(&"thing"));
}

#[test]
fn variable_declarations_need_function_initializers() {
    let code = "\
const client = new Client();
const listThings = async () => {};
let legacy = function () {};
const PORT = 8080;
";
    let extracted = extract(code);
    assert_eq!(names(&extracted), vec!["listThings", "legacy"]);
}

#[test]
fn unwraps_single_declaration_entry_point() {
    let code = "\
async function main(bucketName) {
  // [START storage_list]
  async function listFiles() {
    await storage.bucket(bucketName).getFiles();
  }
  listFiles();
  // [END storage_list]
}
main(...process.argv.slice(2));
";
    let extracted = extract(code);

    assert_eq!(names(&extracted), vec!["listFiles"]);
    let list = &extracted.methods[0];
    assert_eq!(list.extraction, Extraction::WrappedEntryPoint);
    assert_eq!(list.region_tags, BTreeSet::from(["storage_list".to_string()]));
}

#[test]
fn ambiguous_entry_point_is_dropped_with_diagnostic() {
    let code = "\
function main() {
  function first() {}
  function second() {}
}
";
    let extracted = extract(code);

    assert!(!extracted
        .methods
        .iter()
        .any(|m| m.extraction == Extraction::WrappedEntryPoint));
    assert_eq!(
        extracted.diagnostics,
        vec![Diagnostic::AmbiguousEntryPoint {
            path: "samples/sample.js".to_string(),
            line: 1,
            candidates: 2,
        }]
    );
    // the wrapped-declaration strategy still sees both inner functions
    assert_eq!(names(&extracted), vec!["first", "second"]);
}

#[test]
fn entry_point_without_inner_declarations_is_kept() {
    let extracted = extract("function main() {\n  console.log('hi');\n}\n");
    assert_eq!(names(&extracted), vec!["main"]);
    assert_eq!(extracted.methods[0].extraction, Extraction::WrappedEntryPoint);
}

#[test]
fn entry_point_bound_to_a_value_is_not_a_method() {
    let extracted = extract("const main = require('./lib');\nfunction foo() {}\n");
    assert_eq!(names(&extracted), vec!["foo"]);
    assert_eq!(extracted.methods[0].extraction, Extraction::DirectDeclaration);
}

#[test]
fn wrapped_direct_declarations_come_from_first_function() {
    let code = "\
function sample(projectId) {
  const quickstart = async () => {};
  function helper() {}
}
";
    let extracted = extract(code);

    assert_eq!(find(&extracted, "sample").extraction, Extraction::DirectDeclaration);
    assert_eq!(
        find(&extracted, "quickstart").extraction,
        Extraction::WrappedDirectDeclaration
    );
    assert_eq!(
        find(&extracted, "helper").extraction,
        Extraction::WrappedDirectDeclaration
    );
}

#[test]
fn children_are_single_hop_sibling_calls() {
    let code = "\
function leaf() {}
function middle() { leaf(); console.log('x'); }
function top() { middle(); unknown(); }
";
    let extracted = extract(code);

    assert!(find(&extracted, "leaf").children.is_empty());
    assert_eq!(
        find(&extracted, "middle").children,
        BTreeSet::from(["leaf".to_string()])
    );
    assert_eq!(
        find(&extracted, "top").children,
        BTreeSet::from(["middle".to_string()])
    );
}

#[test]
fn cli_invocations_attach_to_declarations() {
    let code = "\
async function analyzeSentiment(text) {}
exports.analyzeSentiment = analyzeSentiment;

require('yargs')
  .command('sentiment <text>', 'Detects sentiment.', {}, opts => analyzeSentiment(opts.text))
  .help().argv;
";
    let extracted = extract(code);

    let declared = extracted
        .methods
        .iter()
        .find(|m| m.extraction == Extraction::DirectDeclaration)
        .unwrap();
    assert_eq!(declared.cli_invocation.as_deref(), Some("sentiment"));

    let exported = extracted
        .methods
        .iter()
        .find(|m| m.extraction.function_name().is_some())
        .unwrap();
    assert_eq!(exported.cli_invocation, None);
}
