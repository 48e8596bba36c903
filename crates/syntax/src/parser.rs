use crate::error::{Result, SyntaxError};
use crate::language::Language;
use crate::tree::{Comment, LineSpan, SyntaxNode, SyntaxTree};
use tree_sitter::{Node, Parser};

/// Tree-sitter backed parser producing owned [`SyntaxTree`]s
pub struct JsParser {
    parser: Parser,
}

impl JsParser {
    /// Create a parser for JavaScript sources
    pub fn new() -> Result<Self> {
        Self::for_language(Language::JavaScript)
    }

    /// Create a parser for a language with AST support
    pub fn for_language(language: Language) -> Result<Self> {
        if !language.supports_ast() {
            return Err(SyntaxError::unsupported_language(language.as_str()));
        }

        let ts_language = language.tree_sitter_language()?;
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| SyntaxError::tree_sitter(format!("Failed to set language: {e}")))?;

        Ok(Self { parser })
    }

    /// Parse program text into a location-annotated tree plus its comments
    pub fn parse(&mut self, content: &str) -> Result<SyntaxTree> {
        let tree = self
            .parser
            .parse(content, None)
            .ok_or_else(|| SyntaxError::parse("Failed to parse source code"))?;

        let root_node = tree.root_node();
        if root_node.has_error() {
            log::debug!("Source contains syntax errors; keeping partial tree");
        }

        let mut comments = Vec::new();
        let root = convert(root_node, None, content.as_bytes(), &mut comments);

        Ok(SyntaxTree { root, comments })
    }
}

/// Parse JavaScript program text with a fresh parser
pub fn parse_source(content: &str) -> Result<SyntaxTree> {
    JsParser::new()?.parse(content)
}

fn span_of(node: Node) -> LineSpan {
    LineSpan::new(node.start_position().row + 1, node.end_position().row + 1)
}

fn convert(
    node: Node,
    field: Option<&str>,
    source: &[u8],
    comments: &mut Vec<Comment>,
) -> SyntaxNode {
    let span = span_of(node);
    let mut children = Vec::new();

    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            if child.kind() == "comment" {
                let child_span = span_of(child);
                comments.push(Comment {
                    text: child.utf8_text(source).unwrap_or_default().to_string(),
                    line: child_span.start_line,
                    end_line: child_span.end_line,
                });
            } else if child.is_named() {
                children.push(convert(child, cursor.field_name(), source, comments));
            }

            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    let converted = if children.is_empty() {
        SyntaxNode::leaf(node.kind(), node.utf8_text(source).unwrap_or_default(), span)
    } else {
        SyntaxNode::new(node.kind(), span, children)
    };

    match field {
        Some(field) => converted.with_field(field),
        None => converted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_language() {
        assert!(JsParser::for_language(Language::Python).is_err());
    }

    #[test]
    fn lifts_comments_out_of_the_tree() {
        let tree = parse_source("// [START foo]\nfunction foo() {}\n// [END foo]\n").unwrap();

        assert_eq!(tree.comments.len(), 2);
        assert_eq!(tree.comments[0].line, 1);
        assert_eq!(tree.comments[1].line, 3);
        assert!(tree.comments[0].text.contains("[START foo]"));
        assert_eq!(tree.statements().len(), 1);
        assert!(tree.statements()[0].is("function_declaration"));
    }

    #[test]
    fn records_field_names_and_lines() {
        let tree = parse_source("const x = 1;\n\nfunction bar(a) {\n  return a;\n}\n").unwrap();
        let decl = &tree.statements()[1];

        assert_eq!(decl.start_line(), 3);
        assert_eq!(decl.end_line(), 5);
        assert_eq!(
            decl.child_by_field("name").and_then(|n| n.identifier_name()),
            Some("bar")
        );
        assert!(decl.child_by_field("body").is_some());
    }
}
