use serde::{Deserialize, Serialize};

/// Inclusive, 1-indexed line range of a node or comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineSpan {
    pub start_line: usize,
    pub end_line: usize,
}

impl LineSpan {
    #[must_use]
    pub const fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
        }
    }

    /// True when `other` lies wholly inside this span (bounds inclusive)
    #[must_use]
    pub const fn encloses(&self, other: &LineSpan) -> bool {
        self.start_line <= other.start_line && other.end_line <= self.end_line
    }
}

/// A comment token captured from program text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Raw comment text, including the comment delimiters
    pub text: String,

    /// Line the comment starts on
    pub line: usize,

    /// Line the comment ends on (differs from `line` for block comments)
    pub end_line: usize,
}

/// Owned syntax node.
///
/// Only named children are kept. Comments are lifted out of the node tree
/// into [`SyntaxTree::comments`], so two declarations that differ only in
/// their comments compare equal under [`SyntaxNode::structurally_eq`].
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    kind: String,
    field: Option<String>,
    text: Option<String>,
    span: LineSpan,
    children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    /// Create an inner node
    pub fn new(kind: impl Into<String>, span: LineSpan, children: Vec<SyntaxNode>) -> Self {
        Self {
            kind: kind.into(),
            field: None,
            text: None,
            span,
            children,
        }
    }

    /// Create a leaf node carrying its source text
    pub fn leaf(kind: impl Into<String>, text: impl Into<String>, span: LineSpan) -> Self {
        Self {
            kind: kind.into(),
            field: None,
            text: Some(text.into()),
            span,
            children: Vec::new(),
        }
    }

    /// Builder: set the field name this node occupies in its parent
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Source text, present for leaf nodes only
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub const fn span(&self) -> LineSpan {
        self.span
    }

    pub const fn start_line(&self) -> usize {
        self.span.start_line
    }

    pub const fn end_line(&self) -> usize {
        self.span.end_line
    }

    pub fn children(&self) -> &[SyntaxNode] {
        &self.children
    }

    pub fn first_child(&self) -> Option<&SyntaxNode> {
        self.children.first()
    }

    /// First child stored under the given field name
    pub fn child_by_field(&self, field: &str) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.field() == Some(field))
    }

    /// Pre-order walk over this node and all its descendants
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a SyntaxNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Deep equality of shape and text, ignoring source locations
    pub fn structurally_eq(&self, other: &SyntaxNode) -> bool {
        self.kind == other.kind
            && self.field == other.field
            && self.text == other.text
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.structurally_eq(b))
    }

    /// Name carried by an identifier-like leaf
    pub fn identifier_name(&self) -> Option<&str> {
        match self.kind.as_str() {
            "identifier"
            | "property_identifier"
            | "shorthand_property_identifier"
            | "private_property_identifier" => self.text(),
            _ => None,
        }
    }

    /// Contents of a plain string literal (`""` for an empty literal)
    pub fn string_value(&self) -> Option<String> {
        if !self.is("string") {
            return None;
        }
        let value = self
            .children
            .iter()
            .filter(|c| c.is("string_fragment") || c.is("escape_sequence"))
            .filter_map(SyntaxNode::text)
            .collect::<String>();
        Some(value)
    }

    /// Non-empty literal fragments of a template string, in source order
    pub fn template_fragments(&self) -> Option<Vec<String>> {
        if !self.is("template_string") {
            return None;
        }
        let fragments = self
            .children
            .iter()
            .filter(|c| c.is("string_fragment"))
            .filter_map(SyntaxNode::text)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        Some(fragments)
    }

    /// Literal text pieces of a string or template string
    pub fn literal_fragments(&self) -> Option<Vec<String>> {
        self.string_value()
            .map(|value| vec![value])
            .or_else(|| self.template_fragments())
    }

    /// Strip `await` and parentheses wrapping an expression
    pub fn unwrap_await(&self) -> &SyntaxNode {
        match self.kind.as_str() {
            "await_expression" | "parenthesized_expression" => self
                .first_child()
                .map(SyntaxNode::unwrap_await)
                .unwrap_or(self),
            _ => self,
        }
    }

    /// Callee of a call expression
    pub fn callee(&self) -> Option<&SyntaxNode> {
        if !self.is("call_expression") {
            return None;
        }
        self.child_by_field("function")
    }

    /// Arguments of a call expression (a tagged template counts as one argument)
    pub fn call_arguments(&self) -> Vec<&SyntaxNode> {
        match self.child_by_field("arguments") {
            Some(args) if args.is("arguments") => args.children.iter().collect(),
            Some(template) => vec![template],
            None => Vec::new(),
        }
    }

    /// Bare callee name, or the trailing property of a member-access callee
    pub fn callee_name(&self) -> Option<&str> {
        let callee = self.callee()?;
        match callee.kind() {
            "member_expression" => callee.child_by_field("property")?.identifier_name(),
            _ => callee.identifier_name(),
        }
    }

    /// First declarator of a `const`/`let`/`var` declaration
    pub fn first_declarator(&self) -> Option<&SyntaxNode> {
        if !(self.is("lexical_declaration") || self.is("variable_declaration")) {
            return None;
        }
        self.children.iter().find(|c| c.is("variable_declarator"))
    }

    /// Expression carried by an expression statement
    pub fn statement_expression(&self) -> Option<&SyntaxNode> {
        if !self.is("expression_statement") {
            return None;
        }
        self.first_child()
    }
}

/// Parsed program: top-level node plus the comment stream
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub root: SyntaxNode,
    pub comments: Vec<Comment>,
}

impl SyntaxTree {
    /// Top-level statements of the program
    pub fn statements(&self) -> &[SyntaxNode] {
        self.root.children()
    }
}
