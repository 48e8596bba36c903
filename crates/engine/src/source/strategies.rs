use super::{Candidate, ExtractContext, SourceStrategy};
use crate::types::{Diagnostic, Extraction, SnippetMethod};
use drift_syntax::SyntaxNode;

/// A named declaration found at statement level
struct Declared<'t> {
    name: &'t str,
    /// Node the method spans: the function declaration or the variable declarator
    node: &'t SyntaxNode,
    /// Initializer of a variable declarator
    init: Option<&'t SyntaxNode>,
}

impl Declared<'_> {
    /// Function declarations and variables bound to anonymous functions
    fn is_function(&self) -> bool {
        match self.init {
            Some(init) => is_anonymous_function(init),
            None => !self.node.is("variable_declarator"),
        }
    }
}

fn declared(statement: &SyntaxNode) -> Option<Declared<'_>> {
    let statement = if statement.is("export_statement") {
        statement.child_by_field("declaration")?
    } else {
        statement
    };

    match statement.kind() {
        "function_declaration" | "generator_function_declaration" => Some(Declared {
            name: statement.child_by_field("name")?.identifier_name()?,
            node: statement,
            init: None,
        }),
        "lexical_declaration" | "variable_declaration" => {
            let declarator = statement.first_declarator()?;
            Some(Declared {
                name: declarator.child_by_field("name")?.identifier_name()?,
                node: declarator,
                init: declarator.child_by_field("value"),
            })
        }
        _ => None,
    }
}

fn is_anonymous_function(node: &SyntaxNode) -> bool {
    matches!(
        node.kind(),
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

fn method_from<'t>(
    node: &'t SyntaxNode,
    name: &str,
    ctx: &ExtractContext<'_>,
    extraction: Extraction,
) -> Candidate<'t> {
    Candidate {
        node,
        method: SnippetMethod::new(
            ctx.path,
            name,
            node.start_line(),
            node.end_line(),
            extraction,
        ),
    }
}

/// `<app>.<verb>('<path>', handler)` route registrations
pub struct RouteHandlerStrategy;

impl SourceStrategy for RouteHandlerStrategy {
    fn name(&self) -> &'static str {
        "routeHandler"
    }

    fn extract<'t>(
        &self,
        statements: &'t [SyntaxNode],
        ctx: &mut ExtractContext<'_>,
    ) -> Vec<Candidate<'t>> {
        let mut candidates = Vec::new();

        for statement in statements {
            let Some(call) = statement.statement_expression() else {
                continue;
            };
            let Some(callee) = call.callee() else {
                continue;
            };
            if !callee.is("member_expression") {
                continue;
            }

            let is_two_part = callee
                .child_by_field("object")
                .is_some_and(|o| o.identifier_name().is_some());
            let verb = callee
                .child_by_field("property")
                .and_then(SyntaxNode::identifier_name);
            let (true, Some(verb)) = (is_two_part, verb) else {
                continue;
            };
            if !ctx.config.is_http_method(verb) {
                continue;
            }

            let Some(url_path) = call
                .call_arguments()
                .first()
                .and_then(|arg| arg.string_value())
            else {
                continue;
            };

            let name = format!("{} {}", verb.to_uppercase(), url_path);
            candidates.push(method_from(
                call,
                &name,
                ctx,
                Extraction::RouteHandler {
                    http_method: verb.to_string(),
                    url_path,
                },
            ));
        }

        candidates
    }
}

/// `exports.<name> = ...` handler assignments
pub struct ExportedHandlerStrategy;

impl ExportedHandlerStrategy {
    fn is_exports_object(object: &SyntaxNode, exports: &str) -> bool {
        if object.identifier_name() == Some(exports) {
            return true;
        }
        // module.exports.<name>
        object.is("member_expression")
            && object
                .child_by_field("property")
                .and_then(SyntaxNode::identifier_name)
                == Some(exports)
    }
}

impl SourceStrategy for ExportedHandlerStrategy {
    fn name(&self) -> &'static str {
        "exportedHandler"
    }

    fn extract<'t>(
        &self,
        statements: &'t [SyntaxNode],
        ctx: &mut ExtractContext<'_>,
    ) -> Vec<Candidate<'t>> {
        let exports = ctx.config.exports_identifier.as_str();
        let mut candidates = Vec::new();

        for statement in statements {
            let Some(assignment) = statement.statement_expression() else {
                continue;
            };
            if !assignment.is("assignment_expression") {
                continue;
            }
            let Some(left) = assignment.child_by_field("left") else {
                continue;
            };
            if !left.is("member_expression") {
                continue;
            }

            let exported = left
                .child_by_field("object")
                .is_some_and(|o| Self::is_exports_object(o, exports));
            let property = left
                .child_by_field("property")
                .and_then(SyntaxNode::identifier_name);
            let (true, Some(function_name)) = (exported, property) else {
                continue;
            };

            candidates.push(method_from(
                assignment,
                function_name,
                ctx,
                Extraction::ExportedHandler {
                    function_name: function_name.to_string(),
                },
            ));
        }

        candidates
    }
}

/// Top-level functions and variables bound to anonymous functions
pub struct DirectDeclarationStrategy;

impl DirectDeclarationStrategy {
    pub(crate) fn declarations<'t>(
        statements: &'t [SyntaxNode],
        ctx: &ExtractContext<'_>,
        extraction: Extraction,
    ) -> Vec<Candidate<'t>> {
        statements
            .iter()
            .filter_map(declared)
            .filter(|d| d.name != ctx.config.entry_point_name)
            .filter(|d| d.is_function())
            .map(|d| method_from(d.node, d.name, ctx, extraction.clone()))
            .collect()
    }
}

impl SourceStrategy for DirectDeclarationStrategy {
    fn name(&self) -> &'static str {
        "directDeclaration"
    }

    fn extract<'t>(
        &self,
        statements: &'t [SyntaxNode],
        ctx: &mut ExtractContext<'_>,
    ) -> Vec<Candidate<'t>> {
        Self::declarations(statements, ctx, Extraction::DirectDeclaration)
    }
}

/// Unwraps samples that put everything inside an entry-point function
pub struct WrappedEntryPointStrategy;

impl WrappedEntryPointStrategy {
    fn entry_body<'t>(entry: &Declared<'t>) -> Option<&'t SyntaxNode> {
        let function = match entry.init {
            Some(init) if is_anonymous_function(init) => init,
            Some(_) => return None,
            None => entry.node,
        };
        function
            .child_by_field("body")
            .filter(|body| body.is("statement_block"))
    }
}

impl SourceStrategy for WrappedEntryPointStrategy {
    fn name(&self) -> &'static str {
        "wrappedEntryPoint"
    }

    fn extract<'t>(
        &self,
        statements: &'t [SyntaxNode],
        ctx: &mut ExtractContext<'_>,
    ) -> Vec<Candidate<'t>> {
        let mut candidates = Vec::new();

        for entry in statements.iter().filter_map(declared) {
            if entry.name != ctx.config.entry_point_name || !entry.is_function() {
                continue;
            }

            let inner: Vec<&SyntaxNode> = Self::entry_body(&entry)
                .map(|body| {
                    body.children()
                        .iter()
                        .filter(|s| s.child_by_field("name").is_some())
                        .filter(|s| {
                            matches!(
                                s.kind(),
                                "function_declaration"
                                    | "generator_function_declaration"
                                    | "class_declaration"
                            )
                        })
                        .collect()
                })
                .unwrap_or_default();

            match inner.as_slice() {
                [] => candidates.push(method_from(
                    entry.node,
                    entry.name,
                    ctx,
                    Extraction::WrappedEntryPoint,
                )),
                [only] => {
                    let only = *only;
                    let name = only
                        .child_by_field("name")
                        .and_then(SyntaxNode::identifier_name)
                        .unwrap_or(entry.name);
                    candidates.push(method_from(only, name, ctx, Extraction::WrappedEntryPoint));
                }
                many => {
                    log::warn!(
                        "{}:{}: entry point `{}` wraps {} named declarations; skipping",
                        ctx.path,
                        entry.node.start_line(),
                        entry.name,
                        many.len()
                    );
                    ctx.diagnostics.push(Diagnostic::AmbiguousEntryPoint {
                        path: ctx.path.to_string(),
                        line: entry.node.start_line(),
                        candidates: many.len(),
                    });
                }
            }
        }

        candidates
    }
}

/// Re-applies direct-declaration extraction inside the first top-level function
pub struct WrappedDirectDeclarationStrategy;

impl SourceStrategy for WrappedDirectDeclarationStrategy {
    fn name(&self) -> &'static str {
        "wrappedDirectDeclaration"
    }

    fn extract<'t>(
        &self,
        statements: &'t [SyntaxNode],
        ctx: &mut ExtractContext<'_>,
    ) -> Vec<Candidate<'t>> {
        let body = statements
            .iter()
            .find(|s| s.is("function_declaration"))
            .and_then(|f| f.child_by_field("body"));

        match body {
            Some(body) => DirectDeclarationStrategy::declarations(
                body.children(),
                ctx,
                Extraction::WrappedDirectDeclaration,
            ),
            None => Vec::new(),
        }
    }
}
