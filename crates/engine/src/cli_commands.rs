//! Command-builder chain extraction.
//!
//! Samples that expose a CLI end with a chain such as
//! `require('yargs').command('list <dir>', '...', {}, opts => listFiles(opts.dir)).help().argv`.
//! Walking that chain backwards yields `handler name → invocation name` pairs.

use drift_syntax::{SyntaxNode, SyntaxTree};
use std::collections::BTreeMap;

const COMMAND_LINK: &str = "command";

/// Map each bound handler function name to its CLI invocation name
pub fn extract(tree: &SyntaxTree) -> BTreeMap<String, String> {
    let mut commands = BTreeMap::new();

    let Some(mut link) = last_chain_expression(tree) else {
        return commands;
    };

    if link.is("member_expression") {
        match link.child_by_field("object") {
            Some(object) => link = object,
            None => return commands,
        }
    }

    // skip trailing non-command links (`.example(...)`, `.help()`, ...)
    while let Some(name) = link_name(link) {
        if name == COMMAND_LINK {
            break;
        }
        match link_receiver(link) {
            Some(receiver) => link = receiver,
            None => return commands,
        }
    }

    // command links are assumed to be contiguous
    while link_name(link) == Some(COMMAND_LINK) {
        let args = link.call_arguments();
        let invocation = args.first().and_then(|a| invocation_name(a));
        let handler = args.last().and_then(|a| handler_name(a));

        if let (Some(invocation), Some(handler)) = (invocation, handler) {
            commands.insert(handler.to_string(), invocation);
        }

        match link_receiver(link) {
            Some(receiver) => link = receiver,
            None => break,
        }
    }

    commands
}

fn last_chain_expression(tree: &SyntaxTree) -> Option<&SyntaxNode> {
    let statement = tree.statements().iter().rev().find(|s| {
        s.is("expression_statement") || s.is("lexical_declaration") || s.is("variable_declaration")
    })?;

    match statement.statement_expression() {
        Some(expression) => Some(expression),
        None => statement.first_declarator()?.child_by_field("value"),
    }
}

/// Property name of a `<receiver>.<name>(...)` call
fn link_name(link: &SyntaxNode) -> Option<&str> {
    let callee = link.callee()?;
    if !callee.is("member_expression") {
        return None;
    }
    callee.child_by_field("property")?.identifier_name()
}

fn link_receiver(link: &SyntaxNode) -> Option<&SyntaxNode> {
    link.callee()?.child_by_field("object")
}

/// `'list <dir>'` → `list`
fn invocation_name(arg: &SyntaxNode) -> Option<String> {
    let text = arg.literal_fragments()?.into_iter().next()?;
    let name = text.split_whitespace().next()?;
    Some(name.to_string())
}

/// Function the command handler forwards to
fn handler_name(arg: &SyntaxNode) -> Option<&str> {
    if let Some(name) = arg.identifier_name() {
        return Some(name);
    }

    if !(arg.is("arrow_function") || arg.is("function_expression") || arg.is("function")) {
        return None;
    }

    let body = arg.child_by_field("body")?;
    let call = if body.is("statement_block") {
        match body.children() {
            [only] => only.statement_expression()?.unwrap_await(),
            _ => return None,
        }
    } else {
        body.unwrap_await()
    };

    call.callee()?.identifier_name()
}
