//! Parser for query source.
//!
//! Produces a lossless concrete syntax tree (CST) via Rowan's green tree builder:
//!
//! - Zero-copy lexing: tokens carry spans, text is sliced only when building tree nodes
//! - Trivia buffering: whitespace and comments are attached as leading trivia
//! - Checkpoint-based wrapping: quantifiers and captures wrap the pattern before them
//!
//! The parser always produces a tree. Unknown tokens are wrapped in
//! `SyntaxKind::Error` nodes and every problem is collected as a [`QueryError`],
//! so the compiler can report the first one while tooling can show them all.

pub mod ast;
pub mod cst;
pub mod lexer;

mod core;
mod grammar;

#[cfg(test)]
mod lexer_tests;

use std::fmt::Write;

use rowan::NodeOrToken;

pub use cst::{SyntaxKind, SyntaxNode, SyntaxToken};

use crate::error::QueryError;
use core::Parser;

/// Parse result: the green tree plus everything that went wrong building it.
#[derive(Debug, Clone)]
pub struct Parse {
    cst: rowan::GreenNode,
    errors: Vec<QueryError>,
}

impl Parse {
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.cst.clone())
    }

    pub fn root(&self) -> ast::Root {
        ast::Root::cast(self.syntax())
            .unwrap_or_else(|| panic!("query parser always produces a Root node"))
    }

    pub fn errors(&self) -> &[QueryError] {
        &self.errors
    }

    /// Indented rendering of the CST, one node or token per line.
    pub fn dump_cst(&self, trivia: bool) -> String {
        let mut out = String::new();
        format_cst(&self.syntax(), 0, trivia, &mut out)
            .unwrap_or_else(|_| panic!("writing to a String never fails"));
        out
    }
}

pub fn parse(source: &str) -> Parse {
    let mut parser = Parser::new(source, lexer::lex(source));
    parser.parse_root();
    let (cst, errors) = parser.finish();
    Parse { cst, errors }
}

fn format_cst(node: &SyntaxNode, indent: usize, trivia: bool, w: &mut impl Write) -> std::fmt::Result {
    writeln!(w, "{}{:?}", "  ".repeat(indent), node.kind())?;

    for child in node.children_with_tokens() {
        match child {
            NodeOrToken::Node(n) => format_cst(&n, indent + 1, trivia, w)?,
            NodeOrToken::Token(t) if trivia || !t.kind().is_trivia() => {
                writeln!(w, "{}{:?} {:?}", "  ".repeat(indent + 1), t.kind(), t.text())?;
            }
            NodeOrToken::Token(_) => {}
        }
    }
    Ok(())
}
