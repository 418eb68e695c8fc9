#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Incremental parsing runtime.
//!
//! [`Parser`] turns text into a [`Tree`] using a [`Language`]'s tables.
//! Trees are persistent: [`Tree::edit`] records a text change, and passing the
//! edited tree back to the parser reuses every subtree the change did not
//! touch. [`Node`] and [`TreeCursor`] are views for reading a tree.

mod changed_ranges;
mod cursor;
mod invariants;
mod length;
mod lexer;
mod node;
mod parser;
mod subtree;
mod trace;
mod tree;

#[cfg(test)]
mod cursor_tests;
#[cfg(test)]
mod lexer_tests;
#[cfg(test)]
mod node_tests;
#[cfg(test)]
mod parser_tests;
#[cfg(test)]
mod trace_tests;

pub use cursor::TreeCursor;
pub use lexer::InputEncoding;
pub use node::Node;
pub use parser::{IncludedRangesError, Parser};
pub use trace::{NoopTracer, PrintTracer, Tracer, Verbosity};
pub use tree::Tree;

pub use thicket_core::{InputEdit, Language, LanguageError, Point, Range};
