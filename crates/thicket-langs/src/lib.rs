#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Grammar toolchain and bundled languages.
//!
//! Reads tree-sitter style `grammar.json`, builds canonical LR(1) parse tables
//! and a lexical DFA, and packages them as a [`thicket_core::Language`].

pub mod builtin;
mod error;
pub mod generate;
pub mod grammar;


pub use builtin::*;
pub use error::GrammarError;
pub use generate::{build_language, generate, load_language};
pub use grammar::Grammar;
