//! Structural queries over thicket syntax trees.
//!
//! # Example
//!
//! ```
//! use thicket_query::{Query, QueryCursor};
//! use thicket_runtime::Parser;
//!
//! let language = thicket_langs::script();
//! let mut parser = Parser::new();
//! parser.set_language(&language).unwrap();
//! let tree = parser.parse("a = 1;", None).unwrap();
//!
//! let query = Query::new(&language, "(assignment left: (_) @lhs right: (_) @rhs)").unwrap();
//! let mut cursor = QueryCursor::new();
//! cursor.exec(&query, tree.root_node());
//! assert_eq!(cursor.matches().count(), 1);
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod parser;

mod compile;
mod cursor;
mod error;
mod query;
mod trace;

#[cfg(test)]
mod cursor_tests;
#[cfg(test)]
mod error_tests;
#[cfg(test)]
mod trace_tests;

pub use cursor::{
    InvalidRangeError, QueryCapture, QueryCaptures, QueryCursor, QueryMatch, QueryMatches,
};
pub use error::{ErrorPrinter, QueryError, QueryErrorKind};
pub use query::{CaptureQuantifier, PredicateStep, Query, QueryPredicate, QueryPredicateArg};
pub use trace::{NoopQueryTracer, PrintQueryTracer, QueryTracer};
