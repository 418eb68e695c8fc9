#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data model shared by the thicket crates.
//!
//! - Document coordinates: [`Point`], [`Range`], [`InputEdit`]
//! - The opaque [`Language`] descriptor built from [`LanguageTables`]
//! - Node-type tables used for query validation
//! - Small utilities: string [`Interner`], terminal [`Colors`]

mod colors;
mod interner;
mod language;
mod node_types;
mod position;

#[cfg(test)]
mod interner_tests;
#[cfg(test)]
mod language_tests;
#[cfg(test)]
mod node_types_tests;
#[cfg(test)]
mod position_tests;

pub use colors::Colors;
pub use interner::{Interner, StringId};
pub use language::{
    FieldEntry, FieldId, LANGUAGE_VERSION, Language, LanguageError, LanguageTables, LexOutput,
    LexPattern, LexTable, MIN_COMPATIBLE_LANGUAGE_VERSION, ParseAction, ParseState, Production,
    STATE_NONE, SYMBOL_END, SYMBOL_ERROR, StateId, SymbolId, SymbolInfo, SymbolKind,
};
pub use node_types::{
    Cardinality, ChildrenInfo, DynamicNodeTypes, FieldInfo, NodeTypeInfo, NodeTypes, RawCardinality,
    RawNode, RawTypeRef, parse_node_types, render_node_types,
};
pub use position::{InputEdit, Point, Range, extent_of, point_at};
