//! Grammar to language descriptor compilation.
//!
//! Pipeline: [`prepare`] flattens rules into productions, [`lr`] builds the
//! canonical LR(1) tables, [`lex`] compiles terminals into one DFA and
//! [`node_types`] infers the node-type table.

mod lex;
mod lr;
mod node_types;
mod prepare;


use std::num::NonZeroU16;

use thicket_core::{FieldEntry, LANGUAGE_VERSION, Language, LanguageTables, Production};

use crate::GrammarError;
use crate::grammar::Grammar;

/// Compiles a grammar into raw descriptor tables.
pub fn generate(grammar: &Grammar) -> Result<LanguageTables, GrammarError> {
    let prepared = prepare::prepare(grammar)?;
    let states = lr::build_states(&prepared)?;
    let lex = lex::build_lex_table(&prepared)?;
    let node_types = node_types::infer_node_types(&prepared);

    let field_id = |name: &str| -> Option<NonZeroU16> {
        let index = prepared.fields.binary_search_by(|f| f.as_str().cmp(name)).ok()?;
        NonZeroU16::new(index as u16 + 1)
    };
    let productions = prepared.productions[..prepared.augmented()]
        .iter()
        .map(|prod| Production {
            symbol: prod.symbol,
            child_count: prod.rhs.len() as u16,
            fields: prod
                .fields
                .iter()
                .enumerate()
                .filter_map(|(index, field)| {
                    Some(FieldEntry {
                        child_index: index as u16,
                        field: field_id(field.as_deref()?)?,
                    })
                })
                .collect(),
        })
        .collect();

    Ok(LanguageTables {
        name: prepared.name.clone(),
        version: LANGUAGE_VERSION,
        symbols: prepared.symbols.clone(),
        fields: prepared.fields.clone(),
        states,
        productions,
        lex,
        node_types,
    })
}

/// Compiles a grammar into a ready-to-use [`Language`].
pub fn build_language(grammar: &Grammar) -> Result<Language, GrammarError> {
    Ok(Language::new(generate(grammar)?)?)
}

/// Parses `grammar.json` text and compiles it.
pub fn load_language(json: &str) -> Result<Language, GrammarError> {
    build_language(&Grammar::from_json(json)?)
}
