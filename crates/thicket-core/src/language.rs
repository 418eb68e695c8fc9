//! The opaque language descriptor consumed by the parser.
//!
//! A [`Language`] is produced by a grammar toolchain from [`LanguageTables`]: LR parse
//! tables, a lexical DFA serialized in sparse little-endian form, symbol and field metadata,
//! and the node-type table. Cloning is cheap; all clones share one allocation.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU16;
use std::sync::Arc;

use regex_automata::dfa::sparse;
use serde::{Deserialize, Serialize};

use crate::node_types::{DynamicNodeTypes, RawNode};

/// Grammar symbol id. Terminals come first, then non-terminals.
pub type SymbolId = u16;
/// Field id. Zero is reserved for "no field".
pub type FieldId = NonZeroU16;
/// Parse state id.
pub type StateId = u16;

/// End-of-input terminal.
pub const SYMBOL_END: SymbolId = 0;
/// Error nodes and unrecognized characters.
pub const SYMBOL_ERROR: SymbolId = u16::MAX;
/// Parse state recorded on subtrees that must never be reused as a whole.
pub const STATE_NONE: StateId = u16::MAX;

/// Newest descriptor version this engine reads.
pub const LANGUAGE_VERSION: u32 = 3;
/// Oldest descriptor version this engine still reads.
pub const MIN_COMPATIBLE_LANGUAGE_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    /// Produced by the lexer.
    Token,
    /// Produced by a reduction.
    Rule,
    /// Hidden helper rule generated for repetitions; subtrees may be rebalanced.
    Repeat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub named: bool,
    pub visible: bool,
    pub kind: SymbolKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseAction {
    Shift(StateId),
    /// Consume an extra token without changing state.
    ShiftExtra,
    Reduce {
        symbol: SymbolId,
        child_count: u16,
        production: u16,
    },
    Accept,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseState {
    /// Terminal actions, sorted by symbol.
    pub actions: Vec<(SymbolId, ParseAction)>,
    /// Non-terminal transitions, sorted by symbol.
    pub gotos: Vec<(SymbolId, StateId)>,
    /// States with equal lex modes accept exactly the same terminals.
    pub lex_mode: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldEntry {
    /// Index among the non-extra children of the production.
    pub child_index: u16,
    pub field: FieldId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    pub symbol: SymbolId,
    pub child_count: u16,
    pub fields: Vec<FieldEntry>,
}

/// What a lexical DFA pattern produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LexOutput {
    Token(SymbolId),
    /// Anonymous extra (whitespace): becomes padding of the next token.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LexPattern {
    pub output: LexOutput,
    /// Literal strings win ties against regex patterns of equal length.
    pub literal: bool,
    /// Only valid with no padding before it.
    pub immediate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexTable {
    /// Anchored multi-pattern sparse DFA, `to_bytes_little_endian` form.
    pub dfa: Vec<u8>,
    /// Indexed by DFA pattern id.
    pub patterns: Vec<LexPattern>,
}

/// Raw descriptor contents, as emitted by a grammar toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageTables {
    pub name: String,
    pub version: u32,
    /// Indexed by symbol id; `SYMBOL_ERROR` is implicit.
    pub symbols: Vec<SymbolInfo>,
    /// `fields[i]` names field id `i + 1`.
    pub fields: Vec<String>,
    pub states: Vec<ParseState>,
    pub productions: Vec<Production>,
    pub lex: LexTable,
    pub node_types: Vec<RawNode>,
}

#[derive(Debug, thiserror::Error)]
pub enum LanguageError {
    #[error(
        "incompatible language version {version}, expected {min}..={max}",
        min = MIN_COMPATIBLE_LANGUAGE_VERSION,
        max = LANGUAGE_VERSION
    )]
    Version { version: u32 },
    #[error("invalid lex table: {0}")]
    LexTable(String),
    #[error("invalid parse table: {0}")]
    ParseTable(String),
}

struct LanguageInner {
    tables: LanguageTables,
    dfa: sparse::DFA<Vec<u8>>,
    node_types: DynamicNodeTypes,
    symbol_ids: HashMap<(String, bool), SymbolId>,
    terminal_count: usize,
}

/// Shared, immutable language descriptor.
#[derive(Clone)]
pub struct Language(Arc<LanguageInner>);

impl Language {
    /// Validates tables and deserializes the lexical DFA.
    ///
    /// The version is not checked here; parsers reject incompatible versions
    /// when the language is assigned.
    pub fn new(tables: LanguageTables) -> Result<Self, LanguageError> {
        let dfa = sparse::DFA::from_bytes(&tables.lex.dfa)
            .map(|(dfa, _)| dfa.to_owned())
            .map_err(|e| LanguageError::LexTable(e.to_string()))?;
        validate_tables(&tables)?;

        let mut symbol_ids = HashMap::new();
        for (id, info) in tables.symbols.iter().enumerate() {
            symbol_ids
                .entry((info.name.clone(), info.named))
                .or_insert(id as SymbolId);
        }
        symbol_ids.insert(("ERROR".to_owned(), true), SYMBOL_ERROR);

        let terminal_count = tables
            .symbols
            .iter()
            .take_while(|s| s.kind == SymbolKind::Token)
            .count();

        let field_ids: HashMap<&str, FieldId> = tables
            .fields
            .iter()
            .enumerate()
            .filter_map(|(i, name)| Some((name.as_str(), NonZeroU16::new(i as u16 + 1)?)))
            .collect();
        let node_types = DynamicNodeTypes::build(
            &tables.node_types,
            |name, named| symbol_ids.get(&(name.to_owned(), named)).copied(),
            |name| field_ids.get(name).copied(),
        );

        Ok(Self(Arc::new(LanguageInner {
            tables,
            dfa,
            node_types,
            symbol_ids,
            terminal_count,
        })))
    }

    pub fn name(&self) -> &str {
        &self.0.tables.name
    }

    pub fn version(&self) -> u32 {
        self.0.tables.version
    }

    pub fn is_compatible(&self) -> bool {
        (MIN_COMPATIBLE_LANGUAGE_VERSION..=LANGUAGE_VERSION).contains(&self.version())
    }

    pub fn tables(&self) -> &LanguageTables {
        &self.0.tables
    }

    /// Number of grammar symbols, excluding the implicit error symbol.
    pub fn symbol_count(&self) -> usize {
        self.0.tables.symbols.len()
    }

    /// Terminals occupy ids `0..terminal_count`.
    pub fn terminal_count(&self) -> usize {
        self.0.terminal_count
    }

    pub fn field_count(&self) -> usize {
        self.0.tables.fields.len()
    }

    pub fn state_count(&self) -> usize {
        self.0.tables.states.len()
    }

    pub fn symbol_info(&self, symbol: SymbolId) -> Option<&SymbolInfo> {
        self.0.tables.symbols.get(symbol as usize)
    }

    pub fn symbol_name(&self, symbol: SymbolId) -> &str {
        if symbol == SYMBOL_ERROR {
            return "ERROR";
        }
        self.symbol_info(symbol).map_or("", |s| s.name.as_str())
    }

    pub fn symbol_is_named(&self, symbol: SymbolId) -> bool {
        symbol == SYMBOL_ERROR || self.symbol_info(symbol).is_some_and(|s| s.named)
    }

    pub fn symbol_is_visible(&self, symbol: SymbolId) -> bool {
        symbol == SYMBOL_ERROR || self.symbol_info(symbol).is_some_and(|s| s.visible)
    }

    pub fn symbol_kind(&self, symbol: SymbolId) -> SymbolKind {
        self.symbol_info(symbol).map_or(SymbolKind::Rule, |s| s.kind)
    }

    pub fn is_terminal(&self, symbol: SymbolId) -> bool {
        (symbol as usize) < self.0.terminal_count
    }

    pub fn symbol_for_name(&self, name: &str, named: bool) -> Option<SymbolId> {
        self.0.symbol_ids.get(&(name.to_owned(), named)).copied()
    }

    pub fn field_name_for_id(&self, field: FieldId) -> Option<&str> {
        self.0
            .tables
            .fields
            .get(field.get() as usize - 1)
            .map(String::as_str)
    }

    pub fn field_id_for_name(&self, name: &str) -> Option<FieldId> {
        let index = self.0.tables.fields.iter().position(|f| f == name)?;
        NonZeroU16::new(index as u16 + 1)
    }

    pub fn node_types(&self) -> &DynamicNodeTypes {
        &self.0.node_types
    }

    pub fn lex_dfa(&self) -> &sparse::DFA<Vec<u8>> {
        &self.0.dfa
    }

    pub fn lex_pattern(&self, pattern: usize) -> Option<&LexPattern> {
        self.0.tables.lex.patterns.get(pattern)
    }

    pub fn production(&self, production: u16) -> Option<&Production> {
        self.0.tables.productions.get(production as usize)
    }

    /// Fields assigned by a production, keyed by structural child index.
    pub fn field_map(&self, production: u16) -> &[FieldEntry] {
        self.production(production)
            .map_or(&[], |p| p.fields.as_slice())
    }

    pub fn action(&self, state: StateId, symbol: SymbolId) -> Option<ParseAction> {
        let actions = &self.0.tables.states.get(state as usize)?.actions;
        actions
            .binary_search_by_key(&symbol, |(s, _)| *s)
            .ok()
            .map(|i| actions[i].1)
    }

    pub fn goto(&self, state: StateId, symbol: SymbolId) -> Option<StateId> {
        let gotos = &self.0.tables.states.get(state as usize)?.gotos;
        gotos
            .binary_search_by_key(&symbol, |(s, _)| *s)
            .ok()
            .map(|i| gotos[i].1)
    }

    /// Next state after consuming `symbol` in `state`, for terminals and non-terminals alike.
    pub fn next_state(&self, state: StateId, symbol: SymbolId) -> Option<StateId> {
        if self.is_terminal(symbol) {
            match self.action(state, symbol)? {
                ParseAction::Shift(next) => Some(next),
                ParseAction::ShiftExtra => Some(state),
                _ => None,
            }
        } else {
            self.goto(state, symbol)
        }
    }

    pub fn is_valid_token(&self, state: StateId, symbol: SymbolId) -> bool {
        self.action(state, symbol).is_some()
    }

    /// Terminals with an action in `state`.
    pub fn valid_tokens(&self, state: StateId) -> impl Iterator<Item = SymbolId> + '_ {
        self.0
            .tables
            .states
            .get(state as usize)
            .into_iter()
            .flat_map(|s| s.actions.iter().map(|(symbol, _)| *symbol))
    }

    pub fn lex_mode(&self, state: StateId) -> u16 {
        self.0
            .tables
            .states
            .get(state as usize)
            .map_or(u16::MAX, |s| s.lex_mode)
    }
}

impl PartialEq for Language {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Language {}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.name())
            .field("version", &self.version())
            .field("symbols", &self.symbol_count())
            .field("states", &self.state_count())
            .finish()
    }
}

fn validate_tables(tables: &LanguageTables) -> Result<(), LanguageError> {
    if tables.states.is_empty() {
        return Err(LanguageError::ParseTable("no parse states".into()));
    }
    let symbol_count = tables.symbols.len();
    let state_count = tables.states.len();
    if symbol_count == 0 || tables.symbols[0].kind != SymbolKind::Token {
        return Err(LanguageError::ParseTable(
            "symbol 0 must be the end-of-input token".into(),
        ));
    }
    for (index, state) in tables.states.iter().enumerate() {
        for (symbol, action) in &state.actions {
            if *symbol as usize >= symbol_count {
                return Err(LanguageError::ParseTable(format!(
                    "state {index} has an action on unknown symbol {symbol}"
                )));
            }
            let target_ok = match action {
                ParseAction::Shift(next) => (*next as usize) < state_count,
                ParseAction::Reduce { production, .. } => {
                    (*production as usize) < tables.productions.len()
                }
                ParseAction::ShiftExtra | ParseAction::Accept => true,
            };
            if !target_ok {
                return Err(LanguageError::ParseTable(format!(
                    "state {index} has a dangling action on symbol {symbol}"
                )));
            }
        }
        if state
            .gotos
            .iter()
            .any(|(symbol, next)| *symbol as usize >= symbol_count || *next as usize >= state_count)
        {
            return Err(LanguageError::ParseTable(format!(
                "state {index} has a dangling goto"
            )));
        }
    }
    for production in &tables.productions {
        if production
            .fields
            .iter()
            .any(|entry| entry.field.get() as usize > tables.fields.len())
        {
            return Err(LanguageError::ParseTable(format!(
                "production for symbol {} references an unknown field",
                production.symbol
            )));
        }
    }
    for pattern in &tables.lex.patterns {
        if let LexOutput::Token(symbol) = pattern.output
            && symbol as usize >= symbol_count
        {
            return Err(LanguageError::LexTable(format!(
                "pattern produces unknown symbol {symbol}"
            )));
        }
    }
    Ok(())
}
