use regex_automata::dfa::{StartKind, dense};
use regex_automata::MatchKind;

use crate::{
    FieldEntry, LANGUAGE_VERSION, Language, LanguageError, LanguageTables, LexOutput, LexPattern,
    LexTable, ParseAction, ParseState, Production, SYMBOL_ERROR, SymbolInfo, SymbolKind,
};

fn lex_table() -> LexTable {
    let dfa = dense::Builder::new()
        .configure(
            dense::Config::new()
                .start_kind(StartKind::Anchored)
                .match_kind(MatchKind::All),
        )
        .build_many(&["x", r"\s"])
        .unwrap();
    LexTable {
        dfa: dfa.to_sparse().unwrap().to_bytes_little_endian(),
        patterns: vec![
            LexPattern {
                output: LexOutput::Token(1),
                literal: true,
                immediate: false,
            },
            LexPattern {
                output: LexOutput::Skip,
                literal: false,
                immediate: false,
            },
        ],
    }
}

fn symbol(name: &str, named: bool, kind: SymbolKind) -> SymbolInfo {
    SymbolInfo {
        name: name.to_owned(),
        named,
        visible: true,
        kind,
    }
}

fn tables() -> LanguageTables {
    LanguageTables {
        name: "tiny".to_owned(),
        version: LANGUAGE_VERSION,
        symbols: vec![
            SymbolInfo {
                visible: false,
                ..symbol("end", true, SymbolKind::Token)
            },
            symbol("x", false, SymbolKind::Token),
            symbol("start", true, SymbolKind::Rule),
        ],
        fields: vec!["item".to_owned()],
        states: vec![
            ParseState {
                actions: vec![(1, ParseAction::Shift(1))],
                gotos: vec![(2, 2)],
                lex_mode: 0,
            },
            ParseState {
                actions: vec![(
                    0,
                    ParseAction::Reduce {
                        symbol: 2,
                        child_count: 1,
                        production: 0,
                    },
                )],
                gotos: vec![],
                lex_mode: 1,
            },
            ParseState {
                actions: vec![(0, ParseAction::Accept)],
                gotos: vec![],
                lex_mode: 1,
            },
        ],
        productions: vec![Production {
            symbol: 2,
            child_count: 1,
            fields: vec![FieldEntry {
                child_index: 0,
                field: std::num::NonZeroU16::new(1).unwrap(),
            }],
        }],
        lex: lex_table(),
        node_types: vec![],
    }
}

#[test]
fn lookups() {
    let language = Language::new(tables()).unwrap();

    assert_eq!(language.name(), "tiny");
    assert!(language.is_compatible());
    assert_eq!(language.symbol_count(), 3);
    assert_eq!(language.terminal_count(), 2);
    assert_eq!(language.symbol_name(1), "x");
    assert_eq!(language.symbol_name(SYMBOL_ERROR), "ERROR");
    assert_eq!(language.symbol_for_name("start", true), Some(2));
    assert_eq!(language.symbol_for_name("ERROR", true), Some(SYMBOL_ERROR));
    assert_eq!(language.symbol_for_name("x", true), None);
    assert!(!language.symbol_is_named(1));
    assert!(!language.symbol_is_visible(0));

    let item = language.field_id_for_name("item").unwrap();
    assert_eq!(language.field_name_for_id(item), Some("item"));
    assert_eq!(language.field_map(0)[0].field, item);
}

#[test]
fn actions_and_gotos() {
    let language = Language::new(tables()).unwrap();

    assert_eq!(language.action(0, 1), Some(ParseAction::Shift(1)));
    assert_eq!(language.action(0, 0), None);
    assert_eq!(language.goto(0, 2), Some(2));
    assert_eq!(language.next_state(0, 1), Some(1));
    assert_eq!(language.next_state(0, 2), Some(2));
    assert_eq!(language.valid_tokens(1).collect::<Vec<_>>(), [0]);
    assert_eq!(language.lex_mode(2), language.lex_mode(1));
}

#[test]
fn clones_share_identity() {
    let a = Language::new(tables()).unwrap();
    let b = a.clone();
    let c = Language::new(tables()).unwrap();

    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn rejects_dangling_shift() {
    let mut t = tables();
    t.states[0].actions[0].1 = ParseAction::Shift(9);
    let err = Language::new(t).unwrap_err();
    assert!(matches!(err, LanguageError::ParseTable(_)));
}

#[test]
fn rejects_garbage_dfa() {
    let mut t = tables();
    t.lex.dfa = vec![1, 2, 3];
    let err = Language::new(t).unwrap_err();
    assert!(matches!(err, LanguageError::LexTable(_)));
}

#[test]
fn version_outside_range_is_incompatible() {
    let mut t = tables();
    t.version = LANGUAGE_VERSION + 1;
    let language = Language::new(t).unwrap();
    assert!(!language.is_compatible());
}
