//! Invariant checks that panic on violation.
//!
//! These encode states the parser never produces; they are excluded from coverage.

#![cfg_attr(coverage_nightly, coverage(off))]

use thicket_core::{Language, StateId, SymbolId};

/// Goto target after a reduction. The tables always define one for a reduced symbol.
pub(crate) fn ensure_goto(language: &Language, state: StateId, symbol: SymbolId) -> StateId {
    language.goto(state, symbol).unwrap_or_else(|| {
        panic!(
            "no goto for `{}` in state {state}",
            language.symbol_name(symbol)
        )
    })
}

pub(crate) fn ensure_stack_depth(depth: usize, needed: usize) {
    if depth < needed {
        panic!("reduce needs {needed} stack entries, found {depth}");
    }
}
