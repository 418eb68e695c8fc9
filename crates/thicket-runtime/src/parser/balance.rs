//! Rebalancing of repetition subtrees.
//!
//! Left-recursive repetition helpers reduce into left-leaning chains whose
//! depth grows with the list. After a parse, every newly built chain is
//! rebuilt as a balanced binary tree over its elements. Shared subtrees
//! (reused from an older tree) were balanced when they were built and are
//! treated as opaque elements.

use thicket_core::{Language, STATE_NONE, SymbolId, SymbolKind};

use crate::subtree::Subtree;

pub(crate) fn balance(root: &mut Subtree, language: &Language) {
    let mut stack: Vec<(&mut Subtree, Option<SymbolId>)> = vec![(root, None)];

    while let Some((tree, spine)) = stack.pop() {
        if !tree.is_unique() || tree.is_leaf() {
            continue;
        }
        let spine = spine.filter(|symbol| is_binary(tree, *symbol));
        let data = tree.data_mut();
        for child in data.children.iter_mut() {
            if spine.is_some() {
                stack.push((child, spine));
                continue;
            }
            if is_chain_root(child, language) && child.is_unique() {
                let symbol = child.symbol();
                rebuild(child, language);
                stack.push((child, Some(symbol)));
            } else {
                stack.push((child, None));
            }
        }
    }
}

fn is_binary(tree: &Subtree, symbol: SymbolId) -> bool {
    tree.symbol() == symbol
        && matches!(tree.children(), [left, right] if left.symbol() == symbol && right.symbol() == symbol)
}

fn is_chain_root(tree: &Subtree, language: &Language) -> bool {
    language.symbol_kind(tree.symbol()) == SymbolKind::Repeat && is_binary(tree, tree.symbol())
}

fn rebuild(chain: &mut Subtree, language: &Language) {
    let symbol = chain.symbol();
    let production = chain.production();
    let parse_state = chain.parse_state();
    let lookahead_bytes = chain.lookahead_bytes();

    let units = {
        let mut units = Vec::new();
        let mut work = vec![&*chain];
        while let Some(node) = work.pop() {
            let owned = node.ptr_eq(chain) || node.is_unique();
            match node.children() {
                [left, right] if owned && is_binary(node, symbol) => {
                    work.push(right);
                    work.push(left);
                }
                _ => units.push(node.clone()),
            }
        }
        units
    };

    let mut balanced = build(&units, symbol, production, language);
    drop(units);
    let data = balanced.data_mut();
    data.parse_state = parse_state;
    data.lookahead_bytes = data.lookahead_bytes.max(lookahead_bytes);
    *chain = balanced;
}

fn build(units: &[Subtree], symbol: SymbolId, production: u16, language: &Language) -> Subtree {
    if let [only] = units {
        return only.clone();
    }
    let mid = units.len() / 2;
    let left = build(&units[..mid], symbol, production, language);
    let right = build(&units[mid..], symbol, production, language);
    Subtree::node(language, symbol, vec![left, right], production, STATE_NONE)
}
