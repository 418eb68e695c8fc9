//! Node-type inference: which fields and children each visible node may carry.
//!
//! Hidden rules and repetition helpers are looked through, so their visible
//! descendants count as children of the nearest visible ancestor.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use thicket_core::{RawCardinality, RawNode, RawTypeRef, SymbolId, SymbolKind};

use super::prepare::Prepared;

#[derive(Debug, Clone, Default)]
struct Slot {
    types: BTreeSet<(String, bool)>,
    multiple: bool,
    required: bool,
}

type Summary = BTreeMap<Option<String>, Slot>;

struct Inference<'p> {
    prepared: &'p Prepared,
    productions: HashMap<SymbolId, Vec<usize>>,
    memo: HashMap<SymbolId, Summary>,
    in_progress: HashSet<SymbolId>,
}

pub(crate) fn infer_node_types(prepared: &Prepared) -> Vec<RawNode> {
    let mut productions: HashMap<SymbolId, Vec<usize>> = HashMap::new();
    for (index, prod) in prepared.productions.iter().enumerate() {
        if index != prepared.augmented() {
            productions.entry(prod.symbol).or_default().push(index);
        }
    }
    let mut inference = Inference {
        prepared,
        productions,
        memo: HashMap::new(),
        in_progress: HashSet::new(),
    };

    let mut nodes = Vec::new();
    let mut seen = HashSet::new();
    for (index, info) in prepared.symbols.iter().enumerate() {
        let symbol = index as SymbolId;
        if !info.visible || !seen.insert((info.name.clone(), info.named)) {
            continue;
        }
        if info.kind == SymbolKind::Token {
            nodes.push(RawNode {
                type_name: info.name.clone(),
                named: info.named,
                root: false,
                extra: prepared.extra_tokens.contains(&symbol),
                fields: IndexMap::new(),
                children: None,
            });
            continue;
        }

        let summary = inference.summary(symbol);
        let mut fields = IndexMap::new();
        let mut children = None;
        for (field, slot) in summary {
            match field {
                Some(name) => {
                    fields.insert(name, cardinality(&slot, true));
                }
                None => {
                    let named = cardinality(&slot, false);
                    if !named.types.is_empty() {
                        children = Some(named);
                    }
                }
            }
        }
        nodes.push(RawNode {
            type_name: info.name.clone(),
            named: info.named,
            root: symbol == prepared.start,
            extra: false,
            fields,
            children,
        });
    }
    nodes
}

fn cardinality(slot: &Slot, include_anonymous: bool) -> RawCardinality {
    RawCardinality {
        multiple: slot.multiple,
        required: slot.required,
        types: slot
            .types
            .iter()
            .filter(|(_, named)| include_anonymous || *named)
            .map(|(name, named)| RawTypeRef {
                type_name: name.clone(),
                named: *named,
            })
            .collect(),
    }
}

impl Inference<'_> {
    fn summary(&mut self, symbol: SymbolId) -> Summary {
        if let Some(summary) = self.memo.get(&symbol) {
            return summary.clone();
        }
        // Recursion through hidden rules only adds types already being collected.
        if !self.in_progress.insert(symbol) {
            return Summary::new();
        }

        let prods = self.productions.get(&symbol).cloned().unwrap_or_default();
        let mut combined: Option<Summary> = None;
        for prod in prods {
            let contribution = self.production(prod);
            combined = Some(match combined {
                None => contribution,
                Some(acc) => merge_alternatives(acc, contribution),
            });
        }
        let mut summary = combined.unwrap_or_default();
        if self.prepared.symbols[symbol as usize].kind == SymbolKind::Repeat {
            for slot in summary.values_mut() {
                slot.multiple = true;
            }
        }

        self.in_progress.remove(&symbol);
        self.memo.insert(symbol, summary.clone());
        summary
    }

    fn production(&mut self, prod: usize) -> Summary {
        let prepared = self.prepared;
        let production = &prepared.productions[prod];
        let mut out = Summary::new();
        for (child, field) in production.rhs.iter().zip(&production.fields) {
            let info = &prepared.symbols[*child as usize];
            if info.visible {
                let slot = Slot {
                    types: BTreeSet::from([(info.name.clone(), info.named)]),
                    multiple: false,
                    required: field.is_some() || info.named,
                };
                add_sequential(&mut out, field.clone(), slot);
            } else if info.kind != SymbolKind::Token {
                for (inner, slot) in self.summary(*child) {
                    add_sequential(&mut out, inner.or_else(|| field.clone()), slot);
                }
            }
        }
        out
    }
}

/// Two slots that occur one after the other in the same production.
fn add_sequential(summary: &mut Summary, key: Option<String>, slot: Slot) {
    match summary.get_mut(&key) {
        Some(existing) => {
            // Anonymous tokens outside fields are not children.
            let counts = key.is_some() || (has_named(&existing.types) && has_named(&slot.types));
            existing.multiple |= slot.multiple || counts;
            existing.required |= slot.required;
            existing.types.extend(slot.types);
        }
        None => {
            summary.insert(key, slot);
        }
    }
}

/// Two summaries from alternative productions of the same symbol.
fn merge_alternatives(mut left: Summary, right: Summary) -> Summary {
    for (key, slot) in left.iter_mut() {
        if !right.contains_key(key) {
            slot.required = false;
        }
    }
    for (key, slot) in right {
        match left.get_mut(&key) {
            Some(existing) => {
                existing.types.extend(slot.types);
                existing.multiple |= slot.multiple;
                existing.required &= slot.required;
            }
            None => {
                left.insert(
                    key,
                    Slot {
                        required: false,
                        ..slot
                    },
                );
            }
        }
    }
    left
}

fn has_named(types: &BTreeSet<(String, bool)>) -> bool {
    types.iter().any(|(_, named)| *named)
}
