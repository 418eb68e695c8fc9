//! Canonical LR(1) automaton construction and conflict resolution.
//!
//! Canonical (unmerged) item sets keep every error detectable at the first
//! offending token, and make a state's valid-token set exact. The runtime
//! relies on the latter to decide when a leaf can be reused.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use thicket_core::{ParseAction, ParseState, STATE_NONE, StateId, SymbolId, SymbolKind};

use super::prepare::{Assoc, Prepared};
use crate::GrammarError;

type Core = (usize, usize);
type Kernel = Vec<(Core, Vec<SymbolId>)>;
type ItemSet = BTreeMap<Core, BTreeSet<SymbolId>>;

struct Builder<'p> {
    prepared: &'p Prepared,
    by_symbol: HashMap<SymbolId, Vec<usize>>,
    first: HashMap<SymbolId, BTreeSet<SymbolId>>,
    nullable: HashMap<SymbolId, bool>,
}

pub(crate) fn build_states(prepared: &Prepared) -> Result<Vec<ParseState>, GrammarError> {
    let builder = Builder::new(prepared);
    let (item_sets, transitions) = builder.automaton()?;

    let mut states = Vec::with_capacity(item_sets.len());
    for (index, (items, edges)) in item_sets.iter().zip(&transitions).enumerate() {
        states.push(builder.state(index, items, edges)?);
    }
    assign_lex_modes(&mut states);
    Ok(states)
}

/// States with identical valid-token sets share a lex mode.
fn assign_lex_modes(states: &mut [ParseState]) {
    let mut modes: HashMap<Vec<SymbolId>, u16> = HashMap::new();
    for state in states {
        let tokens: Vec<SymbolId> = state.actions.iter().map(|(symbol, _)| *symbol).collect();
        let next = modes.len() as u16;
        state.lex_mode = *modes.entry(tokens).or_insert(next);
    }
}

impl<'p> Builder<'p> {
    fn new(prepared: &'p Prepared) -> Self {
        let mut by_symbol: HashMap<SymbolId, Vec<usize>> = HashMap::new();
        for (index, prod) in prepared.productions.iter().enumerate() {
            if index != prepared.augmented() {
                by_symbol.entry(prod.symbol).or_default().push(index);
            }
        }

        let mut builder = Self {
            prepared,
            by_symbol,
            first: HashMap::new(),
            nullable: HashMap::new(),
        };
        builder.compute_first_sets();
        builder
    }

    fn compute_first_sets(&mut self) {
        let prepared = self.prepared;
        let productions = &prepared.productions;
        let augmented = prepared.augmented();
        loop {
            let mut changed = false;
            for (index, prod) in productions.iter().enumerate() {
                if index == augmented {
                    continue;
                }
                let (first, nullable) = self.first_of(&prod.rhs);
                let entry = self.first.entry(prod.symbol).or_default();
                let before = entry.len();
                entry.extend(first);
                changed |= entry.len() != before;
                if nullable && !self.nullable.get(&prod.symbol).copied().unwrap_or(false) {
                    self.nullable.insert(prod.symbol, true);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// FIRST set of a symbol string, and whether it can derive the empty string.
    fn first_of(&self, symbols: &[SymbolId]) -> (BTreeSet<SymbolId>, bool) {
        let mut first = BTreeSet::new();
        for &symbol in symbols {
            if self.prepared.is_terminal(symbol) {
                first.insert(symbol);
                return (first, false);
            }
            if let Some(set) = self.first.get(&symbol) {
                first.extend(set.iter().copied());
            }
            if !self.nullable.get(&symbol).copied().unwrap_or(false) {
                return (first, false);
            }
        }
        (first, true)
    }

    fn closure(&self, kernel: &Kernel) -> ItemSet {
        let mut items: ItemSet = kernel
            .iter()
            .map(|(core, la)| (*core, la.iter().copied().collect()))
            .collect();
        let mut work: Vec<Core> = items.keys().copied().collect();

        while let Some(core @ (prod, dot)) = work.pop() {
            let rhs = &self.prepared.productions[prod].rhs;
            let Some(&next) = rhs.get(dot) else {
                continue;
            };
            if self.prepared.is_terminal(next) {
                continue;
            }
            let (mut lookahead, nullable) = self.first_of(&rhs[dot + 1..]);
            if nullable {
                lookahead.extend(items[&core].iter().copied());
            }
            for &candidate in self.by_symbol.get(&next).into_iter().flatten() {
                let entry = items.entry((candidate, 0)).or_default();
                let before = entry.len();
                entry.extend(lookahead.iter().copied());
                if entry.len() != before {
                    work.push((candidate, 0));
                }
            }
        }
        items
    }

    /// Item sets and outgoing edges of every reachable state, state 0 first.
    #[allow(clippy::type_complexity)]
    fn automaton(&self) -> Result<(Vec<ItemSet>, Vec<BTreeMap<SymbolId, StateId>>), GrammarError> {
        let start: Kernel = vec![((self.prepared.augmented(), 0), vec![0])];
        let mut kernels = vec![start.clone()];
        let mut index: HashMap<Kernel, StateId> = HashMap::from([(start, 0)]);
        let mut item_sets = Vec::new();
        let mut transitions = Vec::new();

        let mut current = 0;
        while current < kernels.len() {
            let items = self.closure(&kernels[current]);

            let mut successors: BTreeMap<SymbolId, ItemSet> = BTreeMap::new();
            for ((prod, dot), lookahead) in &items {
                let rhs = &self.prepared.productions[*prod].rhs;
                if let Some(&next) = rhs.get(*dot) {
                    successors
                        .entry(next)
                        .or_default()
                        .entry((*prod, dot + 1))
                        .or_default()
                        .extend(lookahead.iter().copied());
                }
            }

            let mut edges = BTreeMap::new();
            for (symbol, set) in successors {
                let kernel: Kernel = set
                    .into_iter()
                    .map(|(core, la)| (core, la.into_iter().collect()))
                    .collect();
                let target = match index.get(&kernel) {
                    Some(&target) => target,
                    None => {
                        let target = kernels.len();
                        if target >= STATE_NONE as usize {
                            return Err(GrammarError::TooLarge(format!(
                                "more than {} parse states",
                                STATE_NONE
                            )));
                        }
                        let target = target as StateId;
                        index.insert(kernel.clone(), target);
                        kernels.push(kernel);
                        target
                    }
                };
                edges.insert(symbol, target);
            }
            item_sets.push(items);
            transitions.push(edges);
            current += 1;
        }
        Ok((item_sets, transitions))
    }

    fn state(
        &self,
        index: usize,
        items: &ItemSet,
        edges: &BTreeMap<SymbolId, StateId>,
    ) -> Result<ParseState, GrammarError> {
        let prepared = self.prepared;
        let mut shifts: BTreeMap<SymbolId, (StateId, i32)> = BTreeMap::new();
        let mut reduces: BTreeMap<SymbolId, Vec<usize>> = BTreeMap::new();
        let mut accept = false;

        for ((prod, dot), lookahead) in items {
            let production = &prepared.productions[*prod];
            match production.rhs.get(*dot) {
                Some(&next) if prepared.is_terminal(next) => {
                    if let Some(&target) = edges.get(&next) {
                        let entry = shifts.entry(next).or_insert((target, production.prec));
                        entry.1 = entry.1.max(production.prec);
                    }
                }
                Some(_) => {}
                None if *prod == prepared.augmented() => accept = true,
                None => {
                    for &symbol in lookahead {
                        reduces.entry(symbol).or_default().push(*prod);
                    }
                }
            }
        }

        let mut actions: BTreeMap<SymbolId, ParseAction> = BTreeMap::new();
        if accept {
            actions.insert(0, ParseAction::Accept);
        }
        let lookaheads: BTreeSet<SymbolId> = shifts.keys().chain(reduces.keys()).copied().collect();
        for symbol in lookaheads {
            if symbol == 0 && accept {
                continue;
            }
            let action = self.resolve(
                index,
                symbol,
                shifts.get(&symbol).copied(),
                reduces.get(&symbol).map(Vec::as_slice).unwrap_or(&[]),
            )?;
            actions.insert(symbol, action);
        }
        for &extra in &prepared.extra_tokens {
            actions.entry(extra).or_insert(ParseAction::ShiftExtra);
        }

        let gotos = edges
            .iter()
            .filter(|(symbol, _)| !prepared.is_terminal(**symbol))
            .map(|(symbol, target)| (*symbol, *target))
            .collect();

        Ok(ParseState {
            actions: actions.into_iter().collect(),
            gotos,
            lex_mode: 0,
        })
    }

    fn resolve(
        &self,
        state: usize,
        lookahead: SymbolId,
        shift: Option<(StateId, i32)>,
        reduces: &[usize],
    ) -> Result<ParseAction, GrammarError> {
        let prepared = self.prepared;
        let reduce = match reduces {
            [] => None,
            [only] => Some(*only),
            many => {
                let best = many
                    .iter()
                    .map(|p| prepared.productions[*p].prec)
                    .max()
                    .unwrap_or(0);
                let winners: Vec<usize> = many
                    .iter()
                    .copied()
                    .filter(|p| prepared.productions[*p].prec == best)
                    .collect();
                if winners.len() > 1 {
                    return Err(self.conflict(state, lookahead, "reduce/reduce", &winners));
                }
                winners.first().copied()
            }
        };

        let reduce_action = |prod: usize| {
            let production = &prepared.productions[prod];
            ParseAction::Reduce {
                symbol: production.symbol,
                child_count: production.rhs.len() as u16,
                production: prod as u16,
            }
        };

        match (shift, reduce) {
            (Some((target, _)), None) => Ok(ParseAction::Shift(target)),
            (None, Some(prod)) => Ok(reduce_action(prod)),
            (None, None) => Err(self.conflict(state, lookahead, "no action", &[])),
            (Some((target, shift_prec)), Some(prod)) => {
                let production = &prepared.productions[prod];
                let kind = prepared.symbols[production.symbol as usize].kind;
                if kind == SymbolKind::Repeat {
                    return Ok(reduce_action(prod));
                }
                match production.prec.cmp(&shift_prec) {
                    std::cmp::Ordering::Greater => Ok(reduce_action(prod)),
                    std::cmp::Ordering::Less => Ok(ParseAction::Shift(target)),
                    std::cmp::Ordering::Equal => match production.assoc {
                        Assoc::Left => Ok(reduce_action(prod)),
                        Assoc::Right => Ok(ParseAction::Shift(target)),
                        Assoc::None => {
                            Err(self.conflict(state, lookahead, "shift/reduce", &[prod]))
                        }
                    },
                }
            }
        }
    }

    fn conflict(
        &self,
        state: usize,
        lookahead: SymbolId,
        kind: &str,
        productions: &[usize],
    ) -> GrammarError {
        let prepared = self.prepared;
        let name = |symbol: SymbolId| prepared.symbols[symbol as usize].name.clone();
        let described: Vec<String> = productions
            .iter()
            .map(|p| {
                let prod = &prepared.productions[*p];
                let rhs: Vec<String> = prod.rhs.iter().map(|s| name(*s)).collect();
                format!("{} -> {}", name(prod.symbol), rhs.join(" "))
            })
            .collect();
        GrammarError::Conflict {
            state,
            lookahead: name(lookahead),
            detail: format!("{kind} between {}", described.join(", ")),
        }
    }
}
