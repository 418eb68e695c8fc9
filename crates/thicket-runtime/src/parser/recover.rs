//! Error recovery.
//!
//! When the lookahead has no action, recovery tries in order:
//!
//! 1. inserting one zero-width MISSING token after which the lookahead is valid,
//! 2. at end of input, discarding stack entries into an ERROR node until a
//!    state accepts the end,
//! 3. skipping the lookahead, wrapped in an ERROR node marked extra.

use thicket_core::{ParseAction, SYMBOL_END, SYMBOL_ERROR, StateId, SymbolId};

use super::{Lookahead, Session};
use crate::subtree::Subtree;
use crate::trace::Tracer;

/// Consecutive insertions allowed at one position.
const MAX_MISSING_RUN: usize = 8;
/// Reductions simulated per candidate before giving up.
const MAX_SIMULATED_STEPS: usize = 1000;

impl Session {
    /// Returns a root only when the whole input had to become an ERROR tree.
    pub(super) fn recover<T: Tracer + ?Sized>(
        &mut self,
        state: StateId,
        lookahead: Lookahead,
        tracer: &mut T,
    ) -> Option<Subtree> {
        self.recovering = true;
        let symbol = lookahead.tree.symbol();

        let position = self.stack.position().bytes;
        if position != self.missing_at {
            self.missing_at = position;
            self.missing_run = 0;
        }
        if symbol != SYMBOL_ERROR
            && self.missing_run < MAX_MISSING_RUN
            && let Some(missing) = self.missing_candidate(state, symbol)
        {
            self.missing_run += 1;
            tracer.trace_missing(missing);
            let tree = Subtree::missing_leaf(&self.language, missing, state);
            self.lookahead = Some(Lookahead {
                tree,
                reused: false,
            });
            self.queued = Some(lookahead);
            return None;
        }

        if symbol == SYMBOL_END {
            return self.recover_at_end(lookahead, tracer);
        }

        tracer.trace_skip(symbol);
        self.skip(lookahead.tree);
        None
    }

    /// First terminal whose insertion makes `lookahead` valid. Literal tokens are
    /// preferred over named ones.
    fn missing_candidate(&self, state: StateId, lookahead: SymbolId) -> Option<SymbolId> {
        let language = &self.language;
        let mut candidates: Vec<SymbolId> = language
            .valid_tokens(state)
            .filter(|&t| t != SYMBOL_END)
            .filter(|&t| !matches!(language.action(state, t), Some(ParseAction::ShiftExtra)))
            .collect();
        candidates.sort_by_key(|&t| (language.symbol_is_named(t), t));

        let base = self.stack.structural_states();
        candidates.into_iter().find(|&candidate| {
            self.simulate(base.clone(), candidate)
                .is_some_and(|top| language.action(top, lookahead).is_some())
        })
    }

    /// State reached after `token` is shifted on a stack of `states`.
    fn simulate(&self, mut states: Vec<StateId>, token: SymbolId) -> Option<StateId> {
        for _ in 0..MAX_SIMULATED_STEPS {
            let top = *states.last()?;
            match self.language.action(top, token)? {
                ParseAction::Shift(next) => return Some(next),
                ParseAction::Reduce {
                    symbol,
                    child_count,
                    ..
                } => {
                    let keep = states.len().checked_sub(child_count as usize)?;
                    if keep == 0 {
                        return None;
                    }
                    states.truncate(keep);
                    let below = *states.last()?;
                    states.push(self.language.goto(below, symbol)?);
                }
                ParseAction::ShiftExtra | ParseAction::Accept => return None,
            }
        }
        None
    }

    fn recover_at_end<T: Tracer + ?Sized>(
        &mut self,
        lookahead: Lookahead,
        tracer: &mut T,
    ) -> Option<Subtree> {
        for depth in 1..self.stack.len() {
            let state = self.stack.state_at_depth(depth);
            if self.language.action(state, SYMBOL_END).is_none() {
                continue;
            }
            tracer.trace_recover(depth, SYMBOL_END);
            let discarded = self.stack.pop_entries(depth);
            self.stack
                .push_extra(Subtree::error_node(&self.language, discarded));
            self.lookahead = Some(lookahead);
            return None;
        }

        tracer.trace_recover(self.stack.len() - 1, SYMBOL_END);
        let mut children = self.stack.take_all();
        let mut eof = lookahead.tree;
        eof.data_mut().extra = true;
        children.push(eof);
        let mut root = Subtree::error_node(&self.language, children);
        root.data_mut().extra = false;
        Some(root)
    }

    /// Wraps an unexpected token in an ERROR node, merging with an ERROR node
    /// directly below it.
    fn skip(&mut self, token: Subtree) {
        let previous = self
            .stack
            .top_subtree()
            .filter(|top| top.is_error() && top.is_extra())
            .is_some();
        let mut children = Vec::new();
        if previous && let Some(top) = self.stack.pop() {
            if top.is_token() {
                children.push(top);
            } else {
                children.extend(top.children().iter().cloned());
            }
        }
        children.push(token);

        let lone_error_leaf =
            matches!(children.as_slice(), [only] if only.is_error() && only.is_token());
        let error = if lone_error_leaf {
            let mut leaf = children.swap_remove(0);
            leaf.data_mut().extra = true;
            leaf
        } else {
            Subtree::error_node(&self.language, children)
        };
        self.stack.push_extra(error);
    }
}
