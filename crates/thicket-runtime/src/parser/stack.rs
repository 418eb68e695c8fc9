//! The LR parse stack.

use thicket_core::StateId;

use crate::invariants::ensure_stack_depth;
use crate::length::Length;
use crate::subtree::Subtree;

#[derive(Clone)]
pub(crate) struct StackEntry {
    pub state: StateId,
    /// `None` only for the bottom entry.
    pub subtree: Option<Subtree>,
    /// Document position after this entry.
    pub position: Length,
}

#[derive(Clone)]
pub(crate) struct Stack {
    entries: Vec<StackEntry>,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            entries: vec![StackEntry {
                state: 0,
                subtree: None,
                position: Length::ZERO,
            }],
        }
    }

    fn top(&self) -> &StackEntry {
        // The bottom entry is never popped.
        &self.entries[self.entries.len() - 1]
    }

    pub fn state(&self) -> StateId {
        self.top().state
    }

    pub fn position(&self) -> Length {
        self.top().position
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn top_subtree(&self) -> Option<&Subtree> {
        self.top().subtree.as_ref()
    }

    /// State of the entry `depth` entries below the top.
    pub fn state_at_depth(&self, depth: usize) -> StateId {
        self.entries[self.entries.len() - 1 - depth].state
    }

    /// States of the non-extra entries, bottom first.
    pub fn structural_states(&self) -> Vec<StateId> {
        self.entries
            .iter()
            .filter(|e| !e.subtree.as_ref().is_some_and(Subtree::is_extra))
            .map(|e| e.state)
            .collect()
    }

    pub fn push(&mut self, subtree: Subtree, state: StateId) {
        let position = self.position() + subtree.total_size();
        self.entries.push(StackEntry {
            state,
            subtree: Some(subtree),
            position,
        });
    }

    /// Pushes an extra without changing the parse state.
    pub fn push_extra(&mut self, subtree: Subtree) {
        let state = self.state();
        self.push(subtree, state);
    }

    pub fn pop(&mut self) -> Option<Subtree> {
        if self.entries.len() <= 1 {
            return None;
        }
        self.entries.pop().and_then(|e| e.subtree)
    }

    /// Pops the top `count` entries, returning their subtrees in document order.
    pub fn pop_entries(&mut self, count: usize) -> Vec<Subtree> {
        ensure_stack_depth(self.entries.len() - 1, count);
        let start = self.entries.len() - count;
        self.entries
            .drain(start..)
            .filter_map(|e| e.subtree)
            .collect()
    }

    /// Pops the children of a reduction: `child_count` non-extra entries and the
    /// extras between them. Extras above the last child are returned separately
    /// so they can be pushed back on top of the reduced node.
    pub fn pop_reduce(&mut self, child_count: usize) -> (Vec<Subtree>, Vec<Subtree>) {
        let mut trailing = Vec::new();
        if child_count > 0 {
            while self.top_subtree().is_some_and(Subtree::is_extra) {
                trailing.extend(self.pop());
            }
        }

        let mut children = Vec::with_capacity(child_count);
        let mut structural = 0;
        while structural < child_count {
            ensure_stack_depth(self.entries.len() - 1, 1);
            let Some(subtree) = self.pop() else {
                break;
            };
            if !subtree.is_extra() {
                structural += 1;
            }
            children.push(subtree);
        }

        children.reverse();
        trailing.reverse();
        (children, trailing)
    }

    /// All subtrees above the bottom entry, in document order; leaves the stack empty.
    pub fn take_all(&mut self) -> Vec<Subtree> {
        let count = self.entries.len() - 1;
        self.pop_entries(count)
    }
}
