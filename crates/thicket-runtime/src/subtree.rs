//! Persistent syntax subtrees.
//!
//! A [`Subtree`] is a reference-counted, immutable-once-shared node. Trees share
//! subtrees freely; edits copy only the spine leading to the edited region
//! (`Arc::make_mut`), so cloning a whole tree is O(1).
//!
//! Positions are relative: each subtree stores its `padding` (the whitespace and
//! gaps before it) and its `size`. Absolute positions are recovered by summing
//! over preceding siblings while walking down from the root.

use std::sync::Arc;

use thicket_core::{InputEdit, Language, STATE_NONE, SYMBOL_ERROR, StateId, SymbolId};

use crate::length::Length;

pub(crate) const ERROR_COST_PER_RECOVERY: u32 = 500;
pub(crate) const ERROR_COST_PER_MISSING_TREE: u32 = 110;
pub(crate) const ERROR_COST_PER_SKIPPED_TREE: u32 = 100;
pub(crate) const ERROR_COST_PER_SKIPPED_CHAR: u32 = 1;

#[derive(Clone)]
pub(crate) struct Subtree(Arc<SubtreeData>);

#[derive(Clone)]
pub(crate) struct SubtreeData {
    pub symbol: SymbolId,
    pub padding: Length,
    pub size: Length,
    /// Bytes past the end that were examined while building this subtree.
    pub lookahead_bytes: usize,
    /// State the subtree was pushed on; `STATE_NONE` when unknown.
    pub parse_state: StateId,
    pub lex_mode: u16,
    pub production: u16,
    pub visible: bool,
    pub named: bool,
    pub extra: bool,
    pub missing: bool,
    pub has_changes: bool,
    /// Lexed with the current state's valid tokens after the full token set failed.
    pub fallback: bool,
    pub token: bool,
    pub error_cost: u32,
    pub visible_child_count: u32,
    pub named_child_count: u32,
    pub children: Vec<Subtree>,
}

impl Drop for SubtreeData {
    // Long sibling chains would otherwise recurse once per level.
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(Subtree(child)) = stack.pop() {
            if let Ok(mut data) = Arc::try_unwrap(child) {
                stack.append(&mut data.children);
            }
        }
    }
}

pub(crate) struct LeafSpec {
    pub symbol: SymbolId,
    pub padding: Length,
    pub size: Length,
    pub lookahead_bytes: usize,
    pub parse_state: StateId,
    pub lex_mode: u16,
}

impl Subtree {
    pub fn leaf(language: &Language, spec: LeafSpec) -> Self {
        let is_error = spec.symbol == SYMBOL_ERROR;
        let error_cost = if is_error {
            ERROR_COST_PER_RECOVERY
                + ERROR_COST_PER_SKIPPED_CHAR * (spec.padding.bytes + spec.size.bytes) as u32
        } else {
            0
        };
        Self(Arc::new(SubtreeData {
            symbol: spec.symbol,
            padding: spec.padding,
            size: spec.size,
            lookahead_bytes: spec.lookahead_bytes,
            parse_state: spec.parse_state,
            lex_mode: spec.lex_mode,
            production: 0,
            visible: is_error || language.symbol_is_visible(spec.symbol),
            named: is_error || language.symbol_is_named(spec.symbol),
            extra: false,
            missing: false,
            has_changes: false,
            fallback: false,
            token: true,
            error_cost,
            visible_child_count: 0,
            named_child_count: 0,
            children: Vec::new(),
        }))
    }

    /// Zero-width token inserted by error recovery.
    pub fn missing_leaf(language: &Language, symbol: SymbolId, parse_state: StateId) -> Self {
        let mut leaf = Self::leaf(
            language,
            LeafSpec {
                symbol,
                padding: Length::ZERO,
                size: Length::ZERO,
                lookahead_bytes: 1,
                parse_state,
                lex_mode: language.lex_mode(parse_state),
            },
        );
        let data = leaf.data_mut();
        data.missing = true;
        data.error_cost = ERROR_COST_PER_MISSING_TREE + ERROR_COST_PER_RECOVERY;
        leaf
    }

    pub fn node(
        language: &Language,
        symbol: SymbolId,
        children: Vec<Subtree>,
        production: u16,
        parse_state: StateId,
    ) -> Self {
        let is_error = symbol == SYMBOL_ERROR;
        let mut data = SubtreeData {
            symbol,
            padding: Length::ZERO,
            size: Length::ZERO,
            lookahead_bytes: 0,
            parse_state,
            lex_mode: 0,
            production,
            visible: is_error || language.symbol_is_visible(symbol),
            named: is_error || language.symbol_is_named(symbol),
            extra: false,
            missing: false,
            has_changes: false,
            fallback: false,
            token: false,
            error_cost: 0,
            visible_child_count: 0,
            named_child_count: 0,
            children,
        };
        data.summarize();
        Self(Arc::new(data))
    }

    /// ERROR node wrapping skipped or discarded content. Always extra.
    pub fn error_node(language: &Language, children: Vec<Subtree>) -> Self {
        let mut node = Self::node(language, SYMBOL_ERROR, children, 0, STATE_NONE);
        node.data_mut().extra = true;
        node
    }

    pub fn data_mut(&mut self) -> &mut SubtreeData {
        Arc::make_mut(&mut self.0)
    }

    pub fn ptr_eq(&self, other: &Subtree) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.0) == 1
    }

    /// Stable identity of the shared allocation.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn symbol(&self) -> SymbolId {
        self.0.symbol
    }

    pub fn padding(&self) -> Length {
        self.0.padding
    }

    pub fn size(&self) -> Length {
        self.0.size
    }

    pub fn total_size(&self) -> Length {
        self.0.padding + self.0.size
    }

    pub fn lookahead_bytes(&self) -> usize {
        self.0.lookahead_bytes
    }

    pub fn parse_state(&self) -> StateId {
        self.0.parse_state
    }

    pub fn lex_mode(&self) -> u16 {
        self.0.lex_mode
    }

    pub fn production(&self) -> u16 {
        self.0.production
    }

    pub fn is_visible(&self) -> bool {
        self.0.visible
    }

    pub fn is_named(&self) -> bool {
        self.0.named
    }

    pub fn is_extra(&self) -> bool {
        self.0.extra
    }

    pub fn is_missing(&self) -> bool {
        self.0.missing
    }

    pub fn is_fallback(&self) -> bool {
        self.0.fallback
    }

    pub fn has_changes(&self) -> bool {
        self.0.has_changes
    }

    pub fn is_error(&self) -> bool {
        self.0.symbol == SYMBOL_ERROR
    }

    pub fn has_error(&self) -> bool {
        self.0.error_cost > 0
    }

    pub fn error_cost(&self) -> u32 {
        self.0.error_cost
    }

    pub fn children(&self) -> &[Subtree] {
        &self.0.children
    }

    pub fn child_count(&self) -> usize {
        self.0.children.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.0.children.is_empty()
    }

    /// Produced by the lexer or by recovery, as opposed to a reduction.
    pub fn is_token(&self) -> bool {
        self.0.token
    }

    pub fn visible_child_count(&self) -> u32 {
        self.0.visible_child_count
    }

    pub fn named_child_count(&self) -> u32 {
        self.0.named_child_count
    }

    /// Leftmost token, skipping reductions of empty productions.
    pub fn first_leaf(&self) -> Option<&Subtree> {
        let mut stack = vec![self];
        while let Some(tree) = stack.pop() {
            if tree.is_token() {
                return Some(tree);
            }
            stack.extend(tree.children().iter().rev());
        }
        None
    }

    /// Marks subtrees touched by `edit` and shifts the positions of everything after it.
    pub fn edit(&mut self, edit: &InputEdit) {
        let whole = Edit {
            start: Length::new(edit.start_byte, edit.start_position),
            old_end: Length::new(edit.old_end_byte, edit.old_end_position),
            new_end: Length::new(edit.new_end_byte, edit.new_end_position),
        };
        let mut stack: Vec<(&mut Subtree, Edit)> = vec![(self, whole)];

        while let Some((tree, mut edit)) = stack.pop() {
            let is_noop = edit.old_end.bytes == edit.start.bytes
                && edit.start.bytes == edit.new_end.bytes;
            let is_pure_insertion = edit.old_end.bytes == edit.start.bytes;

            let mut padding = tree.padding();
            let mut size = tree.size();
            let total = padding + size;
            let end_byte = total.bytes + tree.lookahead_bytes();
            if edit.start.bytes > end_byte || (is_noop && edit.start.bytes == end_byte) {
                continue;
            }

            if edit.old_end.bytes <= padding.bytes {
                // Entirely inside the padding: only the padding changes.
                padding = edit.new_end + (padding - edit.old_end);
            } else if edit.start.bytes < padding.bytes {
                size = size.saturating_sub(edit.old_end - padding);
                padding = edit.new_end;
            } else if edit.start.bytes < total.bytes
                || (edit.start.bytes == total.bytes && is_pure_insertion)
            {
                size = (edit.new_end - padding) + total.saturating_sub(edit.old_end);
            }

            let data = Arc::make_mut(&mut tree.0);
            data.padding = padding;
            data.size = size;
            data.has_changes = true;

            let mut child_right = Length::ZERO;
            for (index, child) in data.children.iter_mut().enumerate() {
                let child_size = child.total_size();
                let child_left = child_right;
                child_right = child_left + child_size;

                if child_right.bytes + child.lookahead_bytes() < edit.start.bytes {
                    continue;
                }
                if child_left.bytes > edit.old_end.bytes
                    || (child_left.bytes == edit.old_end.bytes && child_size.bytes > 0 && index > 0)
                {
                    break;
                }

                let mut child_edit = Edit {
                    start: edit.start.saturating_sub(child_left),
                    old_end: edit.old_end.saturating_sub(child_left),
                    new_end: edit.new_end.saturating_sub(child_left),
                };
                if edit.old_end.bytes > child_right.bytes {
                    child_edit.old_end = child_size;
                }
                if child_right.bytes > edit.start.bytes
                    || (child_right.bytes == edit.start.bytes && is_pure_insertion)
                {
                    // Inserted text belongs to the first child touching the edit;
                    // later children only lose what was deleted.
                    edit.new_end = edit.start;
                } else {
                    // Ends before the edit and only looked ahead into it: it is
                    // invalidated but keeps its shape.
                    child_edit.old_end = child_edit.start;
                    child_edit.new_end = child_edit.start;
                }
                stack.push((child, child_edit));
            }
        }
    }
}

#[derive(Clone, Copy)]
struct Edit {
    start: Length,
    old_end: Length,
    new_end: Length,
}

impl SubtreeData {
    /// Recomputes size, lookahead, error cost and child counts from the children.
    pub fn summarize(&mut self) {
        let mut total = Length::ZERO;
        let mut lookahead_end = 0usize;
        let mut error_cost = 0u32;
        let mut visible = 0u32;
        let mut named = 0u32;

        for child in &self.children {
            total = total + child.total_size();
            lookahead_end = lookahead_end.max(total.bytes + child.lookahead_bytes());
            error_cost = error_cost.saturating_add(child.error_cost());
            if child.is_visible() {
                visible += 1;
                if child.is_named() {
                    named += 1;
                }
            } else if !child.is_leaf() {
                visible += child.visible_child_count();
                named += child.named_child_count();
            }
        }

        if self.symbol == SYMBOL_ERROR {
            let skipped_trees = self.children.iter().filter(|c| !c.is_extra()).count();
            error_cost = error_cost
                .saturating_add(ERROR_COST_PER_RECOVERY)
                .saturating_add(ERROR_COST_PER_SKIPPED_CHAR * total.bytes as u32)
                .saturating_add(ERROR_COST_PER_SKIPPED_TREE * skipped_trees as u32);
        }

        self.padding = self.children.first().map_or(Length::ZERO, Subtree::padding);
        self.size = total - self.padding;
        self.lookahead_bytes = lookahead_end.saturating_sub(total.bytes);
        self.error_cost = error_cost;
        self.visible_child_count = visible;
        self.named_child_count = named;
    }
}
