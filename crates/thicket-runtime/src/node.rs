//! Lightweight views into a [`Tree`].
//!
//! A [`Node`] is a copyable `(tree, subtree, position)` triple. Hidden
//! subtrees (helper rules and repetitions) are looked through, so a node's
//! children are its nearest visible descendants.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::Utf8Error;

use thicket_core::{FieldId, InputEdit, Language, Point, Range, SymbolId};

use crate::cursor::TreeCursor;
use crate::length::Length;
use crate::subtree::Subtree;
use crate::tree::Tree;

#[derive(Clone, Copy)]
pub struct Node<'tree> {
    tree: &'tree Tree,
    subtree: &'tree Subtree,
    /// Start of the subtree's padding.
    position: Length,
}

/// Field assigned to the child at `structural_index` of `parent`.
pub(crate) fn field_for(
    language: &Language,
    parent: &Subtree,
    structural_index: usize,
) -> Option<FieldId> {
    if parent.is_error() {
        return None;
    }
    language
        .field_map(parent.production())
        .iter()
        .find(|entry| entry.child_index as usize == structural_index)
        .map(|entry| entry.field)
}

pub(crate) struct VisibleChild<'tree> {
    pub node: Node<'tree>,
    pub field: Option<FieldId>,
}

struct Frame<'tree> {
    parent: &'tree Subtree,
    index: usize,
    structural: usize,
    position: Length,
    inherited: Option<FieldId>,
}

/// Visible children of a node in document order, with their fields.
pub(crate) struct ChildIter<'tree> {
    tree: &'tree Tree,
    stack: Vec<Frame<'tree>>,
}

impl<'tree> Iterator for ChildIter<'tree> {
    type Item = VisibleChild<'tree>;

    fn next(&mut self) -> Option<Self::Item> {
        let language = self.tree.language();
        loop {
            let frame = self.stack.last_mut()?;
            let Some(child) = frame.parent.children().get(frame.index) else {
                self.stack.pop();
                continue;
            };
            let position = frame.position;
            frame.index += 1;
            frame.position = position + child.total_size();

            let field = if child.is_extra() {
                None
            } else {
                let own = field_for(language, frame.parent, frame.structural);
                frame.structural += 1;
                own.or(frame.inherited)
            };

            if child.is_visible() {
                return Some(VisibleChild {
                    node: Node::new(self.tree, child, position),
                    field,
                });
            }
            if child.visible_child_count() > 0 {
                self.stack.push(Frame {
                    parent: child,
                    index: 0,
                    structural: 0,
                    position,
                    inherited: field,
                });
            }
        }
    }
}

impl<'tree> Node<'tree> {
    pub(crate) fn new(tree: &'tree Tree, subtree: &'tree Subtree, position: Length) -> Self {
        Self {
            tree,
            subtree,
            position,
        }
    }

    pub(crate) fn subtree(&self) -> &'tree Subtree {
        self.subtree
    }

    pub(crate) fn position(&self) -> Length {
        self.position
    }

    pub(crate) fn tree(&self) -> &'tree Tree {
        self.tree
    }

    pub(crate) fn visible_children(&self) -> ChildIter<'tree> {
        ChildIter {
            tree: self.tree,
            stack: vec![Frame {
                parent: self.subtree,
                index: 0,
                structural: 0,
                position: self.position,
                inherited: None,
            }],
        }
    }

    /// Address of the underlying subtree; unique among the nodes of one tree.
    pub fn id(&self) -> usize {
        self.subtree.addr()
    }

    pub fn kind(&self) -> &'tree str {
        self.tree.language().symbol_name(self.subtree.symbol())
    }

    pub fn kind_id(&self) -> SymbolId {
        self.subtree.symbol()
    }

    pub fn language(&self) -> &'tree Language {
        self.tree.language()
    }

    pub fn is_named(&self) -> bool {
        self.subtree.is_named()
    }

    /// Zero-width token inserted by error recovery.
    pub fn is_missing(&self) -> bool {
        self.subtree.is_missing()
    }

    pub fn is_extra(&self) -> bool {
        self.subtree.is_extra()
    }

    pub fn is_error(&self) -> bool {
        self.subtree.is_error()
    }

    /// True if this node or any descendant is an error or missing node.
    pub fn has_error(&self) -> bool {
        self.subtree.has_error()
    }

    /// True if the node was touched by an edit since it was parsed.
    pub fn has_changes(&self) -> bool {
        self.subtree.has_changes()
    }

    fn start(&self) -> Length {
        self.position + self.subtree.padding()
    }

    fn end(&self) -> Length {
        self.start() + self.subtree.size()
    }

    pub fn start_byte(&self) -> usize {
        self.start().bytes
    }

    pub fn end_byte(&self) -> usize {
        self.end().bytes
    }

    pub fn start_position(&self) -> Point {
        self.start().extent
    }

    pub fn end_position(&self) -> Point {
        self.end().extent
    }

    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.start_byte()..self.end_byte()
    }

    pub fn range(&self) -> Range {
        let start = self.start();
        let end = self.end();
        Range::new(start.bytes, end.bytes, start.extent, end.extent)
    }

    pub fn child_count(&self) -> usize {
        self.subtree.visible_child_count() as usize
    }

    pub fn named_child_count(&self) -> usize {
        self.subtree.named_child_count() as usize
    }

    pub fn child(&self, index: usize) -> Option<Node<'tree>> {
        self.visible_children().nth(index).map(|c| c.node)
    }

    pub fn named_child(&self, index: usize) -> Option<Node<'tree>> {
        self.visible_children()
            .filter(|c| c.node.is_named())
            .nth(index)
            .map(|c| c.node)
    }

    /// Iterates the children with `cursor`, which is reset to this node.
    pub fn children<'cursor>(
        &self,
        cursor: &'cursor mut TreeCursor<'tree>,
    ) -> impl ExactSizeIterator<Item = Node<'tree>> + 'cursor {
        cursor.reset(*self);
        cursor.goto_first_child();
        (0..self.child_count()).map(move |_| {
            let node = cursor.node();
            cursor.goto_next_sibling();
            node
        })
    }

    pub fn named_children<'cursor>(
        &self,
        cursor: &'cursor mut TreeCursor<'tree>,
    ) -> impl Iterator<Item = Node<'tree>> + 'cursor {
        self.children(cursor).filter(|n| n.is_named())
    }

    pub fn child_by_field_id(&self, field: FieldId) -> Option<Node<'tree>> {
        self.visible_children()
            .find(|c| c.field == Some(field))
            .map(|c| c.node)
    }

    pub fn child_by_field_name(&self, name: &str) -> Option<Node<'tree>> {
        let field = self.tree.language().field_id_for_name(name)?;
        self.child_by_field_id(field)
    }

    /// All children carrying `field`, in document order.
    pub fn children_by_field_id(&self, field: FieldId) -> impl Iterator<Item = Node<'tree>> {
        self.visible_children()
            .filter(move |c| c.field == Some(field))
            .map(|c| c.node)
    }

    pub fn field_name_for_child(&self, index: usize) -> Option<&'tree str> {
        let field = self.visible_children().nth(index)?.field?;
        self.tree.language().field_name_for_id(field)
    }

    /// Nearest visible ancestor, found by walking down from the root.
    ///
    /// The node is identified by its subtree and start, so zero-width nodes on
    /// a boundary between siblings are found in whichever sibling holds them.
    pub fn parent(&self) -> Option<Node<'tree>> {
        let root = self.tree.root_node();
        if *self == root {
            return None;
        }
        let target_start = self.position.bytes;
        let target_end = target_start + self.subtree.total_size().bytes;

        let mut pending = vec![(root.subtree, root.position, root)];
        while let Some((current, position, visible_ancestor)) = pending.pop() {
            let mut child_position = position;
            for child in current.children() {
                let start = child_position;
                child_position = child_position + child.total_size();
                if start.bytes > target_start {
                    break;
                }
                if child.ptr_eq(self.subtree) && start == self.position {
                    return Some(visible_ancestor);
                }
                if child.is_leaf() || child_position.bytes < target_end {
                    continue;
                }
                let ancestor = if child.is_visible() {
                    Node::new(self.tree, child, start)
                } else {
                    visible_ancestor
                };
                pending.push((child, start, ancestor));
            }
        }
        None
    }

    fn siblings(&self) -> Option<(Vec<Node<'tree>>, usize)> {
        let parent = self.parent()?;
        let siblings: Vec<Node<'tree>> = parent.visible_children().map(|c| c.node).collect();
        let index = siblings.iter().position(|s| s == self)?;
        Some((siblings, index))
    }

    pub fn next_sibling(&self) -> Option<Node<'tree>> {
        let (siblings, index) = self.siblings()?;
        siblings.get(index + 1).copied()
    }

    pub fn prev_sibling(&self) -> Option<Node<'tree>> {
        let (siblings, index) = self.siblings()?;
        index.checked_sub(1).and_then(|i| siblings.get(i).copied())
    }

    pub fn next_named_sibling(&self) -> Option<Node<'tree>> {
        let (siblings, index) = self.siblings()?;
        siblings[index + 1..].iter().find(|s| s.is_named()).copied()
    }

    pub fn prev_named_sibling(&self) -> Option<Node<'tree>> {
        let (siblings, index) = self.siblings()?;
        siblings[..index].iter().rev().find(|s| s.is_named()).copied()
    }

    /// First child that ends after `byte`.
    pub fn first_child_for_byte(&self, byte: usize) -> Option<Node<'tree>> {
        self.visible_children()
            .map(|c| c.node)
            .find(|n| n.end_byte() > byte)
    }

    pub fn first_named_child_for_byte(&self, byte: usize) -> Option<Node<'tree>> {
        self.visible_children()
            .map(|c| c.node)
            .find(|n| n.is_named() && n.end_byte() > byte)
    }

    /// Smallest descendant spanning `start..end`.
    pub fn descendant_for_byte_range(&self, start: usize, end: usize) -> Option<Node<'tree>> {
        self.descend_to(|n| (n.start_byte(), n.end_byte()), start, end, false)
    }

    pub fn named_descendant_for_byte_range(
        &self,
        start: usize,
        end: usize,
    ) -> Option<Node<'tree>> {
        self.descend_to(|n| (n.start_byte(), n.end_byte()), start, end, true)
    }

    pub fn descendant_for_point_range(&self, start: Point, end: Point) -> Option<Node<'tree>> {
        self.descend_to(|n| (n.start_position(), n.end_position()), start, end, false)
    }

    pub fn named_descendant_for_point_range(
        &self,
        start: Point,
        end: Point,
    ) -> Option<Node<'tree>> {
        self.descend_to(|n| (n.start_position(), n.end_position()), start, end, true)
    }

    fn descend_to<K: Ord + Copy>(
        &self,
        span: impl Fn(&Node<'tree>) -> (K, K),
        start: K,
        end: K,
        named_only: bool,
    ) -> Option<Node<'tree>> {
        let mut node = *self;
        let mut last_relevant = *self;
        'descend: loop {
            for child in node.visible_children() {
                let (child_start, child_end) = span(&child.node);
                // The child must reach the end of the range and extend past its start.
                if child_end < end || child_end <= start {
                    continue;
                }
                if start < child_start {
                    break;
                }
                node = child.node;
                if !named_only || node.is_named() {
                    last_relevant = node;
                }
                continue 'descend;
            }
            return Some(last_relevant);
        }
    }

    /// S-expression of the named structure, with field labels and MISSING markers.
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        let mut cursor = self.walk();
        let mut open: Vec<bool> = Vec::new();
        loop {
            let node = cursor.node();
            let shown = node.is_named() || node.is_missing();
            if shown {
                if !out.is_empty() {
                    out.push(' ');
                }
                if let Some(field) = cursor.field_name().filter(|_| !open.is_empty()) {
                    out.push_str(field);
                    out.push_str(": ");
                }
                out.push('(');
                if node.is_missing() {
                    out.push_str("MISSING ");
                    if node.is_named() {
                        out.push_str(node.kind());
                    } else {
                        out.push_str(&format!("{:?}", node.kind()));
                    }
                } else {
                    out.push_str(node.kind());
                }
            }
            if cursor.goto_first_child() {
                open.push(shown);
                continue;
            }
            if shown {
                out.push(')');
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return out;
                }
                if open.pop() == Some(true) {
                    out.push(')');
                }
            }
        }
    }

    pub fn utf8_text<'a>(&self, source: &'a [u8]) -> Result<&'a str, Utf8Error> {
        let end = self.end_byte().min(source.len());
        let start = self.start_byte().min(end);
        std::str::from_utf8(&source[start..end])
    }

    /// Shifts this view's position to account for `edit`, as [`Tree::edit`] does for the tree.
    pub fn edit(&mut self, edit: &InputEdit) {
        let old_end = Length::new(edit.old_end_byte, edit.old_end_position);
        let new_end = Length::new(edit.new_end_byte, edit.new_end_position);
        let start = Length::new(edit.start_byte, edit.start_position);
        if self.position.bytes >= old_end.bytes {
            self.position = new_end + (self.position - old_end);
        } else if self.position.bytes > start.bytes {
            self.position = new_end;
        }
    }

    pub fn walk(&self) -> TreeCursor<'tree> {
        TreeCursor::new(*self)
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree)
            && self.subtree.ptr_eq(other.subtree)
            && self.position == other.position
    }
}

impl Eq for Node<'_> {}

impl Hash for Node<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.subtree.addr().hash(state);
        self.position.bytes.hash(state);
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{Node {} ({}, {}) - ({}, {})}}",
            self.kind(),
            self.start_position().row,
            self.start_position().column,
            self.end_position().row,
            self.end_position().column
        )
    }
}
