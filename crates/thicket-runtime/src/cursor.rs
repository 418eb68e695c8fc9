//! Stateful walker over the visible nodes of a tree.

use thicket_core::FieldId;

use crate::length::Length;
use crate::node::{Node, field_for};
use crate::subtree::Subtree;
use crate::tree::Tree;

#[derive(Clone, Copy)]
struct Entry<'tree> {
    subtree: &'tree Subtree,
    position: Length,
    child_index: usize,
    /// Index among the parent's non-extra children.
    structural_index: usize,
}

/// A cursor never leaves the subtree of the node it was created from.
#[derive(Clone)]
pub struct TreeCursor<'tree> {
    tree: &'tree Tree,
    stack: Vec<Entry<'tree>>,
}

impl<'tree> TreeCursor<'tree> {
    pub(crate) fn new(node: Node<'tree>) -> Self {
        Self {
            tree: node.tree(),
            stack: vec![Self::root_entry(node)],
        }
    }

    fn root_entry(node: Node<'tree>) -> Entry<'tree> {
        Entry {
            subtree: node.subtree(),
            position: node.position(),
            child_index: 0,
            structural_index: 0,
        }
    }

    fn top(&self) -> Entry<'tree> {
        self.stack[self.stack.len() - 1]
    }

    pub fn node(&self) -> Node<'tree> {
        let top = self.top();
        Node::new(self.tree, top.subtree, top.position)
    }

    pub fn reset(&mut self, node: Node<'tree>) {
        self.tree = node.tree();
        self.stack.clear();
        self.stack.push(Self::root_entry(node));
    }

    /// Visible ancestors between the cursor's root and the current node.
    pub fn depth(&self) -> usize {
        let len = self.stack.len();
        self.stack[..len - 1]
            .iter()
            .enumerate()
            .filter(|(i, e)| *i == 0 || e.subtree.is_visible())
            .count()
    }

    pub fn field_id(&self) -> Option<FieldId> {
        let language = self.tree.language();
        let last = self.stack.len() - 1;
        for i in (1..=last).rev() {
            let entry = self.stack[i];
            if i != last && entry.subtree.is_visible() {
                break;
            }
            if entry.subtree.is_extra() {
                break;
            }
            let parent = self.stack[i - 1].subtree;
            if let Some(field) = field_for(language, parent, entry.structural_index) {
                return Some(field);
            }
        }
        None
    }

    pub fn field_name(&self) -> Option<&'tree str> {
        let field = self.field_id()?;
        self.tree.language().field_name_for_id(field)
    }

    /// Pushes the first child of `parent` at or after `from` that is visible or
    /// contains visible nodes. Returns whether that child is itself visible.
    fn push_next_child(
        &mut self,
        parent: Entry<'tree>,
        from: Option<Entry<'tree>>,
    ) -> Option<bool> {
        let (mut index, mut position, mut structural) = match from {
            Some(prev) => (
                prev.child_index + 1,
                prev.position + prev.subtree.total_size(),
                prev.structural_index + usize::from(!prev.subtree.is_extra()),
            ),
            None => (0, parent.position, 0),
        };
        let children = parent.subtree.children();
        while let Some(child) = children.get(index) {
            let entry = Entry {
                subtree: child,
                position,
                child_index: index,
                structural_index: structural,
            };
            if child.is_visible() {
                self.stack.push(entry);
                return Some(true);
            }
            if child.visible_child_count() > 0 {
                self.stack.push(entry);
                return Some(false);
            }
            index += 1;
            position = position + child.total_size();
            structural += usize::from(!child.is_extra());
        }
        None
    }

    pub fn goto_first_child(&mut self) -> bool {
        let saved = self.stack.len();
        loop {
            match self.push_next_child(self.top(), None) {
                Some(true) => return true,
                Some(false) => continue,
                None => {
                    self.stack.truncate(saved);
                    return false;
                }
            }
        }
    }

    pub fn goto_next_sibling(&mut self) -> bool {
        let saved = self.stack.clone();
        while self.stack.len() > 1 {
            let Some(current) = self.stack.pop() else {
                break;
            };
            let parent = self.top();
            match self.push_next_child(parent, Some(current)) {
                Some(true) => return true,
                Some(false) => {
                    // The pushed child has visible descendants.
                    self.goto_first_child();
                    return true;
                }
                None => {}
            }
            if parent.subtree.is_visible() || self.stack.len() == 1 {
                break;
            }
        }
        self.stack = saved;
        false
    }

    pub fn goto_parent(&mut self) -> bool {
        let mut i = self.stack.len() - 1;
        while i > 0 {
            i -= 1;
            if i == 0 || self.stack[i].subtree.is_visible() {
                self.stack.truncate(i + 1);
                return true;
            }
        }
        false
    }

    /// Moves to the first child that ends after `byte`, returning its index
    /// among the visible children.
    pub fn goto_first_child_for_byte(&mut self, byte: usize) -> Option<usize> {
        let saved = self.stack.len();
        let mut visible_index = 0;
        'descend: loop {
            let parent = self.top();
            let mut position = parent.position;
            let mut structural = 0;
            for (index, child) in parent.subtree.children().iter().enumerate() {
                let entry = Entry {
                    subtree: child,
                    position,
                    child_index: index,
                    structural_index: structural,
                };
                position = position + child.total_size();
                structural += usize::from(!child.is_extra());

                if position.bytes > byte {
                    if child.is_visible() {
                        self.stack.push(entry);
                        return Some(visible_index);
                    }
                    if child.visible_child_count() > 0 {
                        self.stack.push(entry);
                        continue 'descend;
                    }
                } else if child.is_visible() {
                    visible_index += 1;
                } else {
                    visible_index += child.visible_child_count() as usize;
                }
            }
            self.stack.truncate(saved);
            return None;
        }
    }
}
