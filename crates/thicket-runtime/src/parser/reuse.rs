//! Walks an old tree in document order, offering subtrees for reuse.

use crate::subtree::Subtree;

struct Entry {
    tree: Subtree,
    child_index: usize,
    byte_offset: usize,
}

pub(crate) struct ReusableNode {
    stack: Vec<Entry>,
}

impl ReusableNode {
    /// Starts at the first child of `root`; the root itself is never reused.
    pub fn new(root: Subtree) -> Self {
        let mut node = Self {
            stack: vec![Entry {
                tree: root,
                child_index: 0,
                byte_offset: 0,
            }],
        };
        if !node.descend() {
            node.stack.clear();
        }
        node
    }

    pub fn tree(&self) -> Option<&Subtree> {
        self.stack.last().map(|e| &e.tree)
    }

    /// Start of the current subtree, padding included.
    pub fn byte_offset(&self) -> usize {
        self.stack.last().map_or(usize::MAX, |e| e.byte_offset)
    }

    /// Moves past the current subtree.
    pub fn advance(&mut self) {
        let Some(mut last) = self.stack.pop() else {
            return;
        };
        while let Some(parent) = self.stack.last() {
            // A sibling starts where the popped subtree ends.
            let byte_offset = last.byte_offset + last.tree.total_size().bytes;
            let next = last.child_index + 1;
            if let Some(sibling) = parent.tree.children().get(next) {
                let tree = sibling.clone();
                self.stack.push(Entry {
                    tree,
                    child_index: next,
                    byte_offset,
                });
                return;
            }
            match self.stack.pop() {
                Some(entry) => last = entry,
                None => break,
            }
        }
    }

    /// Moves to the first child of the current subtree.
    pub fn descend(&mut self) -> bool {
        let Some(top) = self.stack.last() else {
            return false;
        };
        let Some(first) = top.tree.children().first() else {
            return false;
        };
        let entry = Entry {
            tree: first.clone(),
            child_index: 0,
            byte_offset: top.byte_offset,
        };
        self.stack.push(entry);
        true
    }
}
