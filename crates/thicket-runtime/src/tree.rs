//! Immutable parse results.

use std::fmt;
use std::io::{self, Write};

use thicket_core::{InputEdit, Language, Range};

use crate::changed_ranges;
use crate::cursor::TreeCursor;
use crate::length::Length;
use crate::node::Node;
use crate::subtree::Subtree;

/// A syntax tree. Cloning is cheap and shares every subtree.
#[derive(Clone)]
pub struct Tree {
    root: Subtree,
    language: Language,
    included_ranges: Vec<Range>,
}

impl Tree {
    pub(crate) fn new(root: Subtree, language: Language, included_ranges: Vec<Range>) -> Self {
        Self {
            root,
            language,
            included_ranges,
        }
    }

    pub(crate) fn root(&self) -> &Subtree {
        &self.root
    }

    pub fn root_node(&self) -> Node<'_> {
        Node::new(self, &self.root, Length::ZERO)
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn included_ranges(&self) -> Vec<Range> {
        self.included_ranges.clone()
    }

    pub fn walk(&self) -> TreeCursor<'_> {
        self.root_node().walk()
    }

    /// Records `edit` so that a following parse can reuse the untouched parts.
    ///
    /// Subtrees on the edited path are copied; other holders of the old
    /// subtrees keep seeing the original positions.
    pub fn edit(&mut self, edit: &InputEdit) {
        self.root.edit(edit);
        for range in &mut self.included_ranges {
            adjust_range(range, edit);
        }
    }

    /// Ranges whose syntactic structure differs between `self` (edited) and
    /// `new_tree`, the result of reparsing it.
    pub fn changed_ranges(&self, new_tree: &Tree) -> Vec<Range> {
        changed_ranges::changed_ranges(self, new_tree)
    }

    /// Writes every subtree, hidden ones included, as a Graphviz digraph.
    pub fn print_dot_graph(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "digraph tree {{")?;
        writeln!(out, "  edge [arrowhead=none]")?;

        let mut next_id = 0usize;
        let mut stack: Vec<(&Subtree, Length, Option<usize>)> =
            vec![(&self.root, Length::ZERO, None)];
        while let Some((subtree, position, parent)) = stack.pop() {
            let id = next_id;
            next_id += 1;

            let start = position + subtree.padding();
            let end = start + subtree.size();
            let name = escape(self.language.symbol_name(subtree.symbol()));
            let mut attrs = String::new();
            if !subtree.is_visible() {
                attrs.push_str(", fontcolor=gray");
            }
            if subtree.is_extra() {
                attrs.push_str(", style=dashed");
            }
            if subtree.is_missing() {
                attrs.push_str(", color=red");
            }
            writeln!(
                out,
                "  tree_{id} [label=\"{name}\", tooltip=\"range: {}..{}\\nstate: {}\\nerror-cost: {}\\nhas-changes: {}\"{attrs}]",
                start.bytes,
                end.bytes,
                subtree.parse_state(),
                subtree.error_cost(),
                subtree.has_changes(),
            )?;
            if let Some(parent) = parent {
                writeln!(out, "  tree_{parent} -> tree_{id}")?;
            }

            let mut children = Vec::with_capacity(subtree.child_count());
            let mut child_position = position;
            for child in subtree.children() {
                children.push((child, child_position, Some(id)));
                child_position = child_position + child.total_size();
            }
            stack.extend(children.into_iter().rev());
        }

        writeln!(out, "}}")
    }
}

fn escape(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

fn adjust_range(range: &mut Range, edit: &InputEdit) {
    if range.end_byte >= edit.old_end_byte {
        if range.end_byte != usize::MAX {
            range.end_byte = edit.new_end_byte + (range.end_byte - edit.old_end_byte);
            range.end_point = edit
                .new_end_position
                .advance(range.end_point.extent_from(edit.old_end_position));
        }
    } else if range.end_byte > edit.start_byte {
        range.end_byte = edit.start_byte;
        range.end_point = edit.start_position;
    }

    if range.start_byte >= edit.old_end_byte {
        range.start_byte = edit.new_end_byte + (range.start_byte - edit.old_end_byte);
        range.start_point = edit
            .new_end_position
            .advance(range.start_point.extent_from(edit.old_end_position));
    } else if range.start_byte > edit.start_byte {
        range.start_byte = edit.start_byte;
        range.start_point = edit.start_position;
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{Tree {:?}}}", self.root_node())
    }
}
