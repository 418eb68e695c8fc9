//! Structural diff between an edited tree and its reparse.
//!
//! Both trees are in post-edit coordinates. Pairs of nodes are compared top
//! down: identical subtrees at the same position are skipped, children are
//! matched from both ends by kind and field, and whatever is left in the
//! middle is reported.

use thicket_core::{FieldId, Range};

use crate::node::Node;
use crate::tree::Tree;

pub(crate) fn changed_ranges(old: &Tree, new: &Tree) -> Vec<Range> {
    let mut changes = Vec::new();
    let mut pairs = vec![(old.root_node(), new.root_node())];

    while let Some((a, b)) = pairs.pop() {
        if a.subtree().ptr_eq(b.subtree()) && a.position() == b.position() {
            continue;
        }
        if !same_kind(&a, &b) {
            changes.push(a.range().cover(&b.range()));
            continue;
        }

        let a_children = children(&a);
        let b_children = children(&b);
        if a_children.is_empty() && b_children.is_empty() {
            if a.byte_range() != b.byte_range() {
                changes.push(a.range().cover(&b.range()));
            }
            continue;
        }

        let matches = |x: &(Node<'_>, Option<FieldId>), y: &(Node<'_>, Option<FieldId>)| {
            x.1 == y.1 && same_kind(&x.0, &y.0)
        };

        let mut front = 0;
        while front < a_children.len()
            && front < b_children.len()
            && matches(&a_children[front], &b_children[front])
            && a_children[front].0.start_byte() == b_children[front].0.start_byte()
        {
            front += 1;
        }
        let mut back = 0;
        while back < a_children.len() - front && back < b_children.len() - front {
            let x = &a_children[a_children.len() - 1 - back];
            let y = &b_children[b_children.len() - 1 - back];
            if !matches(x, y) || x.0.end_byte() != y.0.end_byte() {
                break;
            }
            back += 1;
        }

        for i in 0..front {
            pairs.push((a_children[i].0, b_children[i].0));
        }
        for i in 0..back {
            pairs.push((
                a_children[a_children.len() - 1 - i].0,
                b_children[b_children.len() - 1 - i].0,
            ));
        }

        let middle = a_children[front..a_children.len() - back]
            .iter()
            .chain(&b_children[front..b_children.len() - back])
            .map(|(node, _)| node.range())
            .reduce(|acc, range| acc.cover(&range));
        if let Some(range) = middle {
            changes.push(range);
        }
    }

    for range in range_differences(&old.included_ranges(), &new.included_ranges()) {
        changes.push(range);
    }
    normalize(changes)
}

fn same_kind(a: &Node<'_>, b: &Node<'_>) -> bool {
    a.kind_id() == b.kind_id() && a.is_missing() == b.is_missing() && a.is_extra() == b.is_extra()
}

fn children<'tree>(node: &Node<'tree>) -> Vec<(Node<'tree>, Option<FieldId>)> {
    node.visible_children().map(|c| (c.node, c.field)).collect()
}

/// Included ranges present in only one of the two lists.
fn range_differences(old: &[Range], new: &[Range]) -> Vec<Range> {
    old.iter()
        .filter(|r| !new.contains(r))
        .chain(new.iter().filter(|r| !old.contains(r)))
        .copied()
        .collect()
}

/// Sorts by start and merges ranges that overlap or touch.
fn normalize(mut ranges: Vec<Range>) -> Vec<Range> {
    ranges.sort_by_key(|r| (r.start_byte, r.end_byte));
    let mut merged: Vec<Range> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start_byte <= last.end_byte => *last = last.cover(&range),
            _ => merged.push(range),
        }
    }
    merged
}
