//! Query execution.
//!
//! A [`QueryCursor`] walks the tree in pre-order once, carrying a set of
//! partial matches ("states"). Entering a node may start new states, advance
//! states whose next step sits at this depth, and drop states whose parent
//! has been left. Quantifiers and alternatives fork states; forks that bind a
//! subset of a sibling's captures are pruned, so repetition is greedy.
//!
//! Matches are reported in the order they complete. Captures are reported in
//! document order: a finished match's capture is held back until no live state
//! could still produce an earlier one.

use std::cmp::Reverse;
use std::collections::VecDeque;
use std::ops::Range;

use thicket_core::{FieldId, Point};
use thicket_runtime::{Node, TreeCursor};

use crate::compile::{Matcher, NodeStep, Pattern, Step};
use crate::query::Query;
use crate::trace::{NoopQueryTracer, QueryTracer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryCapture<'tree> {
    pub node: Node<'tree>,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMatch<'tree> {
    /// Unique within one [`QueryCursor::exec`] run; see [`QueryCursor::remove_match`].
    pub id: u32,
    pub pattern_index: usize,
    pub captures: Vec<QueryCapture<'tree>>,
}

impl<'tree> QueryMatch<'tree> {
    /// Nodes bound to capture `index`, in match order.
    pub fn nodes_for_capture_index(&self, index: u32) -> impl Iterator<Item = Node<'tree>> + '_ {
        self.captures
            .iter()
            .filter(move |c| c.index == index)
            .map(|c| c.node)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("query range ends before it starts")]
pub struct InvalidRangeError;

#[derive(Debug, Clone)]
struct State<'tree> {
    id: u32,
    pattern: usize,
    pc: usize,
    start_depth: usize,
    start_node: Node<'tree>,
    start_order: u64,
    captures: Vec<QueryCapture<'tree>>,
    /// Per relative depth: named siblings that precede the next anchored node.
    anchors: Vec<usize>,
    /// Another state of the same match could still bind more captures.
    has_alternatives: bool,
}

/// A completed match waiting to be handed out.
struct Finished<'tree> {
    m: QueryMatch<'tree>,
    /// Capture indices sorted by position.
    order: Vec<usize>,
    emitted: usize,
}

/// Pre-order walk that knows each node's depth and its named-sibling ordinal.
struct Walk<'tree> {
    cursor: TreeCursor<'tree>,
    depth: usize,
    levels: Vec<Level>,
    started: bool,
}

/// Position of the walk among the children of one ancestor.
struct Level {
    named_before: usize,
    index: usize,
    /// Index of the last sibling that anchors count; `None` when there is none.
    last_counted: Option<usize>,
}

impl<'tree> Walk<'tree> {
    fn new(node: Node<'tree>) -> Self {
        // The start node's siblings are never walked, so its own position is
        // looked up once.
        let last_counted = if is_last_named(node) { None } else { Some(usize::MAX) };
        Self {
            cursor: node.walk(),
            depth: 0,
            levels: vec![Level {
                named_before: 0,
                index: 0,
                last_counted,
            }],
            started: false,
        }
    }

    /// Moves to the next node, skipping the current node's children unless `descend`.
    fn advance(&mut self, descend: bool) -> bool {
        if !self.started {
            self.started = true;
            return true;
        }
        if descend {
            let parent = self.cursor.node();
            if self.cursor.goto_first_child() {
                self.depth += 1;
                self.levels.push(Level {
                    named_before: 0,
                    index: 0,
                    last_counted: last_counted_child(parent),
                });
                return true;
            }
        }
        loop {
            let left = self.cursor.node();
            if self.depth > 0 && self.cursor.goto_next_sibling() {
                if let Some(level) = self.levels.last_mut() {
                    level.index += 1;
                    if counts_for_anchor(left) {
                        level.named_before += 1;
                    }
                }
                return true;
            }
            if self.depth == 0 || !self.cursor.goto_parent() {
                return false;
            }
            self.depth -= 1;
            self.levels.pop();
        }
    }

    fn node(&self) -> Node<'tree> {
        self.cursor.node()
    }

    fn field(&self) -> Option<FieldId> {
        self.cursor.field_id()
    }

    fn named_before(&self) -> usize {
        self.levels.last().map_or(0, |level| level.named_before)
    }

    /// No sibling after the current node counts for anchors.
    fn is_last_named(&self) -> bool {
        self.levels
            .last()
            .is_none_or(|level| level.last_counted.is_none_or(|last| level.index >= last))
    }
}

/// The node the walk just entered.
#[derive(Clone, Copy)]
struct Visit<'tree> {
    node: Node<'tree>,
    depth: usize,
    field: Option<FieldId>,
    named_before: usize,
    is_last_named: bool,
}

/// Runs a [`Query`] over a tree.
///
/// ```ignore
/// let mut cursor = QueryCursor::new();
/// cursor.exec(&query, tree.root_node());
/// for m in cursor.matches() {
///     println!("pattern {} matched {} captures", m.pattern_index, m.captures.len());
/// }
/// ```
pub struct QueryCursor<'q, 'tree, T: QueryTracer = NoopQueryTracer> {
    query: Option<&'q Query>,
    walk: Option<Walk<'tree>>,
    descend: bool,
    last_start: usize,
    states: Vec<State<'tree>>,
    finished: VecDeque<Finished<'tree>>,
    next_id: u32,
    next_order: u64,
    match_limit: u32,
    did_exceed_match_limit: bool,
    byte_range: Option<Range<usize>>,
    point_range: Option<Range<Point>>,
    max_start_depth: Option<usize>,
    tracer: T,
}

impl<'q, 'tree> QueryCursor<'q, 'tree> {
    pub fn new() -> Self {
        Self::with_tracer(NoopQueryTracer)
    }
}

impl Default for QueryCursor<'_, '_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'q, 'tree, T: QueryTracer> QueryCursor<'q, 'tree, T> {
    pub fn with_tracer(tracer: T) -> Self {
        Self {
            query: None,
            walk: None,
            descend: true,
            last_start: 0,
            states: Vec::new(),
            finished: VecDeque::new(),
            next_id: 0,
            next_order: 0,
            match_limit: u32::MAX,
            did_exceed_match_limit: false,
            byte_range: None,
            point_range: None,
            max_start_depth: None,
            tracer,
        }
    }

    pub fn tracer(&self) -> &T {
        &self.tracer
    }

    pub fn into_tracer(self) -> T {
        self.tracer
    }

    /// Starts searching `node` and its descendants, dropping any previous run.
    pub fn exec(&mut self, query: &'q Query, node: Node<'tree>) {
        self.query = Some(query);
        self.walk = Some(Walk::new(node));
        self.descend = true;
        self.last_start = node.start_byte();
        self.states.clear();
        self.finished.clear();
        self.next_id = 0;
        self.next_order = 0;
        self.did_exceed_match_limit = false;
    }

    /// Only nodes intersecting `range` can start a match.
    pub fn set_byte_range(&mut self, range: Range<usize>) -> Result<(), InvalidRangeError> {
        if range.start > range.end {
            return Err(InvalidRangeError);
        }
        self.byte_range = Some(range);
        Ok(())
    }

    pub fn set_point_range(&mut self, range: Range<Point>) -> Result<(), InvalidRangeError> {
        if range.start > range.end {
            return Err(InvalidRangeError);
        }
        self.point_range = Some(range);
        Ok(())
    }

    /// Caps the number of in-progress states; the earliest-started is dropped on overflow.
    pub fn set_match_limit(&mut self, limit: u32) {
        self.match_limit = limit.max(1);
    }

    pub fn match_limit(&self) -> u32 {
        self.match_limit
    }

    pub fn did_exceed_match_limit(&self) -> bool {
        self.did_exceed_match_limit
    }

    /// Matches can only start this many levels below the executed node.
    pub fn set_max_start_depth(&mut self, depth: Option<usize>) {
        self.max_start_depth = depth;
    }

    /// Next complete match, in completion order.
    pub fn next_match(&mut self) -> Option<QueryMatch<'tree>> {
        loop {
            if let Some(finished) = self.finished.pop_front() {
                return Some(finished.m);
            }
            if !self.step() && self.finished.is_empty() {
                return None;
            }
        }
    }

    /// Next capture in document order, with the match it belongs to and its
    /// index into [`QueryMatch::captures`].
    pub fn next_capture(&mut self) -> Option<(QueryMatch<'tree>, usize)> {
        loop {
            if let Some(found) = self.take_ready_capture() {
                return Some(found);
            }
            if self.walk.is_none() {
                return None;
            }
            self.step();
        }
    }

    /// Forgets a match, finished or not, so none of its captures are reported.
    pub fn remove_match(&mut self, id: u32) {
        self.finished.retain(|f| f.m.id != id);
        self.states.retain(|s| s.id != id);
    }

    pub fn matches(&mut self) -> QueryMatches<'_, 'q, 'tree, T> {
        QueryMatches { cursor: self }
    }

    pub fn captures(&mut self) -> QueryCaptures<'_, 'q, 'tree, T> {
        QueryCaptures { cursor: self }
    }

    /// Enters one node. Returns `false` once the walk is over.
    fn step(&mut self) -> bool {
        let Some(query) = self.query else {
            return false;
        };
        let Some(walk) = self.walk.as_mut() else {
            return false;
        };
        if !walk.advance(self.descend) {
            self.finish_walk(query);
            return false;
        }

        let visit = Visit {
            node: walk.node(),
            depth: walk.depth,
            field: walk.field(),
            named_before: walk.named_before(),
            is_last_named: walk.is_last_named(),
        };
        self.last_start = visit.node.start_byte();
        let in_range = self.intersects(visit.node);

        if !in_range && self.is_past_range(visit.node) && !self.has_pending_nodes(query) {
            self.finish_walk(query);
            return false;
        }

        self.advance_states(query, visit);
        self.descend = in_range || self.has_pending_nodes(query);
        if in_range && self.max_start_depth.is_none_or(|max| visit.depth <= max) {
            self.start_states(query, visit);
        }
        self.prune();
        self.collect_finished(query);
        self.enforce_match_limit();
        true
    }

    fn finish_walk(&mut self, query: &Query) {
        self.walk = None;
        self.states
            .retain(|s| matches!(query.patterns[s.pattern].steps[s.pc], Step::Done));
        self.prune();
        self.collect_finished(query);
    }

    fn has_pending_nodes(&self, query: &Query) -> bool {
        self.states
            .iter()
            .any(|s| query.patterns[s.pattern].node_step(s.pc).is_some())
    }

    fn advance_states(&mut self, query: &Query, visit: Visit<'tree>) {
        let mut next = Vec::with_capacity(self.states.len());
        for state in std::mem::take(&mut self.states) {
            let pattern = &query.patterns[state.pattern];
            let Some(step) = pattern.node_step(state.pc) else {
                next.push(state);
                continue;
            };
            let depth = state.start_depth + step.depth;
            if depth > visit.depth {
                // The node this state was inside of has been left.
                continue;
            }
            if depth < visit.depth {
                next.push(state);
                continue;
            }

            let expected = state.anchors[step.depth];
            let counted = usize::from(counts_for_anchor(visit.node));
            if step.immediate && visit.named_before > expected {
                continue;
            }
            let anchored = !step.immediate || visit.named_before == expected;
            if anchored && step_matches(step, visit) {
                self.fork(pattern, &state, visit, &mut next);
            }
            if !step.immediate || visit.named_before + counted <= expected {
                next.push(state);
            }
        }
        self.states = next;
    }

    fn start_states(&mut self, query: &Query, visit: Visit<'tree>) {
        for (index, pattern) in query.patterns.iter().enumerate() {
            if pattern.disabled {
                continue;
            }
            for pc in pattern.closure(0) {
                let Some(step) = pattern.node_step(pc) else {
                    continue;
                };
                if !step_matches(step, visit) {
                    continue;
                }
                let state = State {
                    id: self.fresh_id(),
                    pattern: index,
                    pc,
                    start_depth: visit.depth,
                    start_node: visit.node,
                    start_order: self.next_order,
                    captures: Vec::new(),
                    anchors: vec![0; pattern.max_depth + 1],
                    has_alternatives: false,
                };
                self.next_order += 1;
                self.tracer.trace_start(index, state.id, visit.node);
                let mut forks = Vec::new();
                self.fork(pattern, &state, visit, &mut forks);
                self.states.extend(forks);
            }
        }
    }

    /// Consumes `visit` with the state's current step and queues every successor.
    fn fork(
        &mut self,
        pattern: &Pattern,
        state: &State<'tree>,
        visit: Visit<'tree>,
        out: &mut Vec<State<'tree>>,
    ) {
        let Some(step) = pattern.node_step(state.pc) else {
            return;
        };
        let mut captures = state.captures.clone();
        captures.extend(step.captures.iter().map(|&index| QueryCapture {
            node: visit.node,
            index,
        }));
        let mut anchors = state.anchors.clone();
        anchors[step.depth] = visit.named_before + usize::from(counts_for_anchor(visit.node));
        if let Some(below) = anchors.get_mut(step.depth + 1) {
            *below = 0;
        }

        for pc in pattern.closure(state.pc + 1) {
            let id = self.fresh_id();
            self.tracer
                .trace_advance(state.pattern, id, state.pc, visit.node);
            out.push(State {
                id,
                pc,
                captures: captures.clone(),
                anchors: anchors.clone(),
                has_alternatives: false,
                ..*state
            });
        }
    }

    /// Drops states made redundant by a sibling that binds a superset of
    /// their captures, and flags the ones that must wait for such a sibling.
    fn prune(&mut self) {
        for state in &mut self.states {
            state.has_alternatives = false;
        }

        let mut i = 0;
        while i < self.states.len() {
            let mut removed_i = false;
            let mut j = i + 1;
            while j < self.states.len() {
                let (left, right) = (&self.states[i], &self.states[j]);
                if left.pattern != right.pattern || left.start_node != right.start_node {
                    j += 1;
                    continue;
                }
                let same_step = left.pc == right.pc;
                let left_covers = covers(&left.captures, &right.captures);
                let right_covers = covers(&right.captures, &left.captures);
                if left_covers {
                    if same_step {
                        self.states.remove(j);
                        continue;
                    }
                    self.states[j].has_alternatives = true;
                }
                if right_covers {
                    if same_step {
                        self.states.remove(i);
                        removed_i = true;
                        break;
                    }
                    self.states[i].has_alternatives = true;
                }
                j += 1;
            }
            if !removed_i {
                i += 1;
            }
        }
    }

    fn collect_finished(&mut self, query: &Query) {
        let mut i = 0;
        while i < self.states.len() {
            let state = &self.states[i];
            let done = matches!(query.patterns[state.pattern].steps[state.pc], Step::Done);
            if !done || state.has_alternatives {
                i += 1;
                continue;
            }
            let state = self.states.remove(i);
            self.tracer.trace_finish(state.pattern, state.id);

            let mut order: Vec<usize> = (0..state.captures.len()).collect();
            order.sort_by_key(|&k| position_key(state.captures[k].node));
            self.finished.push_back(Finished {
                m: QueryMatch {
                    id: state.id,
                    pattern_index: state.pattern,
                    captures: state.captures,
                },
                order,
                emitted: 0,
            });
        }
    }

    fn enforce_match_limit(&mut self) {
        while self.states.len() > self.match_limit as usize {
            let Some(earliest) = self
                .states
                .iter()
                .enumerate()
                .min_by_key(|(_, s)| s.start_order)
                .map(|(i, _)| i)
            else {
                break;
            };
            let state = self.states.remove(earliest);
            self.did_exceed_match_limit = true;
            self.tracer.trace_abandon(state.pattern, state.id);
        }
    }

    /// Emits the earliest finished capture if no live state can precede it.
    fn take_ready_capture(&mut self) -> Option<(QueryMatch<'tree>, usize)> {
        self.finished.retain(|f| f.emitted < f.order.len());

        let (slot, node) = self
            .finished
            .iter()
            .enumerate()
            .map(|(slot, f)| (slot, f.m.captures[f.order[f.emitted]].node))
            .min_by_key(|(slot, node)| (position_key(*node), *slot))?;

        if self.walk.is_some() && !self.is_settled(node) {
            return None;
        }

        let finished = &mut self.finished[slot];
        let index = finished.order[finished.emitted];
        finished.emitted += 1;
        let m = finished.m.clone();
        if finished.emitted == finished.order.len() {
            self.finished.remove(slot);
        }
        Some((m, index))
    }

    /// Nothing found later in the walk can sort before `node`.
    fn is_settled(&self, node: Node<'_>) -> bool {
        let key = position_key(node);
        node.start_byte() <= self.last_start
            && self
                .states
                .iter()
                .flat_map(|s| &s.captures)
                .all(|c| key <= position_key(c.node))
    }

    fn intersects(&self, node: Node<'_>) -> bool {
        let bytes = self
            .byte_range
            .as_ref()
            .is_none_or(|r| overlaps(node.start_byte(), node.end_byte(), r.start, r.end));
        let points = self.point_range.as_ref().is_none_or(|r| {
            overlaps(node.start_position(), node.end_position(), r.start, r.end)
        });
        bytes && points
    }

    fn is_past_range(&self, node: Node<'_>) -> bool {
        let bytes = self
            .byte_range
            .as_ref()
            .is_some_and(|r| node.start_byte() >= r.end);
        let points = self
            .point_range
            .as_ref()
            .is_some_and(|r| node.start_position() >= r.end);
        bytes || points
    }

    fn fresh_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn step_matches(step: &NodeStep, visit: Visit<'_>) -> bool {
    let node = visit.node;
    let kind = match step.matcher {
        Matcher::Any => true,
        Matcher::AnyNamed => node.is_named(),
        Matcher::Symbol(symbol) => node.kind_id() == symbol,
        Matcher::Error => node.is_error(),
        Matcher::Missing(None) => node.is_missing(),
        Matcher::Missing(Some(symbol)) => node.is_missing() && node.kind_id() == symbol,
    };
    kind && step.field.is_none_or(|field| visit.field == Some(field))
        && step
            .negated_fields
            .iter()
            .all(|&field| node.child_by_field_id(field).is_none())
        && (!step.last_child || visit.is_last_named)
}

/// Capture order: by start, outer nodes first.
fn position_key(node: Node<'_>) -> (usize, Reverse<usize>) {
    (node.start_byte(), Reverse(node.end_byte()))
}

/// Named, non-extra nodes are the ones anchors count.
fn counts_for_anchor(node: Node<'_>) -> bool {
    node.is_named() && !node.is_extra()
}

fn last_counted_child(parent: Node<'_>) -> Option<usize> {
    let mut cursor = parent.walk();
    if !cursor.goto_first_child() {
        return None;
    }
    let mut last = None;
    let mut index = 0;
    loop {
        if counts_for_anchor(cursor.node()) {
            last = Some(index);
        }
        if !cursor.goto_next_sibling() {
            return last;
        }
        index += 1;
    }
}

fn is_last_named(node: Node<'_>) -> bool {
    let mut next = node.next_named_sibling();
    while let Some(sibling) = next {
        if !sibling.is_extra() {
            return false;
        }
        next = sibling.next_named_sibling();
    }
    true
}

/// Every capture in `small` also appears in `big`.
fn covers(big: &[QueryCapture<'_>], small: &[QueryCapture<'_>]) -> bool {
    small.len() <= big.len() && small.iter().all(|c| big.contains(c))
}

fn overlaps<T: Ord>(start: T, end: T, range_start: T, range_end: T) -> bool {
    if start == end || range_start == range_end {
        start <= range_end && end >= range_start
    } else {
        start < range_end && end > range_start
    }
}

pub struct QueryMatches<'c, 'q, 'tree, T: QueryTracer> {
    cursor: &'c mut QueryCursor<'q, 'tree, T>,
}

impl<'tree, T: QueryTracer> Iterator for QueryMatches<'_, '_, 'tree, T> {
    type Item = QueryMatch<'tree>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next_match()
    }
}

pub struct QueryCaptures<'c, 'q, 'tree, T: QueryTracer> {
    cursor: &'c mut QueryCursor<'q, 'tree, T>,
}

impl<'tree, T: QueryTracer> Iterator for QueryCaptures<'_, '_, 'tree, T> {
    type Item = (QueryMatch<'tree>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next_capture()
    }
}
