//! Table-driven LR parser with incremental reuse and error recovery.
//!
//! The parser keeps a single stack. Each step takes a lookahead, which is
//! either an old subtree offered by [`ReusableNode`] or a freshly lexed token,
//! and applies the action the tables give for its first leaf. An old
//! non-terminal is shifted whole only when the state after the first leaf's
//! reductions equals the state it was originally built in; otherwise it is
//! split into its children.

mod balance;
mod recover;
mod reuse;
mod stack;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thicket_core::{
    Language, LanguageError, ParseAction, Point, Range, SYMBOL_END, SYMBOL_ERROR, StateId,
    SymbolId,
};

use crate::invariants::ensure_goto;
use crate::lexer::{CallbackSource, InputEncoding, Lexer, SliceSource, Source, Token};
use crate::subtree::{LeafSpec, Subtree};
use crate::trace::{NoopTracer, Tracer};
use crate::tree::Tree;

use reuse::ReusableNode;
use stack::Stack;

/// Interruption checks happen once per this many parse steps.
const CHECK_INTERVAL: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("included range {index} is empty, unsorted or overlaps its predecessor")]
pub struct IncludedRangesError {
    pub index: usize,
}

/// Incremental parser for one language at a time.
#[derive(Default)]
pub struct Parser {
    language: Option<Language>,
    included_ranges: Vec<Range>,
    timeout_micros: u64,
    cancellation_flag: Option<Arc<AtomicBool>>,
    /// Progress of an interrupted parse.
    session: Option<Session>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(&self) -> Option<&Language> {
        self.language.as_ref()
    }

    /// Fails without changing the parser when the language version is unsupported.
    pub fn set_language(&mut self, language: &Language) -> Result<(), LanguageError> {
        if !language.is_compatible() {
            return Err(LanguageError::Version {
                version: language.version(),
            });
        }
        self.language = Some(language.clone());
        self.session = None;
        Ok(())
    }

    /// Restricts parsing to `ranges`; an empty slice means the whole document.
    ///
    /// Ranges must be sorted and must not overlap. On error the previous ranges stay in effect.
    pub fn set_included_ranges(&mut self, ranges: &[Range]) -> Result<(), IncludedRangesError> {
        let mut previous_end = 0;
        for (index, range) in ranges.iter().enumerate() {
            if range.start_byte > range.end_byte || range.start_byte < previous_end {
                return Err(IncludedRangesError { index });
            }
            previous_end = range.end_byte;
        }
        self.included_ranges = ranges.to_vec();
        Ok(())
    }

    pub fn included_ranges(&self) -> Vec<Range> {
        if self.included_ranges.is_empty() {
            vec![Range::FULL]
        } else {
            self.included_ranges.clone()
        }
    }

    /// Zero disables the deadline.
    pub fn set_timeout_micros(&mut self, micros: u64) {
        self.timeout_micros = micros;
    }

    pub fn timeout_micros(&self) -> u64 {
        self.timeout_micros
    }

    pub fn set_cancellation_flag(&mut self, flag: Option<Arc<AtomicBool>>) {
        self.cancellation_flag = flag;
    }

    pub fn cancellation_flag(&self) -> Option<&Arc<AtomicBool>> {
        self.cancellation_flag.as_ref()
    }

    /// Discards the progress of an interrupted parse.
    pub fn reset(&mut self) {
        self.session = None;
    }

    /// Parses `text`, reusing unchanged parts of `old_tree` when it is given.
    ///
    /// `old_tree` must have been edited to match `text`. Returns `None` when no
    /// language is set or the parse was interrupted; calling again with the same
    /// arguments resumes an interrupted parse.
    pub fn parse(&mut self, text: impl AsRef<[u8]>, old_tree: Option<&Tree>) -> Option<Tree> {
        self.parse_traced(text, old_tree, &mut NoopTracer)
    }

    pub fn parse_traced<T: Tracer + ?Sized>(
        &mut self,
        text: impl AsRef<[u8]>,
        old_tree: Option<&Tree>,
        tracer: &mut T,
    ) -> Option<Tree> {
        let mut source = SliceSource(text.as_ref());
        self.run(&mut source, InputEncoding::Utf8, old_tree, tracer)
    }

    pub fn parse_utf16(&mut self, text: &[u16], old_tree: Option<&Tree>) -> Option<Tree> {
        let bytes: Vec<u8> = text.iter().flat_map(|unit| unit.to_le_bytes()).collect();
        let mut source = SliceSource(&bytes);
        self.run(&mut source, InputEncoding::Utf16, old_tree, &mut NoopTracer)
    }

    /// Parses text pulled from `callback`, which returns the bytes starting at
    /// the given offset and point; an empty chunk ends the document.
    pub fn parse_with<T, F>(&mut self, callback: &mut F, old_tree: Option<&Tree>) -> Option<Tree>
    where
        T: AsRef<[u8]>,
        F: FnMut(usize, Point) -> T,
    {
        self.parse_with_encoding(callback, InputEncoding::Utf8, old_tree)
    }

    pub fn parse_with_encoding<T, F>(
        &mut self,
        callback: &mut F,
        encoding: InputEncoding,
        old_tree: Option<&Tree>,
    ) -> Option<Tree>
    where
        T: AsRef<[u8]>,
        F: FnMut(usize, Point) -> T,
    {
        let mut source = CallbackSource::new(callback);
        self.run(&mut source, encoding, old_tree, &mut NoopTracer)
    }

    fn run<T: Tracer + ?Sized>(
        &mut self,
        source: &mut dyn Source,
        encoding: InputEncoding,
        old_tree: Option<&Tree>,
        tracer: &mut T,
    ) -> Option<Tree> {
        let language = self.language.clone()?;
        let ranges = self.included_ranges();

        let resumed = self.session.is_some();
        let mut session = match self.session.take() {
            Some(session) => session,
            None => Session::new(language.clone(), &ranges, old_tree),
        };
        tracer.trace_start(resumed);

        let interrupt = Interrupt {
            flag: self.cancellation_flag.as_deref(),
            deadline: (self.timeout_micros > 0)
                .then(|| Instant::now() + Duration::from_micros(self.timeout_micros)),
        };
        let mut lexer = Lexer::new(source, &language, encoding, &ranges);

        match session.run(&mut lexer, &interrupt, tracer) {
            Some(mut root) => {
                balance::balance(&mut root, &language);
                Some(Tree::new(root, language, ranges))
            }
            None => {
                self.session = Some(session);
                None
            }
        }
    }
}

struct Interrupt<'a> {
    flag: Option<&'a AtomicBool>,
    deadline: Option<Instant>,
}

impl Interrupt<'_> {
    fn should_halt(&self, ops: usize) -> bool {
        if ops % CHECK_INTERVAL != 0 {
            return false;
        }
        self.flag.is_some_and(|f| f.load(Ordering::Relaxed))
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

struct Lookahead {
    tree: Subtree,
    /// Offered by the old tree rather than lexed.
    reused: bool,
}

/// Everything needed to continue a parse after an interruption.
struct Session {
    language: Language,
    stack: Stack,
    lookahead: Option<Lookahead>,
    /// Lookahead displaced by a recovery insertion.
    queued: Option<Lookahead>,
    reusable: Option<ReusableNode>,
    /// Byte spans whose inclusion differs from the old tree's.
    range_changes: Vec<std::ops::Range<usize>>,
    /// Reuse is suspended between an error and the next regular shift.
    recovering: bool,
    missing_at: usize,
    missing_run: usize,
    ops: usize,
}

impl Session {
    fn new(language: Language, ranges: &[Range], old_tree: Option<&Tree>) -> Self {
        let (reusable, range_changes) = match old_tree {
            Some(old) if old.language() == &language => (
                Some(ReusableNode::new(old.root().clone())),
                range_differences(&old.included_ranges(), ranges),
            ),
            _ => (None, Vec::new()),
        };
        Self {
            language,
            stack: Stack::new(),
            lookahead: None,
            queued: None,
            reusable,
            range_changes,
            recovering: false,
            missing_at: usize::MAX,
            missing_run: 0,
            ops: 0,
        }
    }

    fn run<T: Tracer + ?Sized>(
        &mut self,
        lexer: &mut Lexer<'_>,
        interrupt: &Interrupt<'_>,
        tracer: &mut T,
    ) -> Option<Subtree> {
        loop {
            if interrupt.should_halt(self.ops) {
                tracer.trace_cancel(self.stack.position().bytes);
                return None;
            }
            self.ops += 1;

            let state = self.stack.state();
            let lookahead = match self.lookahead.take().or_else(|| self.queued.take()) {
                Some(lookahead) => lookahead,
                None => self.next_lookahead(state, lexer, tracer),
            };
            let leaf_symbol = lookahead
                .tree
                .first_leaf()
                .map_or(lookahead.tree.symbol(), Subtree::symbol);

            match self.language.action(state, leaf_symbol) {
                Some(ParseAction::Shift(next)) if lookahead.tree.is_token() => {
                    self.shift(lookahead, next, tracer);
                }
                Some(ParseAction::ShiftExtra) if lookahead.tree.is_token() => {
                    let mut tree = lookahead.tree;
                    tracer.trace_shift_extra(tree.symbol());
                    if !tree.is_extra() {
                        tree.data_mut().extra = true;
                    }
                    self.finish_shift(&tree, lookahead.reused);
                    self.stack.push_extra(tree);
                }
                Some(ParseAction::Shift(_) | ParseAction::ShiftExtra) => {
                    self.shift_reused_node(state, lookahead, lexer, tracer);
                }
                Some(ParseAction::Reduce {
                    symbol,
                    child_count,
                    production,
                }) => {
                    self.reduce(symbol, child_count as usize, production, &lookahead.tree, tracer);
                    self.lookahead = Some(lookahead);
                }
                Some(ParseAction::Accept) => {
                    tracer.trace_accept();
                    return Some(self.accept(lookahead.tree));
                }
                None if !lookahead.tree.is_token() => {
                    self.break_down(state, lookahead, lexer, tracer);
                }
                None => {
                    if let Some(root) = self.recover(state, lookahead, tracer) {
                        tracer.trace_accept();
                        return Some(root);
                    }
                }
            }
        }
    }

    fn shift<T: Tracer + ?Sized>(&mut self, lookahead: Lookahead, next: StateId, tracer: &mut T) {
        tracer.trace_shift(lookahead.tree.symbol(), next);
        self.finish_shift(&lookahead.tree, lookahead.reused);
        self.stack.push(lookahead.tree, next);
    }

    fn finish_shift(&mut self, tree: &Subtree, reused: bool) {
        if reused && let Some(reusable) = &mut self.reusable {
            reusable.advance();
        }
        if !tree.is_missing() && !tree.is_error() {
            self.recovering = false;
        }
    }

    /// Shifts an old non-terminal whole, or splits it when its start state differs.
    fn shift_reused_node<T: Tracer + ?Sized>(
        &mut self,
        state: StateId,
        lookahead: Lookahead,
        lexer: &mut Lexer<'_>,
        tracer: &mut T,
    ) {
        let symbol = lookahead.tree.symbol();
        let next = (lookahead.tree.parse_state() == state)
            .then(|| self.language.goto(state, symbol))
            .flatten();
        match next {
            Some(next) => {
                let start = self.stack.position() + lookahead.tree.padding();
                let end = start + lookahead.tree.size();
                tracer.trace_reuse(symbol, start.bytes, end.bytes);
                self.finish_shift(&lookahead.tree, true);
                self.stack.push(lookahead.tree, next);
            }
            None => self.break_down(state, lookahead, lexer, tracer),
        }
    }

    fn break_down<T: Tracer + ?Sized>(
        &mut self,
        state: StateId,
        lookahead: Lookahead,
        lexer: &mut Lexer<'_>,
        tracer: &mut T,
    ) {
        tracer.trace_breakdown(lookahead.tree.symbol());
        let descended = lookahead.reused
            && self
                .reusable
                .as_mut()
                .is_some_and(ReusableNode::descend);
        self.lookahead = Some(if descended {
            self.next_lookahead(state, lexer, tracer)
        } else {
            self.lex(state, lexer, tracer)
        });
    }

    fn reduce<T: Tracer + ?Sized>(
        &mut self,
        symbol: SymbolId,
        child_count: usize,
        production: u16,
        lookahead: &Subtree,
        tracer: &mut T,
    ) {
        let (children, trailing) = self.stack.pop_reduce(child_count);
        let below = self.stack.state();
        let start = self.stack.position();

        let mut node = Subtree::node(&self.language, symbol, children, production, below);
        // The reduction was decided by the lookahead, so the node depends on it too.
        let node_end = start + node.total_size();
        let trailing_bytes: usize = trailing.iter().map(|t| t.total_size().bytes).sum();
        let lookahead_end = node_end.bytes
            + trailing_bytes
            + lookahead.total_size().bytes
            + lookahead.lookahead_bytes();
        let data = node.data_mut();
        data.lookahead_bytes = data
            .lookahead_bytes
            .max(lookahead_end - node_end.bytes);

        let next = ensure_goto(&self.language, below, symbol);
        tracer.trace_reduce(symbol, child_count, next);
        self.stack.push(node, next);
        for extra in trailing {
            self.stack.push(extra, next);
        }
    }

    fn accept(&mut self, eof: Subtree) -> Subtree {
        let mut eof = eof;
        if !eof.is_extra() {
            eof.data_mut().extra = true;
        }
        let entries = self.stack.take_all();
        let Some(root_index) = entries.iter().rposition(|s| !s.is_extra()) else {
            let mut children = entries;
            children.push(eof);
            return Subtree::node(&self.language, SYMBOL_ERROR, children, 0, 0);
        };

        let root = &entries[root_index];
        let mut children: Vec<Subtree> = entries[..root_index].to_vec();
        children.extend(root.children().iter().cloned());
        children.extend(entries[root_index + 1..].iter().cloned());
        children.push(eof);
        Subtree::node(&self.language, root.symbol(), children, root.production(), 0)
    }

    fn next_lookahead<T: Tracer + ?Sized>(
        &mut self,
        state: StateId,
        lexer: &mut Lexer<'_>,
        tracer: &mut T,
    ) -> Lookahead {
        if !self.recovering
            && let Some(tree) = self.reusable_subtree(state)
        {
            return Lookahead { tree, reused: true };
        }
        self.lex(state, lexer, tracer)
    }

    /// Advances the old-tree walk to the current position and returns the
    /// subtree starting there, if it may be reused in `state`.
    fn reusable_subtree(&mut self, state: StateId) -> Option<Subtree> {
        let position = self.stack.position().bytes;
        loop {
            let reusable = self.reusable.as_mut()?;
            let start = reusable.byte_offset();
            let node = reusable.tree()?.clone();
            if start > position {
                return None;
            }
            if start < position {
                if start + node.total_size().bytes <= position || !reusable.descend() {
                    reusable.advance();
                }
                continue;
            }

            if self.can_reuse(&node, state, start) {
                return Some(node);
            }
            let reusable = self.reusable.as_mut()?;
            if !reusable.descend() {
                return None;
            }
        }
    }

    fn can_reuse(&self, node: &Subtree, state: StateId, start: usize) -> bool {
        if node.has_changes() || node.has_error() || node.size().bytes == 0 {
            return false;
        }
        if node.symbol() == SYMBOL_END {
            return false;
        }
        let end = start + node.total_size().bytes + node.lookahead_bytes();
        if self
            .range_changes
            .iter()
            .any(|changed| changed.start < end && start < changed.end)
        {
            return false;
        }
        let Some(leaf) = node.first_leaf() else {
            return false;
        };
        if leaf.is_fallback() {
            self.language.lex_mode(state) == leaf.lex_mode()
        } else {
            self.language.is_valid_token(state, leaf.symbol())
        }
    }

    fn lex<T: Tracer + ?Sized>(
        &mut self,
        state: StateId,
        lexer: &mut Lexer<'_>,
        tracer: &mut T,
    ) -> Lookahead {
        let language = &self.language;
        let position = self.stack.position();
        let mut token = lexer.lex(position, &|_| true);
        let mut fallback = false;

        let is_regular = token.symbol != SYMBOL_ERROR && token.symbol != SYMBOL_END;
        if is_regular && !language.is_valid_token(state, token.symbol) {
            let retry = lexer.lex(position, &|symbol| language.is_valid_token(state, symbol));
            if retry.symbol != SYMBOL_ERROR && retry.symbol != SYMBOL_END {
                let scanned = furthest(&token).max(furthest(&retry));
                let retry_end = (retry.padding + retry.size).bytes;
                token = Token {
                    lookahead_bytes: scanned - retry_end,
                    ..retry
                };
                fallback = true;
            }
        }

        let start = position + token.padding;
        tracer.trace_lex(state, token.symbol, start.bytes, (start + token.size).bytes);

        let mut tree = Subtree::leaf(
            language,
            LeafSpec {
                symbol: token.symbol,
                padding: token.padding,
                size: token.size,
                lookahead_bytes: token.lookahead_bytes,
                parse_state: state,
                lex_mode: language.lex_mode(state),
            },
        );
        if fallback {
            tree.data_mut().fallback = true;
        }
        Lookahead {
            tree,
            reused: false,
        }
    }
}

/// End of the examined text, relative to the lex start.
fn furthest(token: &Token) -> usize {
    (token.padding + token.size).bytes + token.lookahead_bytes
}

/// Byte spans covered by ranges present in only one of the lists.
fn range_differences(old: &[Range], new: &[Range]) -> Vec<std::ops::Range<usize>> {
    let mut changes = Vec::new();
    for range in old.iter().filter(|r| !new.contains(r)) {
        changes.push(range.byte_range());
    }
    for range in new.iter().filter(|r| !old.contains(r)) {
        changes.push(range.byte_range());
    }
    changes
}
