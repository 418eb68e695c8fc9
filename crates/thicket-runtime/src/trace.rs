//! Parser tracing.
//!
//! [`NoopTracer`] methods are empty and `#[inline(always)]`, so untraced parses
//! pay nothing. [`PrintTracer`] collects one line per event, resolving symbol
//! names against the language it was created with.

use thicket_core::{Colors, Language, StateId, SymbolId};

/// Which events [`PrintTracer`] keeps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Shifts, reductions, recovery and accept.
    #[default]
    Default,
    /// Adds every lexed token and reused subtree.
    Verbose,
    /// Adds subtrees that were considered for reuse and broken down.
    VeryVerbose,
}

/// Parser instrumentation hooks, called at lex/shift/reduce boundaries.
pub trait Tracer {
    /// A parse starts, or picks up after an interruption.
    fn trace_start(&mut self, resumed: bool);

    /// A token was lexed in `state`.
    fn trace_lex(&mut self, state: StateId, symbol: SymbolId, start_byte: usize, end_byte: usize);

    fn trace_shift(&mut self, symbol: SymbolId, next_state: StateId);

    fn trace_shift_extra(&mut self, symbol: SymbolId);

    fn trace_reduce(&mut self, symbol: SymbolId, child_count: usize, next_state: StateId);

    /// An old subtree was taken as-is.
    fn trace_reuse(&mut self, symbol: SymbolId, start_byte: usize, end_byte: usize);

    /// An old subtree could not be reused whole and is split into its children.
    fn trace_breakdown(&mut self, symbol: SymbolId);

    /// Recovery inserted a zero-width token.
    fn trace_missing(&mut self, symbol: SymbolId);

    /// Recovery skipped an unexpected token.
    fn trace_skip(&mut self, symbol: SymbolId);

    /// Recovery discarded `entries` stack entries to reach a state accepting `symbol`.
    fn trace_recover(&mut self, entries: usize, symbol: SymbolId);

    fn trace_cancel(&mut self, position: usize);

    fn trace_accept(&mut self);
}

/// Tracer that compiles away.
pub struct NoopTracer;

impl Tracer for NoopTracer {
    #[inline(always)]
    fn trace_start(&mut self, _resumed: bool) {}

    #[inline(always)]
    fn trace_lex(&mut self, _state: StateId, _symbol: SymbolId, _start: usize, _end: usize) {}

    #[inline(always)]
    fn trace_shift(&mut self, _symbol: SymbolId, _next_state: StateId) {}

    #[inline(always)]
    fn trace_shift_extra(&mut self, _symbol: SymbolId) {}

    #[inline(always)]
    fn trace_reduce(&mut self, _symbol: SymbolId, _child_count: usize, _next_state: StateId) {}

    #[inline(always)]
    fn trace_reuse(&mut self, _symbol: SymbolId, _start: usize, _end: usize) {}

    #[inline(always)]
    fn trace_breakdown(&mut self, _symbol: SymbolId) {}

    #[inline(always)]
    fn trace_missing(&mut self, _symbol: SymbolId) {}

    #[inline(always)]
    fn trace_skip(&mut self, _symbol: SymbolId) {}

    #[inline(always)]
    fn trace_recover(&mut self, _entries: usize, _symbol: SymbolId) {}

    #[inline(always)]
    fn trace_cancel(&mut self, _position: usize) {}

    #[inline(always)]
    fn trace_accept(&mut self) {}
}

/// Tracer that collects a readable event log.
pub struct PrintTracer {
    language: Language,
    verbosity: Verbosity,
    colors: Colors,
    lines: Vec<String>,
}

impl PrintTracer {
    pub fn new(language: &Language, verbosity: Verbosity, colors: Colors) -> Self {
        Self {
            language: language.clone(),
            verbosity,
            colors,
            lines: Vec::new(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Print all trace lines.
    pub fn print(&self) {
        for line in &self.lines {
            println!("{line}");
        }
    }

    fn name(&self, symbol: SymbolId) -> String {
        let c = &self.colors;
        let name = self.language.symbol_name(symbol);
        if self.language.symbol_is_named(symbol) {
            format!("{}{name}{}", c.blue, c.reset)
        } else {
            format!("{}{name:?}{}", c.green, c.reset)
        }
    }

    fn push(&mut self, tag: &str, content: String) {
        self.lines.push(format!("  {tag:<8} {content}"));
    }

    fn push_warning(&mut self, tag: &str, content: String) {
        let c = self.colors;
        self.lines
            .push(format!("  {}{tag:<8}{} {content}", c.yellow, c.reset));
    }
}

impl Tracer for PrintTracer {
    fn trace_start(&mut self, resumed: bool) {
        let label = if resumed { "resume" } else { "parse" };
        self.lines.push(format!("{label} {}:", self.language.name()));
    }

    fn trace_lex(&mut self, state: StateId, symbol: SymbolId, start_byte: usize, end_byte: usize) {
        if self.verbosity == Verbosity::Default {
            return;
        }
        let dim = self.colors.dim;
        let reset = self.colors.reset;
        let content = format!(
            "{} {dim}{start_byte}..{end_byte} in state {state}{reset}",
            self.name(symbol)
        );
        self.push("lex", content);
    }

    fn trace_shift(&mut self, symbol: SymbolId, next_state: StateId) {
        let content = format!("{} -> {next_state}", self.name(symbol));
        self.push("shift", content);
    }

    fn trace_shift_extra(&mut self, symbol: SymbolId) {
        let content = self.name(symbol);
        self.push("extra", content);
    }

    fn trace_reduce(&mut self, symbol: SymbolId, child_count: usize, next_state: StateId) {
        let content = format!("{} ({child_count}) -> {next_state}", self.name(symbol));
        self.push("reduce", content);
    }

    fn trace_reuse(&mut self, symbol: SymbolId, start_byte: usize, end_byte: usize) {
        if self.verbosity == Verbosity::Default {
            return;
        }
        let content = format!("{} {start_byte}..{end_byte}", self.name(symbol));
        self.push("reuse", content);
    }

    fn trace_breakdown(&mut self, symbol: SymbolId) {
        if self.verbosity != Verbosity::VeryVerbose {
            return;
        }
        let content = self.name(symbol);
        self.push("split", content);
    }

    fn trace_missing(&mut self, symbol: SymbolId) {
        let content = self.name(symbol);
        self.push_warning("missing", content);
    }

    fn trace_skip(&mut self, symbol: SymbolId) {
        let content = self.name(symbol);
        self.push_warning("skip", content);
    }

    fn trace_recover(&mut self, entries: usize, symbol: SymbolId) {
        let content = format!("pop {entries} before {}", self.name(symbol));
        self.push_warning("recover", content);
    }

    fn trace_cancel(&mut self, position: usize) {
        let c = self.colors;
        self.lines
            .push(format!("{}halted{} at byte {position}", c.red, c.reset));
    }

    fn trace_accept(&mut self) {
        self.lines.push("accept".to_owned());
    }
}
