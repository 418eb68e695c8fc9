//! Query execution tracing.

use thicket_core::Colors;
use thicket_runtime::Node;

/// Hooks called as a [`QueryCursor`](crate::QueryCursor) moves partial matches along.
pub trait QueryTracer {
    /// A pattern's first node matched `node`.
    fn trace_start(&mut self, pattern: usize, state: u32, node: Node<'_>);

    /// A state consumed `node` at step `step`.
    fn trace_advance(&mut self, pattern: usize, state: u32, step: usize, node: Node<'_>);

    fn trace_finish(&mut self, pattern: usize, state: u32);

    /// The match limit evicted a state.
    fn trace_abandon(&mut self, pattern: usize, state: u32);
}

pub struct NoopQueryTracer;

impl QueryTracer for NoopQueryTracer {
    #[inline(always)]
    fn trace_start(&mut self, _pattern: usize, _state: u32, _node: Node<'_>) {}

    #[inline(always)]
    fn trace_advance(&mut self, _pattern: usize, _state: u32, _step: usize, _node: Node<'_>) {}

    #[inline(always)]
    fn trace_finish(&mut self, _pattern: usize, _state: u32) {}

    #[inline(always)]
    fn trace_abandon(&mut self, _pattern: usize, _state: u32) {}
}

/// Collects one line per event.
pub struct PrintQueryTracer {
    colors: Colors,
    lines: Vec<String>,
}

impl PrintQueryTracer {
    pub fn new(colors: Colors) -> Self {
        Self {
            colors,
            lines: Vec::new(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn print(&self) {
        for line in &self.lines {
            println!("{line}");
        }
    }

    fn node(&self, node: Node<'_>) -> String {
        let c = &self.colors;
        let range = node.byte_range();
        let name = if node.is_named() {
            format!("{}{}{}", c.blue, node.kind(), c.reset)
        } else {
            format!("{}{:?}{}", c.green, node.kind(), c.reset)
        };
        format!("{name} {}{}..{}{}", c.dim, range.start, range.end, c.reset)
    }

    fn push(&mut self, tag: &str, content: String) {
        self.lines.push(format!("  {tag:<8} {content}"));
    }
}

impl QueryTracer for PrintQueryTracer {
    fn trace_start(&mut self, pattern: usize, state: u32, node: Node<'_>) {
        let content = format!("#{state} pattern {pattern} at {}", self.node(node));
        self.push("start", content);
    }

    fn trace_advance(&mut self, pattern: usize, state: u32, step: usize, node: Node<'_>) {
        let content = format!("#{state} pattern {pattern} step {step} on {}", self.node(node));
        self.push("advance", content);
    }

    fn trace_finish(&mut self, pattern: usize, state: u32) {
        let c = self.colors;
        self.lines.push(format!(
            "  {}{:<8}{} #{state} pattern {pattern}",
            c.green, "finish", c.reset
        ));
    }

    fn trace_abandon(&mut self, pattern: usize, state: u32) {
        let c = self.colors;
        self.lines.push(format!(
            "  {}{:<8}{} #{state} pattern {pattern}",
            c.yellow, "abandon", c.reset
        ));
    }
}
