//! ANSI color codes for terminal output.
//!
//! - Blue: node kinds, query patterns
//! - Green: captures, string literals
//! - Red: error nodes
//! - Yellow: missing nodes, recovery events
//! - Dim: spans, field names, structure

/// ANSI color palette for trees, traces and query output.
///
/// Uses only standard 16-color ANSI codes so output reads on light and dark themes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Colors {
    pub blue: &'static str,
    pub green: &'static str,
    pub red: &'static str,
    pub yellow: &'static str,
    pub dim: &'static str,
    pub reset: &'static str,
}

impl Default for Colors {
    fn default() -> Self {
        Self::OFF
    }
}

impl Colors {
    pub const ON: Self = Self {
        blue: "\x1b[34m",
        green: "\x1b[32m",
        red: "\x1b[31m",
        yellow: "\x1b[33m",
        dim: "\x1b[2m",
        reset: "\x1b[0m",
    };

    pub const OFF: Self = Self {
        blue: "",
        green: "",
        red: "",
        yellow: "",
        dim: "",
        reset: "",
    };

    pub fn new(enabled: bool) -> Self {
        if enabled { Self::ON } else { Self::OFF }
    }

    pub fn is_enabled(&self) -> bool {
        !self.reset.is_empty()
    }

    /// Wraps `text` in `color` and a reset, or returns it as-is when colors are off.
    pub fn paint(&self, color: &str, text: &str) -> String {
        if color.is_empty() {
            text.to_owned()
        } else {
            format!("{color}{text}{}", self.reset)
        }
    }
}
