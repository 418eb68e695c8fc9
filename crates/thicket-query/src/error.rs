//! Query compilation errors and their rendering.

use std::fmt;

use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};
use thicket_core::point_at;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryErrorKind {
    /// Malformed pattern source.
    Syntax,
    /// Node kind the language doesn't have.
    NodeType,
    /// Field name the language doesn't have.
    Field,
    /// Reference to a capture the pattern doesn't declare.
    Capture,
    /// Child or field that can never appear under its parent.
    Structure,
    /// Malformed predicate.
    Predicate,
    /// The language can't be queried.
    Language,
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Syntax => "syntax error",
            Self::NodeType => "invalid node type",
            Self::Field => "invalid field",
            Self::Capture => "invalid capture",
            Self::Structure => "impossible pattern",
            Self::Predicate => "invalid predicate",
            Self::Language => "incompatible language",
        })
    }
}

/// Why a query failed to compile, and where.
///
/// `row` and `column` are zero-based; `column` counts bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {}:{}: {message}", row + 1, column + 1)]
pub struct QueryError {
    pub offset: usize,
    pub row: usize,
    pub column: usize,
    pub kind: QueryErrorKind,
    pub message: String,
    /// Length of the offending text, for rendering.
    pub len: usize,
}

impl QueryError {
    pub(crate) fn new(
        source: &str,
        range: std::ops::Range<usize>,
        kind: QueryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        let offset = range.start.min(source.len());
        let point = point_at(source.as_bytes(), offset);
        Self {
            offset,
            row: point.row,
            column: point.column,
            kind,
            message: message.into(),
            len: range.end.saturating_sub(range.start),
        }
    }

    pub fn printer<'e, 's>(&'e self, source: &'s str) -> ErrorPrinter<'e, 's> {
        ErrorPrinter {
            error: self,
            source,
            path: None,
            colored: false,
        }
    }
}

/// Builder for rendering a [`QueryError`] against its source.
pub struct ErrorPrinter<'e, 's> {
    error: &'e QueryError,
    source: &'s str,
    path: Option<&'s str>,
    colored: bool,
}

impl<'s> ErrorPrinter<'_, 's> {
    pub fn path(mut self, path: &'s str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let error = self.error;
        let span = annotated_span(error.offset, error.len, self.source.len());

        let mut snippet = Snippet::source(self.source)
            .line_start(1)
            .annotation(AnnotationKind::Primary.span(span).label(&error.message));
        if let Some(path) = self.path {
            snippet = snippet.path(path);
        }

        let title = error.kind.to_string();
        let report = [Level::ERROR.primary_title(&title).element(snippet)];

        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };
        renderer.render(&report).to_string()
    }
}

fn annotated_span(offset: usize, len: usize, limit: usize) -> std::ops::Range<usize> {
    if len == 0 {
        return offset..(offset + 1).min(limit);
    }
    offset..(offset + len).min(limit)
}
