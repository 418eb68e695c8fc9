use std::fmt::Write as _;
use std::io::{self, Write};
use std::ops::Range;
use std::path::PathBuf;

use serde::Serialize;
use thicket_core::{Colors, Point};
use thicket_query::{Query, QueryCapture, QueryCursor, QueryMatch};
use thicket_runtime::{Language, Tree};

use super::parse::escape_string;
use super::run_common::{CliError, SourceInput, check_range, new_parser, read_text};

pub struct QueryArgs {
    pub source: SourceInput,
    pub query_text: Option<String>,
    pub query_file: Option<PathBuf>,
    pub captures: bool,
    pub json: bool,
    pub match_limit: Option<u32>,
    pub range: Option<Range<usize>>,
    pub color: bool,
}

/// What to print for each run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Matches,
    Captures,
    Json,
}

pub fn run(args: QueryArgs) -> Result<(), CliError> {
    let (query_source, query_path) = match (&args.query_text, &args.query_file) {
        (Some(text), _) => (text.clone(), "<query>".to_owned()),
        (None, Some(path)) => (read_text(path)?, path.display().to_string()),
        (None, None) => return Err(CliError::MissingQuery),
    };
    let source = args.source.load()?;
    let language = args.source.language()?;

    let query = compile_query(&language, &query_source, &query_path, args.color)?;

    let tree = new_parser(&language)?
        .parse(&source, None)
        .ok_or_else(|| CliError::ParseFailed(args.source.display_name()))?;
    if let Some(range) = &args.range {
        check_range(&source, range)?;
    }

    let mode = if args.json {
        OutputMode::Json
    } else if args.captures {
        OutputMode::Captures
    } else {
        OutputMode::Matches
    };
    let colors = if args.color { Colors::ON } else { Colors::OFF };
    let output = render(&query, &tree, &source, &args, mode, colors)?;

    io::stdout().lock().write_all(output.text.as_bytes())?;
    if output.exceeded_limit {
        eprintln!(
            "{}warning:{} match limit exceeded, some matches were dropped",
            colors.yellow, colors.reset
        );
    }
    Ok(())
}

/// Compiles `source`, rendering any error as an annotated snippet.
pub fn compile_query(
    language: &Language,
    source: &str,
    path: &str,
    color: bool,
) -> Result<Query, CliError> {
    Query::new(language, source)
        .map_err(|e| CliError::Query(e.printer(source).path(path).colored(color).render()))
}

pub struct Output {
    pub text: String,
    pub exceeded_limit: bool,
}

pub fn render(
    query: &Query,
    tree: &Tree,
    source: &str,
    args: &QueryArgs,
    mode: OutputMode,
    colors: Colors,
) -> Result<Output, CliError> {
    let mut cursor = QueryCursor::new();
    if let Some(limit) = args.match_limit {
        cursor.set_match_limit(limit);
    }
    if let Some(range) = &args.range {
        cursor
            .set_byte_range(range.clone())
            .unwrap_or_else(|_| panic!("reversed range {range:?} passed argument parsing"));
    }
    cursor.exec(query, tree.root_node());

    let printer = MatchPrinter {
        query,
        source,
        colors,
    };
    let text = match mode {
        OutputMode::Matches => {
            let mut out = String::new();
            for m in cursor.matches() {
                printer.write_match(&mut out, &m);
            }
            out
        }
        OutputMode::Captures => {
            let mut out = String::new();
            for (m, index) in cursor.captures() {
                printer.write_capture(&mut out, m.pattern_index, &m.captures[index], "");
            }
            out
        }
        OutputMode::Json => {
            let matches: Vec<JsonMatch> = cursor.matches().map(|m| printer.json(&m)).collect();
            serde_json::to_string_pretty(&matches)? + "\n"
        }
    };

    Ok(Output {
        text,
        exceeded_limit: cursor.did_exceed_match_limit(),
    })
}

#[derive(Debug, Serialize)]
pub struct JsonMatch {
    pub pattern: usize,
    pub captures: Vec<JsonCapture>,
}

#[derive(Debug, Serialize)]
pub struct JsonCapture {
    pub name: String,
    pub kind: String,
    pub start_byte: usize,
    pub end_byte: usize,
    pub start: Point,
    pub end: Point,
    pub text: String,
}

struct MatchPrinter<'a> {
    query: &'a Query,
    source: &'a str,
    colors: Colors,
}

impl MatchPrinter<'_> {
    fn capture_name(&self, capture: &QueryCapture<'_>) -> &str {
        self.query.capture_name_for_id(capture.index).unwrap_or("?")
    }

    fn text(&self, capture: &QueryCapture<'_>) -> &str {
        capture
            .node
            .utf8_text(self.source.as_bytes())
            .unwrap_or("<invalid utf8>")
    }

    fn write_match(&self, out: &mut String, m: &QueryMatch<'_>) {
        let c = &self.colors;
        let _ = writeln!(out, "{}pattern {}{}", c.dim, m.pattern_index, c.reset);
        for capture in &m.captures {
            self.write_capture(out, m.pattern_index, capture, "  ");
        }
    }

    /// `@name kind [r:c-r:c] "text"`, prefixed by the pattern index outside match listings.
    fn write_capture(&self, out: &mut String, pattern: usize, capture: &QueryCapture<'_>, indent: &str) {
        let c = &self.colors;
        let start = capture.node.start_position();
        let end = capture.node.end_position();
        let _ = write!(out, "{indent}");
        if indent.is_empty() {
            let _ = write!(out, "{}{pattern}{} ", c.dim, c.reset);
        }
        let _ = writeln!(
            out,
            "{}@{}{} {}{}{} [{}:{}-{}:{}] \"{}\"",
            c.green,
            self.capture_name(capture),
            c.reset,
            c.blue,
            capture.node.kind(),
            c.reset,
            start.row,
            start.column,
            end.row,
            end.column,
            escape_string(self.text(capture)),
        );
    }

    fn json(&self, m: &QueryMatch<'_>) -> JsonMatch {
        JsonMatch {
            pattern: m.pattern_index,
            captures: m
                .captures
                .iter()
                .map(|capture| JsonCapture {
                    name: self.capture_name(capture).to_owned(),
                    kind: capture.node.kind().to_owned(),
                    start_byte: capture.node.start_byte(),
                    end_byte: capture.node.end_byte(),
                    start: capture.node.start_position(),
                    end: capture.node.end_position(),
                    text: self.text(capture).to_owned(),
                })
                .collect(),
        }
    }
}
