//! Shared argument builders for CLI commands.
//!
//! Each function returns a `clap::Arg` so the same definition can be composed
//! into several commands.

use std::ops::Range;
use std::path::PathBuf;

use clap::{Arg, ArgAction, value_parser};

/// Source file to parse (positional, `-` for stdin).
pub fn source_path_arg() -> Arg {
    Arg::new("source_path")
        .value_name("SOURCE")
        .value_parser(value_parser!(PathBuf))
        .help("Source file to parse (- for stdin)")
}

/// Inline source text (-s/--source).
pub fn source_text_arg() -> Arg {
    Arg::new("source_text")
        .short('s')
        .long("source")
        .value_name("TEXT")
        .conflicts_with("source_path")
        .help("Inline source text")
}

/// Language flag (-l/--lang).
pub fn lang_arg() -> Arg {
    Arg::new("lang")
        .short('l')
        .long("lang")
        .value_name("LANG")
        .help("Language (inferred from extension if not specified)")
}

/// Color output control (--color).
pub fn color_arg() -> Arg {
    Arg::new("color")
        .long("color")
        .value_name("WHEN")
        .default_value("auto")
        .value_parser(["auto", "always", "never"])
        .global(true)
        .help("Colorize output")
}

/// Include anonymous nodes (--raw).
pub fn raw_arg() -> Arg {
    Arg::new("raw")
        .long("raw")
        .action(ArgAction::SetTrue)
        .help("Include anonymous nodes (literals, punctuation)")
}

/// Print parser events (--trace).
pub fn trace_arg() -> Arg {
    Arg::new("trace")
        .long("trace")
        .action(ArgAction::SetTrue)
        .help("Print parser events before the tree")
}

/// Verbosity level (-v, -vv).
pub fn verbose_arg() -> Arg {
    Arg::new("verbose")
        .short('v')
        .action(ArgAction::Count)
        .requires("trace")
        .help("Trace verbosity (-v adds lexed tokens, -vv adds reuse attempts)")
}

/// Graphviz output (--dot).
pub fn dot_arg() -> Arg {
    Arg::new("dot")
        .long("dot")
        .action(ArgAction::SetTrue)
        .help("Print the tree as a Graphviz graph")
}

/// Byte range restriction (--range).
pub fn range_arg(help: &'static str) -> Arg {
    Arg::new("range")
        .long("range")
        .value_name("START..END")
        .value_parser(parse_byte_range)
        .help(help)
}

/// Inline query text (-q/--query).
pub fn query_text_arg() -> Arg {
    Arg::new("query_text")
        .short('q')
        .long("query")
        .value_name("TEXT")
        .help("Inline query text")
}

/// Query file (--query-file).
pub fn query_file_arg() -> Arg {
    Arg::new("query_file")
        .long("query-file")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .conflicts_with("query_text")
        .help("Query file")
}

/// Print the capture stream instead of matches (--captures).
pub fn captures_arg() -> Arg {
    Arg::new("captures")
        .long("captures")
        .action(ArgAction::SetTrue)
        .help("Print captures in document order instead of matches")
}

/// JSON output (--json).
pub fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .conflicts_with("captures")
        .help("Print matches as JSON")
}

/// In-progress match limit (--match-limit).
pub fn match_limit_arg() -> Arg {
    Arg::new("match_limit")
        .long("match-limit")
        .value_name("N")
        .value_parser(value_parser!(u32).range(1..))
        .help("Maximum number of in-progress matches")
}

/// Replaced byte range (--replace).
pub fn replace_arg() -> Arg {
    Arg::new("replace")
        .long("replace")
        .value_name("START..END")
        .value_parser(parse_byte_range)
        .required(true)
        .help("Byte range to replace")
}

/// Replacement text (--with).
pub fn with_arg() -> Arg {
    Arg::new("with")
        .long("with")
        .value_name("TEXT")
        .default_value("")
        .help("Replacement text")
}

/// Parses `START..END` into a byte range.
pub fn parse_byte_range(s: &str) -> Result<Range<usize>, String> {
    let (start, end) = s
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got '{s}'"))?;
    let start: usize = start
        .trim()
        .parse()
        .map_err(|_| format!("invalid range start '{start}'"))?;
    let end: usize = end
        .trim()
        .parse()
        .map_err(|_| format!("invalid range end '{end}'"))?;
    if end < start {
        return Err(format!("range end {end} is before start {start}"));
    }
    Ok(start..end)
}
