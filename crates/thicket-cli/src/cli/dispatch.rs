//! Dispatch logic: extract params from ArgMatches and convert to command args.
//!
//! `*Params` structs mirror the command `*Args` but keep the unresolved
//! [`ColorChoice`]; `From` impls bridge them to the command handlers.

use std::ops::Range;
use std::path::PathBuf;

use clap::ArgMatches;

use super::ColorChoice;
use crate::commands::edit::EditArgs;
use crate::commands::parse::ParseArgs;
use crate::commands::query::QueryArgs;
use crate::commands::run_common::SourceInput;

pub struct SourceParams {
    pub source_path: Option<PathBuf>,
    pub source_text: Option<String>,
    pub lang: Option<String>,
}

impl SourceParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            source_path: m.get_one::<PathBuf>("source_path").cloned(),
            source_text: m.get_one::<String>("source_text").cloned(),
            lang: m.get_one::<String>("lang").cloned(),
        }
    }
}

impl From<SourceParams> for SourceInput {
    fn from(p: SourceParams) -> Self {
        Self {
            path: p.source_path,
            text: p.source_text,
            lang: p.lang,
        }
    }
}

pub struct ParseParams {
    pub source: SourceParams,
    pub raw: bool,
    pub trace: bool,
    pub verbose: u8,
    pub dot: bool,
    pub range: Option<Range<usize>>,
    pub color: ColorChoice,
}

impl ParseParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            source: SourceParams::from_matches(m),
            raw: m.get_flag("raw"),
            trace: m.get_flag("trace"),
            verbose: m.get_count("verbose"),
            dot: m.get_flag("dot"),
            range: m.get_one::<Range<usize>>("range").cloned(),
            color: parse_color(m),
        }
    }
}

impl From<ParseParams> for ParseArgs {
    fn from(p: ParseParams) -> Self {
        Self {
            source: p.source.into(),
            raw: p.raw,
            trace: p.trace,
            verbose: p.verbose,
            dot: p.dot,
            range: p.range,
            color: p.color.should_colorize(),
        }
    }
}

pub struct QueryParams {
    pub source: SourceParams,
    pub query_text: Option<String>,
    pub query_file: Option<PathBuf>,
    pub captures: bool,
    pub json: bool,
    pub match_limit: Option<u32>,
    pub range: Option<Range<usize>>,
    pub color: ColorChoice,
}

impl QueryParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            source: SourceParams::from_matches(m),
            query_text: m.get_one::<String>("query_text").cloned(),
            query_file: m.get_one::<PathBuf>("query_file").cloned(),
            captures: m.get_flag("captures"),
            json: m.get_flag("json"),
            match_limit: m.get_one::<u32>("match_limit").copied(),
            range: m.get_one::<Range<usize>>("range").cloned(),
            color: parse_color(m),
        }
    }
}

impl From<QueryParams> for QueryArgs {
    fn from(p: QueryParams) -> Self {
        Self {
            source: p.source.into(),
            query_text: p.query_text,
            query_file: p.query_file,
            captures: p.captures,
            json: p.json,
            match_limit: p.match_limit,
            range: p.range,
            color: p.color.should_colorize(),
        }
    }
}

pub struct EditParams {
    pub source: SourceParams,
    pub replace: Range<usize>,
    pub with: String,
    pub color: ColorChoice,
}

impl EditParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            source: SourceParams::from_matches(m),
            replace: m
                .get_one::<Range<usize>>("replace")
                .cloned()
                .unwrap_or_default(),
            with: m.get_one::<String>("with").cloned().unwrap_or_default(),
            color: parse_color(m),
        }
    }
}

impl From<EditParams> for EditArgs {
    fn from(p: EditParams) -> Self {
        Self {
            source: p.source.into(),
            replace: p.replace,
            with: p.with,
            color: p.color.should_colorize(),
        }
    }
}

/// `--color` is global, so it is absent when a subcommand is matched on its own.
fn parse_color(m: &ArgMatches) -> ColorChoice {
    match m.try_get_one::<String>("color").ok().flatten().map(|s| s.as_str()) {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}
