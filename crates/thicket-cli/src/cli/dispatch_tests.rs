//! Tests for CLI dispatch logic: argument validation and params extraction.

use std::path::PathBuf;

use super::args::parse_byte_range;
use super::commands::{edit_command, parse_command, query_command};
use super::*;
use crate::commands::query::QueryArgs;

#[test]
fn parse_params_from_flags() {
    let m = parse_command()
        .try_get_matches_from(["parse", "app.scr", "--raw", "--trace", "-vv", "--range", "3..9"])
        .unwrap();
    let params = ParseParams::from_matches(&m);

    assert_eq!(params.source.source_path, Some(PathBuf::from("app.scr")));
    assert!(params.raw);
    assert!(params.trace);
    assert_eq!(params.verbose, 2);
    assert!(!params.dot);
    assert_eq!(params.range, Some(3..9));
    assert_eq!(params.color, ColorChoice::Auto);
}

#[test]
fn verbose_requires_trace() {
    let result = parse_command().try_get_matches_from(["parse", "app.scr", "-v"]);
    assert!(result.is_err());
}

#[test]
fn source_text_conflicts_with_path() {
    let result = parse_command().try_get_matches_from(["parse", "app.scr", "-s", "a = 1;"]);
    assert!(result.is_err());
}

#[test]
fn global_color_reaches_subcommands() {
    let m = build_cli()
        .try_get_matches_from(["thicket", "--color", "never", "parse", "-s", "a;", "-l", "script"])
        .unwrap();
    let Some(("parse", sub)) = m.subcommand() else {
        panic!("expected parse subcommand");
    };
    let params = ParseParams::from_matches(sub);

    assert_eq!(params.color, ColorChoice::Never);
    assert_eq!(params.source.source_text.as_deref(), Some("a;"));
    assert_eq!(params.source.lang.as_deref(), Some("script"));
}

#[test]
fn color_after_subcommand() {
    let m = build_cli()
        .try_get_matches_from(["thicket", "langs", "--color", "always"])
        .unwrap();
    let Some(("langs", sub)) = m.subcommand() else {
        panic!("expected langs subcommand");
    };
    assert_eq!(sub.get_one::<String>("color").map(String::as_str), Some("always"));
}

#[test]
fn query_params_into_args() {
    let m = query_command()
        .try_get_matches_from([
            "query",
            "app.scr",
            "-q",
            "(identifier) @id",
            "--captures",
            "--match-limit",
            "8",
        ])
        .unwrap();
    let args: QueryArgs = QueryParams::from_matches(&m).into();

    assert_eq!(args.source.path, Some(PathBuf::from("app.scr")));
    assert_eq!(args.query_text.as_deref(), Some("(identifier) @id"));
    assert_eq!(args.query_file, None);
    assert!(args.captures);
    assert!(!args.json);
    assert_eq!(args.match_limit, Some(8));
    assert_eq!(args.range, None);
}

#[test]
fn query_sources_conflict() {
    let result = query_command().try_get_matches_from([
        "query",
        "app.scr",
        "-q",
        "(identifier)",
        "--query-file",
        "q.scm",
    ]);
    assert!(result.is_err());

    let result = query_command().try_get_matches_from(["query", "app.scr", "-q", "(x)", "--json", "--captures"]);
    assert!(result.is_err());
}

#[test]
fn match_limit_must_be_positive() {
    let result = query_command().try_get_matches_from(["query", "a.scr", "-q", "(x)", "--match-limit", "0"]);
    assert!(result.is_err());
}

#[test]
fn edit_requires_replace() {
    assert!(edit_command().try_get_matches_from(["edit", "a.scr", "--with", "x"]).is_err());

    let m = edit_command()
        .try_get_matches_from(["edit", "a.scr", "--replace", "2..4"])
        .unwrap();
    let params = EditParams::from_matches(&m);
    assert_eq!(params.replace, 2..4);
    assert_eq!(params.with, "");
}

#[test]
fn byte_ranges() {
    assert_eq!(parse_byte_range("0..0"), Ok(0..0));
    assert_eq!(parse_byte_range(" 4 .. 10 "), Ok(4..10));
    assert_eq!(
        parse_byte_range("10..4"),
        Err("range end 4 is before start 10".to_owned())
    );
    assert_eq!(
        parse_byte_range("4-10"),
        Err("expected START..END, got '4-10'".to_owned())
    );
    assert_eq!(
        parse_byte_range("a..1"),
        Err("invalid range start 'a'".to_owned())
    );
}

#[test]
fn help_shows_examples() {
    let help = query_command().render_help().to_string();
    assert!(help.contains("EXAMPLES:"));
    assert!(help.contains("--query-file"));
}
