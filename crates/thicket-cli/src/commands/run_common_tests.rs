use std::path::PathBuf;

use super::run_common::{CliError, SourceInput, check_range, new_parser};

fn input(path: Option<&str>, text: Option<&str>, lang: Option<&str>) -> SourceInput {
    SourceInput {
        path: path.map(PathBuf::from),
        text: text.map(str::to_owned),
        lang: lang.map(str::to_owned),
    }
}

#[test]
fn lang_flag_wins_over_extension() {
    let lang = input(Some("data.json"), None, Some("scr")).language().unwrap();
    assert_eq!(lang.name(), "script");
}

#[test]
fn lang_from_extension() {
    assert_eq!(input(Some("app.script"), None, None).language().unwrap().name(), "script");
    assert_eq!(input(Some("page.tpl"), None, None).language().unwrap().name(), "template");
    assert_eq!(input(Some("DATA.JSON"), None, None).language().unwrap().name(), "json");
}

#[test]
fn unresolvable_languages() {
    let err = input(Some("main.rs"), None, None).language().unwrap_err();
    assert_eq!(err.to_string(), "cannot infer language from extension '.rs', use -l/--lang");

    let err = input(None, Some("a = 1;"), None).language().unwrap_err();
    assert_eq!(err.to_string(), "-l/--lang is required (cannot infer from inline source)");

    let err = input(Some("-"), None, None).language().unwrap_err();
    assert!(matches!(err, CliError::LangRequired("stdin")));

    let err = input(None, None, Some("cobol")).language().unwrap_err();
    assert!(matches!(err, CliError::UnknownLang(name) if name == "cobol"));
}

#[test]
fn inline_text_is_loaded() {
    assert_eq!(input(None, Some("a = 1;"), None).load().unwrap(), "a = 1;");
    assert!(matches!(input(None, None, None).load(), Err(CliError::MissingSource)));
}

#[test]
fn missing_file_names_the_path() {
    let err = input(Some("/nonexistent/thicket/app.scr"), None, None)
        .load()
        .unwrap_err();
    assert!(
        err.to_string().starts_with("failed to read '/nonexistent/thicket/app.scr'"),
        "{err}"
    );
}

#[test]
fn display_names() {
    assert_eq!(input(Some("a.scr"), None, None).display_name(), "a.scr");
    assert_eq!(input(Some("-"), None, None).display_name(), "<stdin>");
    assert_eq!(input(None, Some("x"), None).display_name(), "<source>");
}

#[test]
fn ranges_are_checked() {
    assert!(check_range("abc", &(0..3)).is_ok());
    assert!(check_range("abc", &(3..3)).is_ok());
    assert!(matches!(check_range("abc", &(1..4)), Err(CliError::RangeOutOfBounds { len: 3, .. })));
    assert!(matches!(check_range("é", &(1..2)), Err(CliError::RangeNotCharBoundary { .. })));
}

#[test]
fn parser_is_ready() {
    let lang = input(None, None, Some("json")).language().unwrap();
    let mut parser = new_parser(&lang).unwrap();
    assert!(parser.parse("[1]", None).is_some());
}
