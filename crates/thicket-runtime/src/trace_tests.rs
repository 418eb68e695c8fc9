use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thicket_core::Colors;
use thicket_langs::script;

use crate::{NoopTracer, Parser, PrintTracer, Verbosity};

fn trace(text: &str, verbosity: Verbosity) -> Vec<String> {
    let language = script();
    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();
    let mut tracer = PrintTracer::new(&language, verbosity, Colors::OFF);
    parser.parse_traced(text, None, &mut tracer).unwrap();
    tracer.lines().to_vec()
}

#[test]
fn default_trace_frames_the_parse() {
    let lines = trace("a = 1;", Verbosity::Default);

    assert_eq!(lines.first().map(String::as_str), Some("parse script:"));
    assert_eq!(lines.last().map(String::as_str), Some("accept"));
    assert!(lines.iter().any(|l| l.starts_with("  shift    identifier -> ")));
    assert!(lines.iter().any(|l| l.starts_with("  shift    \"=\" -> ")));
    assert!(lines.iter().any(|l| l.starts_with("  reduce   assignment (4) -> ")));
    assert!(!lines.iter().any(|l| l.starts_with("  lex")));
}

#[test]
fn verbose_trace_includes_tokens() {
    let lines = trace("a = 1;", Verbosity::Verbose);
    let lexed: Vec<&String> = lines.iter().filter(|l| l.starts_with("  lex")).collect();

    assert!(lexed[0].starts_with("  lex      identifier 0..1 in state "));
    assert!(lexed.iter().any(|l| l.starts_with("  lex      number 4..5 ")));
}

#[test]
fn extras_are_traced() {
    let lines = trace("# hi\na = 1;", Verbosity::Default);
    assert!(lines.contains(&"  extra    comment".to_owned()));
}

#[test]
fn recovery_is_traced() {
    let lines = trace("a = ;", Verbosity::Default);
    assert!(lines.contains(&"  missing  identifier".to_owned()));

    let lines = trace("a = = 1;", Verbosity::Default);
    assert!(lines.contains(&"  skip     \"=\"".to_owned()));
}

#[test]
fn cancelled_parse_is_traced() {
    let language = script();
    let flag = Arc::new(AtomicBool::new(true));
    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();
    parser.set_cancellation_flag(Some(flag.clone()));

    let mut tracer = PrintTracer::new(&language, Verbosity::Default, Colors::OFF);
    assert!(parser.parse_traced("a = 1;", None, &mut tracer).is_none());
    assert_eq!(tracer.lines(), ["parse script:", "halted at byte 0"]);

    flag.store(false, Ordering::Relaxed);
    let mut tracer = PrintTracer::new(&language, Verbosity::Default, Colors::OFF);
    assert!(parser.parse_traced("a = 1;", None, &mut tracer).is_some());
    assert_eq!(tracer.lines()[0], "resume script:");
    assert_eq!(tracer.lines().last().unwrap(), "accept");
}

#[test]
fn reuse_is_traced_when_verbose() {
    let language = script();
    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();
    let text = "a = 1;\nb = 2;\nc = 3;";
    let mut old = parser.parse(text, None).unwrap();
    old.edit(&thicket_core::InputEdit::for_replacement(text.as_bytes(), 4, 5, b"9"));

    let edited = "a = 9;\nb = 2;\nc = 3;";
    let mut tracer = PrintTracer::new(&language, Verbosity::Verbose, Colors::OFF);
    parser.parse_traced(edited, Some(&old), &mut tracer).unwrap();
    assert!(tracer.lines().iter().any(|l| l.starts_with("  reuse    ")));
}

#[test]
fn colored_names() {
    let language = script();
    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();
    let mut tracer = PrintTracer::new(&language, Verbosity::Default, Colors::ON);
    parser.parse_traced("a = 1;", None, &mut tracer).unwrap();

    let reduce = tracer
        .lines()
        .iter()
        .find(|l| l.contains("reduce"))
        .unwrap();
    assert!(reduce.contains(&format!("{}assignment{}", Colors::ON.blue, Colors::ON.reset)));
}

#[test]
fn noop_tracer_parses_the_same() {
    let language = script();
    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();
    let traced = parser.parse_traced("x = f(1);", None, &mut NoopTracer).unwrap();
    let plain = parser.parse("x = f(1);", None).unwrap();
    assert_eq!(traced.root_node().to_sexp(), plain.root_node().to_sexp());
}
