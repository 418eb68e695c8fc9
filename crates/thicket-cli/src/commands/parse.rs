use std::io::{self, Write};
use std::ops::Range;

use thicket_core::{Colors, point_at};
use thicket_runtime::{Node, PrintTracer, Tree, Verbosity};

use super::run_common::{CliError, SourceInput, check_range, new_parser};

pub struct ParseArgs {
    pub source: SourceInput,
    pub raw: bool,
    pub trace: bool,
    pub verbose: u8,
    pub dot: bool,
    pub range: Option<Range<usize>>,
    pub color: bool,
}

pub fn run(args: ParseArgs) -> Result<(), CliError> {
    let source = args.source.load()?;
    let language = args.source.language()?;
    let mut parser = new_parser(&language)?;
    let colors = if args.color { Colors::ON } else { Colors::OFF };

    if let Some(range) = &args.range {
        check_range(&source, range)?;
        parser.set_included_ranges(&[included_range(&source, range)])?;
    }

    let tree = if args.trace {
        let mut tracer = PrintTracer::new(&language, verbosity(args.verbose), colors);
        let tree = parser.parse_traced(&source, None, &mut tracer);
        tracer.print();
        println!();
        tree
    } else {
        parser.parse(&source, None)
    }
    .ok_or_else(|| CliError::ParseFailed(args.source.display_name()))?;

    let mut out = io::stdout().lock();
    if args.dot {
        tree.print_dot_graph(&mut out)?;
    } else {
        write!(out, "{}", dump_tree(&tree, &source, args.raw, colors))?;
    }
    Ok(())
}

fn verbosity(level: u8) -> Verbosity {
    match level {
        0 => Verbosity::Default,
        1 => Verbosity::Verbose,
        _ => Verbosity::VeryVerbose,
    }
}

pub fn included_range(source: &str, range: &Range<usize>) -> thicket_runtime::Range {
    let bytes = source.as_bytes();
    thicket_runtime::Range::new(
        range.start,
        range.end,
        point_at(bytes, range.start),
        point_at(bytes, range.end),
    )
}

/// Renders the tree as an indented S-expression with field names and spans.
pub fn dump_tree(tree: &Tree, source: &str, raw: bool, colors: Colors) -> String {
    format_node(tree.root_node(), None, source, 0, raw, colors) + "\n"
}

fn format_node(
    node: Node<'_>,
    field_name: Option<&str>,
    source: &str,
    depth: usize,
    include_anonymous: bool,
    c: Colors,
) -> String {
    let indent = "  ".repeat(depth);
    let field_prefix = field_name
        .map(|f| format!("{}{f}:{} ", c.dim, c.reset))
        .unwrap_or_default();
    let start = node.start_position();
    let end = node.end_position();
    let span = format!(
        " {}[{}:{}-{}:{}]{}",
        c.dim, start.row, start.column, end.row, end.column, c.reset
    );
    let kind = if node.is_error() {
        format!("{}{}{}", c.red, node.kind(), c.reset)
    } else if node.is_named() {
        format!("{}{}{}", c.blue, node.kind(), c.reset)
    } else {
        format!("{}\"{}\"{}", c.green, escape_string(node.kind()), c.reset)
    };

    if node.is_missing() {
        return format!(
            "{indent}{field_prefix}({}MISSING{} {kind}){span}",
            c.yellow, c.reset
        );
    }

    let mut children = Vec::new();
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            if include_anonymous || child.is_named() {
                children.push((child, cursor.field_name()));
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    if children.is_empty() {
        let text = node.utf8_text(source.as_bytes()).unwrap_or("<invalid utf8>");
        return if !node.is_named() || text.is_empty() || text == node.kind() {
            format!("{indent}{field_prefix}({kind}){span}")
        } else {
            format!(
                "{indent}{field_prefix}({kind} \"{}\"){span}",
                escape_string(text)
            )
        };
    }

    let mut out = format!("{indent}{field_prefix}({kind}{span}");
    for (child, child_field) in children {
        out.push('\n');
        out.push_str(&format_node(
            child,
            child_field,
            source,
            depth + 1,
            include_anonymous,
            c,
        ));
    }
    out.push(')');
    out
}

pub fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            c if c.is_control() => result.push_str(&format!("\\u{{{:04x}}}", c as u32)),
            c => result.push(c),
        }
    }
    result
}
