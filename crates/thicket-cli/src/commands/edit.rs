use std::fmt::Write as _;
use std::io::{self, Write};
use std::ops::Range;

use thicket_core::Colors;
use thicket_runtime::{InputEdit, Language};

use super::parse::dump_tree;
use super::run_common::{CliError, SourceInput, check_range, new_parser};

pub struct EditArgs {
    pub source: SourceInput,
    pub replace: Range<usize>,
    pub with: String,
    pub color: bool,
}

pub fn run(args: EditArgs) -> Result<(), CliError> {
    let source = args.source.load()?;
    let language = args.source.language()?;
    let colors = if args.color { Colors::ON } else { Colors::OFF };

    let text = apply(&language, &source, &args.replace, &args.with, colors)?;
    io::stdout().lock().write_all(text.as_bytes())?;
    Ok(())
}

/// Parses `source`, replaces `range` with `replacement`, reparses against the
/// edited tree and reports what changed.
pub fn apply(
    language: &Language,
    source: &str,
    range: &Range<usize>,
    replacement: &str,
    colors: Colors,
) -> Result<String, CliError> {
    check_range(source, range)?;
    let failed = || CliError::ParseFailed(language.name().to_owned());
    let mut parser = new_parser(language)?;
    let mut tree = parser.parse(source, None).ok_or_else(failed)?;

    let edit = InputEdit::for_replacement(
        source.as_bytes(),
        range.start,
        range.end,
        replacement.as_bytes(),
    );
    let new_source = format!(
        "{}{replacement}{}",
        &source[..range.start],
        &source[range.end..]
    );
    tree.edit(&edit);
    let new_tree = parser
        .parse(&new_source, Some(&tree))
        .ok_or_else(failed)?;

    let c = colors;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}edit{} {}..{} -> {}..{} [{}-{}]",
        c.dim,
        c.reset,
        edit.start_byte,
        edit.old_end_byte,
        edit.start_byte,
        edit.new_end_byte,
        edit.start_position,
        edit.new_end_position,
    );

    let ranges = tree.changed_ranges(&new_tree);
    if ranges.is_empty() {
        let _ = writeln!(out, "{}no changed ranges{}", c.dim, c.reset);
    }
    for changed in &ranges {
        let _ = writeln!(out, "{}changed{} {changed}", c.yellow, c.reset);
    }
    out.push('\n');
    out.push_str(&dump_tree(&new_tree, &new_source, false, colors));
    Ok(out)
}
