//! Command builders for the CLI.
//!
//! Each command is built from the shared arg builders in `args.rs`.

use clap::Command;

use super::args::*;

fn with_source_args(cmd: Command) -> Command {
    cmd.arg(source_path_arg())
        .arg(source_text_arg())
        .arg(lang_arg())
}

/// Build the complete CLI with all subcommands.
pub fn build_cli() -> Command {
    Command::new("thicket")
        .about("Incremental parser and structural query engine")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(color_arg())
        .subcommand(parse_command())
        .subcommand(query_command())
        .subcommand(edit_command())
        .subcommand(langs_command())
}

/// Parse a source file and print its syntax tree.
pub fn parse_command() -> Command {
    with_source_args(Command::new("parse"))
        .about("Parse source and print the syntax tree")
        .override_usage(
            "\
  thicket parse <SOURCE>
  thicket parse -s <TEXT> -l <LANG>",
        )
        .after_help(
            r#"EXAMPLES:
  thicket parse app.scr                  # S-expression tree with fields and spans
  thicket parse app.scr --raw            # include anonymous nodes
  thicket parse app.scr --trace -v       # parser events, then the tree
  thicket parse app.scr --dot | dot -Tsvg > tree.svg
  thicket parse page.tpl --range 10..42  # only parse bytes 10..42
  thicket parse -s 'a = 1;' -l script"#,
        )
        .arg(raw_arg())
        .arg(trace_arg())
        .arg(verbose_arg())
        .arg(dot_arg())
        .arg(range_arg("Only parse this byte range of the source"))
}

/// Run a query against a source file.
pub fn query_command() -> Command {
    with_source_args(Command::new("query"))
        .about("Run a query against source and print matches")
        .override_usage(
            "\
  thicket query <SOURCE> -q <QUERY>
  thicket query <SOURCE> --query-file <FILE>
  thicket query -s <TEXT> -l <LANG> -q <QUERY>",
        )
        .after_help(
            r#"EXAMPLES:
  thicket query app.scr -q '(call_expression function: (identifier) @fn)'
  thicket query app.scr --query-file calls.scm --captures
  thicket query app.scr -q '(number) @n' --json
  thicket query app.scr -q '(identifier) @id' --range 0..100"#,
        )
        .arg(query_text_arg())
        .arg(query_file_arg())
        .arg(captures_arg())
        .arg(json_arg())
        .arg(match_limit_arg())
        .arg(range_arg("Only report matches intersecting this byte range"))
}

/// Edit a source file and reparse incrementally.
pub fn edit_command() -> Command {
    with_source_args(Command::new("edit"))
        .about("Apply an edit, reparse incrementally and print changed ranges")
        .override_usage(
            "\
  thicket edit <SOURCE> --replace <START..END> --with <TEXT>
  thicket edit -s <TEXT> -l <LANG> --replace <START..END> --with <TEXT>",
        )
        .after_help(
            r#"EXAMPLES:
  thicket edit app.scr --replace 4..5 --with 42
  thicket edit -s 'a = 1;' -l script --replace 0..1 --with 'b'
  thicket edit app.scr --replace 10..20            # delete bytes 10..20"#,
        )
        .arg(replace_arg())
        .arg(with_arg())
}

/// List bundled languages.
pub fn langs_command() -> Command {
    Command::new("langs").about("List bundled languages")
}
