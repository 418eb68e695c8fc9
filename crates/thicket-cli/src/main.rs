mod cli;
mod commands;

use cli::{EditParams, ParseParams, QueryParams, build_cli};

fn main() {
    let matches = build_cli().get_matches();

    let result = match matches.subcommand() {
        Some(("parse", m)) => commands::parse::run(ParseParams::from_matches(m).into()),
        Some(("query", m)) => commands::query::run(QueryParams::from_matches(m).into()),
        Some(("edit", m)) => commands::edit::run(EditParams::from_matches(m).into()),
        Some(("langs", _)) => {
            commands::langs::run();
            Ok(())
        }
        _ => unreachable!("clap should have caught this"),
    };

    match result {
        Ok(()) => {}
        Err(commands::run_common::CliError::Query(rendered)) => {
            eprintln!("{rendered}");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
