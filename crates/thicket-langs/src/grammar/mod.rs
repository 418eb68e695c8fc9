//! Grammar model and `grammar.json` loader.

mod json;
mod types;


pub use types::{Grammar, Precedence, PrecedenceEntry, Rule};
