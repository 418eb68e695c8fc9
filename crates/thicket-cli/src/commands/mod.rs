pub mod edit;
pub mod langs;
pub mod parse;
pub mod query;
pub mod run_common;

#[cfg(test)]
mod edit_tests;
#[cfg(test)]
mod langs_tests;
#[cfg(test)]
mod run_common_tests;
