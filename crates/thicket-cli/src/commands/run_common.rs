//! Input loading and language resolution shared by all commands.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thicket_runtime::{IncludedRangesError, Language, LanguageError, Parser};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("source required (positional SOURCE or -s/--source)")]
    MissingSource,
    #[error("query required (-q/--query or --query-file)")]
    MissingQuery,
    #[error("failed to read '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write output: {0}")]
    Write(#[from] io::Error),
    #[error("unknown language: {0}\n\nRun 'thicket langs' for the full list.")]
    UnknownLang(String),
    #[error("cannot infer language from extension '.{0}', use -l/--lang")]
    UnknownExt(String),
    #[error("-l/--lang is required (cannot infer from {0})")]
    LangRequired(&'static str),
    #[error(transparent)]
    Language(#[from] LanguageError),
    #[error("range {start}..{end} is outside the source ({len} bytes)")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },
    #[error("range {start}..{end} splits a UTF-8 character")]
    RangeNotCharBoundary { start: usize, end: usize },
    #[error(transparent)]
    IncludedRanges(#[from] IncludedRangesError),
    #[error("parsing {0} did not complete")]
    ParseFailed(String),
    /// A query diagnostic, already rendered as a snippet.
    #[error("{0}")]
    Query(String),
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where a command's source text and language come from.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SourceInput {
    pub path: Option<PathBuf>,
    pub text: Option<String>,
    pub lang: Option<String>,
}

impl SourceInput {
    pub fn load(&self) -> Result<String, CliError> {
        if let Some(text) = &self.text {
            return Ok(text.clone());
        }
        match &self.path {
            Some(path) => read_text(path),
            None => Err(CliError::MissingSource),
        }
    }

    /// Resolves the language from `--lang`, falling back to the file extension.
    pub fn language(&self) -> Result<Language, CliError> {
        if let Some(name) = &self.lang {
            return thicket_langs::from_name(name).ok_or_else(|| CliError::UnknownLang(name.clone()));
        }

        if let Some(path) = &self.path
            && path.as_os_str() != "-"
            && let Some(ext) = path.extension().and_then(|e| e.to_str())
        {
            return thicket_langs::from_ext(ext).ok_or_else(|| CliError::UnknownExt(ext.to_owned()));
        }

        Err(CliError::LangRequired(if self.text.is_some() {
            "inline source"
        } else {
            "stdin"
        }))
    }

    /// Display name for diagnostics.
    pub fn display_name(&self) -> String {
        match &self.path {
            Some(path) if path.as_os_str() != "-" => path.display().to_string(),
            Some(_) => "<stdin>".to_owned(),
            None => "<source>".to_owned(),
        }
    }
}

/// Reads a file, or stdin when the path is `-`.
pub fn read_text(path: &Path) -> Result<String, CliError> {
    let read_error = |source| CliError::Read {
        path: path.to_owned(),
        source,
    };
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).map_err(read_error)?;
        return Ok(buf);
    }
    fs::read_to_string(path).map_err(read_error)
}

pub fn new_parser(language: &Language) -> Result<Parser, CliError> {
    let mut parser = Parser::new();
    parser.set_language(language)?;
    Ok(parser)
}

/// Checks that `range` lies within `text` on character boundaries.
pub fn check_range(text: &str, range: &std::ops::Range<usize>) -> Result<(), CliError> {
    let (start, end) = (range.start, range.end);
    if end > text.len() {
        return Err(CliError::RangeOutOfBounds {
            start,
            end,
            len: text.len(),
        });
    }
    if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
        return Err(CliError::RangeNotCharBoundary { start, end });
    }
    Ok(())
}
