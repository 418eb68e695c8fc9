//! Lexical automaton construction.
//!
//! Every terminal becomes one pattern of a single anchored multi-pattern DFA.
//! The DFA reports all matching patterns so the runtime can apply
//! longest-match and literal-over-regex tie breaking itself.

use regex_automata::MatchKind;
use regex_automata::dfa::{StartKind, dense};
use regex_syntax::ParserBuilder;
use thicket_core::{LexOutput, LexPattern, LexTable, SymbolId};

use super::prepare::Prepared;
use crate::GrammarError;
use crate::grammar::Rule;

/// Regex source for a token rule.
pub(crate) fn token_regex(rule: &Rule, token: &str) -> Result<String, GrammarError> {
    let regex = match rule {
        Rule::Blank => String::new(),
        Rule::String(value) => regex_syntax::escape(value),
        Rule::Pattern { value, flags } => match flags.as_deref() {
            Some(flags) if flags.contains('i') => format!("(?i:{value})"),
            _ => format!("(?:{value})"),
        },
        Rule::Seq(members) => members
            .iter()
            .map(|m| token_regex(m, token))
            .collect::<Result<Vec<_>, _>>()?
            .concat(),
        Rule::Choice(members) => {
            let alts = members
                .iter()
                .map(|m| token_regex(m, token))
                .collect::<Result<Vec<_>, _>>()?;
            format!("(?:{})", alts.join("|"))
        }
        Rule::Repeat(content) => format!("(?:{})*", token_regex(content, token)?),
        Rule::Repeat1(content) => format!("(?:{})+", token_regex(content, token)?),
        Rule::Token(content) | Rule::ImmediateToken(content) => token_regex(content, token)?,
        Rule::Prec { content, .. }
        | Rule::PrecLeft { content, .. }
        | Rule::PrecRight { content, .. }
        | Rule::PrecDynamic { content, .. } => token_regex(content, token)?,
        Rule::Symbol(name) => {
            return Err(GrammarError::Unsupported {
                rule: token.to_owned(),
                what: format!("symbol `{name}` inside a token"),
            });
        }
        Rule::Field { name, .. } => {
            return Err(GrammarError::Unsupported {
                rule: token.to_owned(),
                what: format!("field `{name}` inside a token"),
            });
        }
        Rule::Alias { value, .. } => {
            return Err(GrammarError::Unsupported {
                rule: token.to_owned(),
                what: format!("alias `{value}`"),
            });
        }
    };
    Ok(regex)
}

fn check_pattern(token: &str, regex: &str) -> Result<(), GrammarError> {
    let hir = ParserBuilder::new()
        .build()
        .parse(regex)
        .map_err(|e| GrammarError::Regex {
            token: token.to_owned(),
            message: e.to_string(),
        })?;
    if hir.properties().minimum_len() == Some(0) {
        return Err(GrammarError::EmptyToken {
            token: token.to_owned(),
        });
    }
    Ok(())
}

pub(crate) fn build_lex_table(prepared: &Prepared) -> Result<LexTable, GrammarError> {
    let mut regexes = Vec::with_capacity(prepared.tokens.len() + prepared.skips.len());
    let mut patterns = Vec::with_capacity(regexes.capacity());

    for (index, token) in prepared.tokens.iter().enumerate() {
        check_pattern(&token.name, &token.regex)?;
        regexes.push(token.regex.as_str());
        patterns.push(LexPattern {
            output: LexOutput::Token((index + 1) as SymbolId),
            literal: token.literal,
            immediate: token.immediate,
        });
    }
    for skip in &prepared.skips {
        check_pattern("extras", skip)?;
        regexes.push(skip.as_str());
        patterns.push(LexPattern {
            output: LexOutput::Skip,
            literal: false,
            immediate: false,
        });
    }

    let dfa = dense::Builder::new()
        .configure(
            dense::Config::new()
                .start_kind(StartKind::Anchored)
                .match_kind(MatchKind::All),
        )
        .build_many(&regexes)
        .map_err(|e| GrammarError::Lexer(e.to_string()))?;
    let sparse = dfa
        .to_sparse()
        .map_err(|e| GrammarError::Lexer(e.to_string()))?;

    Ok(LexTable {
        dfa: sparse.to_bytes_little_endian(),
        patterns,
    })
}
