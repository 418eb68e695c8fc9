use thicket_core::LanguageError;

/// Failure to turn a grammar into a language.
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("invalid grammar.json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("grammar has no rules")]
    Empty,
    #[error("rule `{rule}` references undefined symbol `{name}`")]
    UndefinedSymbol { rule: String, name: String },
    #[error("malformed rule `{rule}`: {message}")]
    Malformed { rule: String, message: String },
    #[error("rule `{rule}` uses unsupported construct: {what}")]
    Unsupported { rule: String, what: String },
    #[error("undefined precedence `{name}` in rule `{rule}`")]
    UndefinedPrecedence { rule: String, name: String },
    #[error("invalid regex for token `{token}`: {message}")]
    Regex { token: String, message: String },
    #[error("token `{token}` matches the empty string")]
    EmptyToken { token: String },
    #[error("failed to build the lexical automaton: {0}")]
    Lexer(String),
    #[error("unresolved conflict in state {state} on `{lookahead}`: {detail}")]
    Conflict {
        state: usize,
        lookahead: String,
        detail: String,
    },
    #[error("grammar exceeds table limits: {0}")]
    TooLarge(String),
    #[error(transparent)]
    Language(#[from] LanguageError),
}
