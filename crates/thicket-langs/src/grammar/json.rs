//! Reading `grammar.json`.
//!
//! The top-level object is deserialized with serde; rule bodies are walked as
//! [`serde_json::Value`] so errors can name the rule they occur in.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::types::{Grammar, Precedence, PrecedenceEntry, Rule};
use crate::GrammarError;

impl Grammar {
    pub fn from_json(json: &str) -> Result<Self, GrammarError> {
        let file: GrammarFile = serde_json::from_str(json)?;
        if file.rules.is_empty() {
            return Err(GrammarError::Empty);
        }

        let mut rules = Vec::with_capacity(file.rules.len());
        for (name, body) in &file.rules {
            rules.push((name.clone(), RuleReader::new(name).read(body)?));
        }

        // Without an `extras` key tokens may be separated by whitespace.
        let extras = match &file.extras {
            Some(list) => RuleReader::new("extras").read_all(list)?,
            None => vec![Rule::Pattern {
                value: r"\s".to_owned(),
                flags: None,
            }],
        };

        let precedences = file
            .precedences
            .iter()
            .map(|level| level.iter().map(precedence_entry).collect::<Result<Vec<_>, _>>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: file.name,
            rules,
            extras,
            precedences,
            conflicts: file.conflicts,
            externals: RuleReader::new("externals").read_all(&file.externals)?,
            inline: file.inline,
            supertypes: file.supertypes,
            word: file.word,
        })
    }
}

#[derive(Deserialize)]
struct GrammarFile {
    name: String,
    /// Keeps definition order, so the start rule stays first.
    rules: IndexMap<String, Value>,
    extras: Option<Vec<Value>>,
    #[serde(default)]
    precedences: Vec<Vec<Value>>,
    #[serde(default)]
    conflicts: Vec<Vec<String>>,
    #[serde(default)]
    externals: Vec<Value>,
    #[serde(default)]
    inline: Vec<String>,
    #[serde(default)]
    supertypes: Vec<String>,
    #[serde(default)]
    word: Option<String>,
}

fn precedence_entry(value: &Value) -> Result<PrecedenceEntry, GrammarError> {
    let reader = RuleReader::new("precedences");
    let object = reader.object(value)?;
    match reader.str_field(object, "type")? {
        "STRING" => Ok(PrecedenceEntry::Name(reader.string(object, "value")?)),
        "SYMBOL" => Ok(PrecedenceEntry::Symbol(reader.string(object, "name")?)),
        other => Err(reader.malformed(format!("`{other}` cannot appear in a precedence list"))),
    }
}

/// Converts the JSON of one named rule, tagging errors with its name.
struct RuleReader<'a> {
    rule: &'a str,
}

impl<'a> RuleReader<'a> {
    fn new(rule: &'a str) -> Self {
        Self { rule }
    }

    fn read_all(&self, values: &[Value]) -> Result<Vec<Rule>, GrammarError> {
        values.iter().map(|v| self.read(v)).collect()
    }

    fn read(&self, value: &Value) -> Result<Rule, GrammarError> {
        let object = self.object(value)?;
        let rule = match self.str_field(object, "type")? {
            "BLANK" => Rule::Blank,
            "STRING" => Rule::String(self.string(object, "value")?),
            "PATTERN" => Rule::Pattern {
                value: self.string(object, "value")?,
                flags: object
                    .get("flags")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            },
            "SYMBOL" => Rule::Symbol(self.string(object, "name")?),
            "SEQ" => Rule::Seq(self.members(object)?),
            "CHOICE" => Rule::Choice(self.members(object)?),
            "REPEAT" => Rule::Repeat(self.content(object)?),
            "REPEAT1" => Rule::Repeat1(self.content(object)?),
            "FIELD" => Rule::Field {
                name: self.string(object, "name")?,
                content: self.content(object)?,
            },
            "ALIAS" => Rule::Alias {
                content: self.content(object)?,
                value: self.string(object, "value")?,
                named: object
                    .get("named")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| self.malformed("ALIAS without a boolean `named`"))?,
            },
            "TOKEN" => Rule::Token(self.content(object)?),
            "IMMEDIATE_TOKEN" => Rule::ImmediateToken(self.content(object)?),
            "PREC" => Rule::Prec {
                value: self.precedence(object)?,
                content: self.content(object)?,
            },
            "PREC_LEFT" => Rule::PrecLeft {
                value: self.precedence(object)?,
                content: self.content(object)?,
            },
            "PREC_RIGHT" => Rule::PrecRight {
                value: self.precedence(object)?,
                content: self.content(object)?,
            },
            "PREC_DYNAMIC" => Rule::PrecDynamic {
                value: object
                    .get("value")
                    .and_then(Value::as_i64)
                    .and_then(|n| i32::try_from(n).ok())
                    .ok_or_else(|| self.malformed("PREC_DYNAMIC needs an integer `value`"))?,
                content: self.content(object)?,
            },
            other => {
                return Err(GrammarError::Unsupported {
                    rule: self.rule.to_owned(),
                    what: format!("rule type `{other}`"),
                });
            }
        };
        Ok(rule)
    }

    fn members(&self, object: &Map<String, Value>) -> Result<Vec<Rule>, GrammarError> {
        match object.get("members") {
            Some(Value::Array(items)) => self.read_all(items),
            _ => Err(self.malformed("expected a `members` array")),
        }
    }

    fn content(&self, object: &Map<String, Value>) -> Result<Box<Rule>, GrammarError> {
        let content = object
            .get("content")
            .ok_or_else(|| self.malformed("missing `content`"))?;
        Ok(Box::new(self.read(content)?))
    }

    fn precedence(&self, object: &Map<String, Value>) -> Result<Precedence, GrammarError> {
        match object.get("value") {
            Some(Value::String(name)) => Ok(Precedence::Name(name.clone())),
            Some(Value::Number(n)) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(Precedence::Integer)
                .ok_or_else(|| self.malformed(format!("precedence {n} is out of range"))),
            _ => Err(self.malformed("precedence must be an integer or a name")),
        }
    }

    fn object<'v>(&self, value: &'v Value) -> Result<&'v Map<String, Value>, GrammarError> {
        value
            .as_object()
            .ok_or_else(|| self.malformed("expected a rule object"))
    }

    fn str_field<'v>(&self, object: &'v Map<String, Value>, key: &str) -> Result<&'v str, GrammarError> {
        object
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| self.malformed(format!("missing string `{key}`")))
    }

    fn string(&self, object: &Map<String, Value>, key: &str) -> Result<String, GrammarError> {
        self.str_field(object, key).map(str::to_owned)
    }

    fn malformed(&self, message: impl Into<String>) -> GrammarError {
        GrammarError::Malformed {
            rule: self.rule.to_owned(),
            message: message.into(),
        }
    }
}
