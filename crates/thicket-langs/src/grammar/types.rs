//! Grammar model: the rule tree of a `grammar.json` file.

/// A grammar as read from `grammar.json`.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub name: String,
    /// Rules in definition order. The first rule is the start symbol.
    pub rules: Vec<(String, Rule)>,
    /// Tokens allowed anywhere between other tokens.
    pub extras: Vec<Rule>,
    /// Named precedence orderings, highest first.
    pub precedences: Vec<Vec<PrecedenceEntry>>,
    pub conflicts: Vec<Vec<String>>,
    pub externals: Vec<Rule>,
    pub inline: Vec<String>,
    pub supertypes: Vec<String>,
    pub word: Option<String>,
}

impl Grammar {
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|(rule_name, _)| rule_name == name)
            .map(|(_, rule)| rule)
    }

    pub fn start_rule(&self) -> Option<&str> {
        self.rules.first().map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Blank,
    String(String),
    Pattern {
        value: String,
        flags: Option<String>,
    },
    Symbol(String),
    Seq(Vec<Rule>),
    Choice(Vec<Rule>),
    Repeat(Box<Rule>),
    Repeat1(Box<Rule>),
    Field {
        name: String,
        content: Box<Rule>,
    },
    Alias {
        content: Box<Rule>,
        value: String,
        named: bool,
    },
    Token(Box<Rule>),
    ImmediateToken(Box<Rule>),
    Prec {
        value: Precedence,
        content: Box<Rule>,
    },
    PrecLeft {
        value: Precedence,
        content: Box<Rule>,
    },
    PrecRight {
        value: Precedence,
        content: Box<Rule>,
    },
    PrecDynamic {
        value: i32,
        content: Box<Rule>,
    },
}

impl Rule {
    /// True when the rule, under any precedence wrappers, describes a single token.
    pub fn is_token(&self) -> bool {
        match self.strip_prec() {
            Rule::String(_) | Rule::Pattern { .. } => true,
            Rule::Token(_) | Rule::ImmediateToken(_) => true,
            _ => false,
        }
    }

    pub fn strip_prec(&self) -> &Rule {
        let mut rule = self;
        while let Rule::Prec { content, .. }
        | Rule::PrecLeft { content, .. }
        | Rule::PrecRight { content, .. }
        | Rule::PrecDynamic { content, .. } = rule
        {
            rule = content;
        }
        rule
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precedence {
    Integer(i32),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrecedenceEntry {
    Name(String),
    Symbol(String),
}
