//! Flattens a rule tree into terminals, symbols and productions.
//!
//! Choices, optionals and precedence wrappers are expanded in place so that
//! every production is a plain symbol sequence. Repetitions become hidden
//! `*_repeatN` helpers with the shape `aux -> aux aux | element`, which keeps
//! long lists balanceable after parsing.

use std::collections::HashMap;

use indexmap::IndexMap;
use thicket_core::{SYMBOL_ERROR, SymbolId, SymbolInfo, SymbolKind};

use crate::GrammarError;
use crate::grammar::{Grammar, Precedence, PrecedenceEntry, Rule};

use super::lex::token_regex;

/// Upper bound on alternatives produced by one rule after expansion.
const MAX_ALTERNATIVES: usize = 4096;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Assoc {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub(crate) struct TokenDef {
    pub name: String,
    pub regex: String,
    pub literal: bool,
    pub immediate: bool,
    pub named: bool,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Prod {
    pub symbol: SymbolId,
    pub rhs: Vec<SymbolId>,
    pub fields: Vec<Option<String>>,
    pub prec: i32,
    pub assoc: Assoc,
}

#[derive(Debug)]
pub(crate) struct Prepared {
    pub name: String,
    pub symbols: Vec<SymbolInfo>,
    pub tokens: Vec<TokenDef>,
    /// Anonymous extras; they lex as padding and never reach the parser.
    pub skips: Vec<String>,
    pub extra_tokens: Vec<SymbolId>,
    /// The last production is the augmented start `S' -> start`.
    pub productions: Vec<Prod>,
    /// Sorted; field id `i + 1` names `fields[i]`.
    pub fields: Vec<String>,
    pub start: SymbolId,
}

impl Prepared {
    pub fn terminal_count(&self) -> usize {
        self.tokens.len() + 1
    }

    pub fn is_terminal(&self, symbol: SymbolId) -> bool {
        (symbol as usize) < self.terminal_count()
    }

    pub fn augmented(&self) -> usize {
        self.productions.len() - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Sym {
    Token(usize),
    Rule(usize),
    Aux(usize),
}

#[derive(Debug, Clone, Default)]
struct Alt {
    items: Vec<(Sym, Option<String>)>,
    prec: Option<(i32, Assoc)>,
}

impl Alt {
    fn single(sym: Sym) -> Self {
        Self {
            items: vec![(sym, None)],
            prec: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TokenKey {
    Rule(String),
    Literal { value: String, immediate: bool },
    Regex { regex: String, immediate: bool },
}

struct AuxDef {
    name: String,
    alts: Vec<Alt>,
}

struct Flattener<'g> {
    grammar: &'g Grammar,
    tokens: IndexMap<TokenKey, TokenDef>,
    rule_index: HashMap<&'g str, usize>,
    precedence_levels: HashMap<&'g str, i32>,
    aux: Vec<AuxDef>,
    current_rule: String,
    repeat_count: usize,
    token_count: usize,
}

pub(crate) fn prepare(grammar: &Grammar) -> Result<Prepared, GrammarError> {
    let Some((start_name, start_rule)) = grammar.rules.first() else {
        return Err(GrammarError::Empty);
    };
    if let Some(external) = grammar.externals.first() {
        return Err(GrammarError::Unsupported {
            rule: start_name.clone(),
            what: format!("external tokens ({external:?})"),
        });
    }
    if start_rule.is_token() {
        return Err(GrammarError::Unsupported {
            rule: start_name.clone(),
            what: "the start rule must not be a token".to_owned(),
        });
    }

    let mut flattener = Flattener::new(grammar);
    flattener.register_token_rules()?;

    let mut rule_alts = Vec::with_capacity(grammar.rules.len());
    for (name, rule) in syntax_rules(grammar) {
        flattener.current_rule = name.to_owned();
        flattener.repeat_count = 0;
        let alts = flattener.flatten(rule)?;
        rule_alts.push(dedup(alts));
    }

    let (skips, extra_syms) = flattener.extras()?;
    flattener.finish(rule_alts, skips, extra_syms)
}

/// Rules that become non-terminals, in definition order.
fn syntax_rules(grammar: &Grammar) -> impl Iterator<Item = (&str, &Rule)> {
    grammar
        .rules
        .iter()
        .filter(|(_, rule)| !rule.is_token())
        .map(|(name, rule)| (name.as_str(), rule))
}

fn dedup(alts: Vec<Alt>) -> Vec<Alt> {
    let mut out: Vec<Alt> = Vec::with_capacity(alts.len());
    for alt in alts {
        if !out.iter().any(|seen| seen.items == alt.items) {
            out.push(alt);
        }
    }
    out
}

impl<'g> Flattener<'g> {
    fn new(grammar: &'g Grammar) -> Self {
        let rule_index = syntax_rules(grammar)
            .enumerate()
            .map(|(i, (name, _))| (name, i))
            .collect();

        // Earlier entries in an ordering list bind tighter.
        let mut precedence_levels = HashMap::new();
        for ordering in &grammar.precedences {
            for (i, entry) in ordering.iter().enumerate() {
                let name = match entry {
                    PrecedenceEntry::Name(name) | PrecedenceEntry::Symbol(name) => name.as_str(),
                };
                precedence_levels
                    .entry(name)
                    .or_insert((ordering.len() - i) as i32);
            }
        }

        Self {
            grammar,
            tokens: IndexMap::new(),
            rule_index,
            precedence_levels,
            aux: Vec::new(),
            current_rule: String::new(),
            repeat_count: 0,
            token_count: 0,
        }
    }

    fn register_token_rules(&mut self) -> Result<(), GrammarError> {
        let grammar = self.grammar;
        for (name, rule) in &grammar.rules {
            if !rule.is_token() {
                continue;
            }
            let regex = token_regex(rule, name)?;
            let visible = !name.starts_with('_');
            self.tokens.insert(
                TokenKey::Rule(name.clone()),
                TokenDef {
                    name: name.clone(),
                    regex,
                    literal: matches!(rule.strip_prec(), Rule::String(_)),
                    immediate: matches!(rule.strip_prec(), Rule::ImmediateToken(_)),
                    named: true,
                    visible,
                },
            );
        }
        Ok(())
    }

    fn flatten(&mut self, rule: &Rule) -> Result<Vec<Alt>, GrammarError> {
        match rule {
            Rule::Blank => Ok(vec![Alt::default()]),
            Rule::String(_) | Rule::Pattern { .. } | Rule::Token(_) | Rule::ImmediateToken(_) => {
                let sym = self.inline_token(rule)?;
                Ok(vec![Alt::single(sym)])
            }
            Rule::Symbol(name) => Ok(vec![Alt::single(self.symbol(name)?)]),
            Rule::Seq(members) => {
                let mut acc = vec![Alt::default()];
                for member in members {
                    let next = self.flatten(member)?;
                    acc = self.product(acc, &next)?;
                }
                Ok(acc)
            }
            Rule::Choice(members) => {
                let mut alts = Vec::new();
                for member in members {
                    alts.extend(self.flatten(member)?);
                }
                self.check_size(alts.len())?;
                Ok(alts)
            }
            Rule::Repeat(content) => {
                let aux = self.repeat(content)?;
                Ok(vec![Alt::single(aux), Alt::default()])
            }
            Rule::Repeat1(content) => Ok(vec![Alt::single(self.repeat(content)?)]),
            Rule::Field { name, content } => {
                let mut alts = self.flatten(content)?;
                for alt in &mut alts {
                    for (_, field) in &mut alt.items {
                        field.get_or_insert_with(|| name.clone());
                    }
                }
                Ok(alts)
            }
            Rule::Prec { value, content } => self.with_prec(value, Assoc::None, content),
            Rule::PrecLeft { value, content } => self.with_prec(value, Assoc::Left, content),
            Rule::PrecRight { value, content } => self.with_prec(value, Assoc::Right, content),
            Rule::PrecDynamic { content, .. } => self.flatten(content),
            Rule::Alias { value, .. } => Err(GrammarError::Unsupported {
                rule: self.current_rule.clone(),
                what: format!("alias `{value}`"),
            }),
        }
    }

    fn with_prec(
        &mut self,
        value: &Precedence,
        assoc: Assoc,
        content: &Rule,
    ) -> Result<Vec<Alt>, GrammarError> {
        let level = self.precedence(value)?;
        let mut alts = self.flatten(content)?;
        for alt in &mut alts {
            alt.prec.get_or_insert((level, assoc));
        }
        Ok(alts)
    }

    fn precedence(&self, value: &Precedence) -> Result<i32, GrammarError> {
        match value {
            Precedence::Integer(n) => Ok(*n),
            Precedence::Name(name) => self
                .precedence_levels
                .get(name.as_str())
                .copied()
                .ok_or_else(|| GrammarError::UndefinedPrecedence {
                    rule: self.current_rule.clone(),
                    name: name.clone(),
                }),
        }
    }

    fn product(&self, acc: Vec<Alt>, next: &[Alt]) -> Result<Vec<Alt>, GrammarError> {
        self.check_size(acc.len() * next.len())?;
        let mut out = Vec::with_capacity(acc.len() * next.len());
        for left in &acc {
            for right in next {
                let mut items = left.items.clone();
                items.extend(right.items.iter().cloned());
                out.push(Alt {
                    items,
                    prec: right.prec.or(left.prec),
                });
            }
        }
        Ok(out)
    }

    fn check_size(&self, len: usize) -> Result<(), GrammarError> {
        if len > MAX_ALTERNATIVES {
            return Err(GrammarError::TooLarge(format!(
                "rule `{}` expands to more than {MAX_ALTERNATIVES} alternatives",
                self.current_rule
            )));
        }
        Ok(())
    }

    fn repeat(&mut self, content: &Rule) -> Result<Sym, GrammarError> {
        self.repeat_count += 1;
        let index = self.aux.len();
        self.aux.push(AuxDef {
            name: format!("{}_repeat{}", self.current_rule, self.repeat_count),
            alts: Vec::new(),
        });

        let body: Vec<Alt> = self
            .flatten(content)?
            .into_iter()
            .filter(|alt| !alt.items.is_empty())
            .collect();
        if body.is_empty() {
            return Err(GrammarError::Unsupported {
                rule: self.current_rule.clone(),
                what: "repetition of empty content".to_owned(),
            });
        }

        let me = Sym::Aux(index);
        let mut alts = vec![Alt {
            items: vec![(me, None), (me, None)],
            prec: Some((0, Assoc::Left)),
        }];
        alts.extend(body);
        self.aux[index].alts = dedup(alts);
        Ok(me)
    }

    fn symbol(&self, name: &str) -> Result<Sym, GrammarError> {
        if let Some(index) = self.tokens.get_index_of(&TokenKey::Rule(name.to_owned())) {
            return Ok(Sym::Token(index));
        }
        self.rule_index
            .get(name)
            .map(|&i| Sym::Rule(i))
            .ok_or_else(|| GrammarError::UndefinedSymbol {
                rule: self.current_rule.clone(),
                name: name.to_owned(),
            })
    }

    fn inline_token(&mut self, rule: &Rule) -> Result<Sym, GrammarError> {
        let immediate = matches!(rule, Rule::ImmediateToken(_));
        let literal = match rule {
            Rule::String(value) => Some(value),
            Rule::Token(content) | Rule::ImmediateToken(content) => match content.strip_prec() {
                Rule::String(value) => Some(value),
                _ => None,
            },
            _ => None,
        };

        let (key, def) = match literal {
            Some(value) => (
                TokenKey::Literal {
                    value: value.clone(),
                    immediate,
                },
                TokenDef {
                    name: value.clone(),
                    regex: regex_syntax::escape(value),
                    literal: true,
                    immediate,
                    named: false,
                    visible: true,
                },
            ),
            None => {
                let regex = token_regex(rule, &self.current_rule)?;
                let key = TokenKey::Regex {
                    regex: regex.clone(),
                    immediate,
                };
                if let Some(index) = self.tokens.get_index_of(&key) {
                    return Ok(Sym::Token(index));
                }
                self.token_count += 1;
                let name = format!("{}_token{}", self.current_rule, self.token_count);
                (
                    key,
                    TokenDef {
                        name,
                        regex,
                        literal: false,
                        immediate,
                        named: false,
                        visible: false,
                    },
                )
            }
        };

        let entry = self.tokens.entry(key);
        let index = entry.index();
        entry.or_insert(def);
        Ok(Sym::Token(index))
    }

    fn extras(&mut self) -> Result<(Vec<String>, Vec<Sym>), GrammarError> {
        self.current_rule = "extras".to_owned();
        let grammar = self.grammar;
        let mut skips = Vec::new();
        let mut symbols = Vec::new();
        for extra in &grammar.extras {
            match extra {
                Rule::Symbol(name) => match self.symbol(name)? {
                    sym @ Sym::Token(_) => symbols.push(sym),
                    _ => {
                        return Err(GrammarError::Unsupported {
                            rule: name.clone(),
                            what: "non-token extras".to_owned(),
                        });
                    }
                },
                other => skips.push(token_regex(other, "extras")?),
            }
        }
        Ok((skips, symbols))
    }

    fn finish(
        self,
        rule_alts: Vec<Vec<Alt>>,
        skips: Vec<String>,
        extra_syms: Vec<Sym>,
    ) -> Result<Prepared, GrammarError> {
        let token_count = self.tokens.len();
        let rule_count = rule_alts.len();
        let total = 1 + token_count + rule_count + self.aux.len();
        if total >= SYMBOL_ERROR as usize {
            return Err(GrammarError::TooLarge(format!("{total} symbols")));
        }

        let id = |sym: Sym| -> SymbolId {
            (match sym {
                Sym::Token(i) => 1 + i,
                Sym::Rule(i) => 1 + token_count + i,
                Sym::Aux(i) => 1 + token_count + rule_count + i,
            }) as SymbolId
        };

        let mut symbols = Vec::with_capacity(total);
        symbols.push(SymbolInfo {
            name: "end".to_owned(),
            named: false,
            visible: false,
            kind: SymbolKind::Token,
        });
        let tokens: Vec<TokenDef> = self.tokens.into_values().collect();
        for token in &tokens {
            symbols.push(SymbolInfo {
                name: token.name.clone(),
                named: token.named,
                visible: token.visible,
                kind: SymbolKind::Token,
            });
        }
        for (name, _) in syntax_rules(self.grammar) {
            symbols.push(SymbolInfo {
                name: name.to_owned(),
                named: true,
                visible: !name.starts_with('_'),
                kind: SymbolKind::Rule,
            });
        }
        for aux in &self.aux {
            symbols.push(SymbolInfo {
                name: aux.name.clone(),
                named: false,
                visible: false,
                kind: SymbolKind::Repeat,
            });
        }

        let mut field_names: Vec<String> = rule_alts
            .iter()
            .chain(self.aux.iter().map(|aux| &aux.alts))
            .flatten()
            .flat_map(|alt| alt.items.iter().filter_map(|(_, f)| f.clone()))
            .collect();
        field_names.sort();
        field_names.dedup();

        let to_prod = |symbol: SymbolId, alt: &Alt| Prod {
            symbol,
            rhs: alt.items.iter().map(|(sym, _)| id(*sym)).collect(),
            fields: alt.items.iter().map(|(_, f)| f.clone()).collect(),
            prec: alt.prec.map_or(0, |(level, _)| level),
            assoc: alt.prec.map_or(Assoc::None, |(_, assoc)| assoc),
        };

        let mut productions = Vec::new();
        for (index, alts) in rule_alts.iter().enumerate() {
            let symbol = id(Sym::Rule(index));
            for alt in alts {
                productions.push(to_prod(symbol, alt));
            }
        }
        for (index, aux) in self.aux.iter().enumerate() {
            let symbol = id(Sym::Aux(index));
            for alt in &aux.alts {
                productions.push(to_prod(symbol, alt));
            }
        }
        if productions.len() >= u16::MAX as usize {
            return Err(GrammarError::TooLarge(format!(
                "{} productions",
                productions.len()
            )));
        }

        let start = id(Sym::Rule(0));
        productions.push(Prod {
            symbol: SYMBOL_ERROR,
            rhs: vec![start],
            fields: vec![None],
            prec: 0,
            assoc: Assoc::None,
        });

        Ok(Prepared {
            name: self.grammar.name.clone(),
            symbols,
            tokens,
            skips,
            extra_tokens: extra_syms.into_iter().map(id).collect(),
            productions,
            fields: field_names,
            start,
        })
    }
}
