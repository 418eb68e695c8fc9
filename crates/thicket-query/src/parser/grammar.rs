//! Grammar productions for the query language.
//!
//! ```text
//! root       = pattern*
//! pattern    = (tree | group | alt | str | wildcard | field) suffix*
//! suffix     = '*' | '+' | '?' | '@name'
//! tree       = '(' (kind | '_' | 'ERROR' | 'MISSING' (kind | str)?) child* ')'
//! group      = '(' child+ ')'            ; first child starts with '(' '[' '"' or '.'
//! alt        = '[' pattern* ']'
//! child      = pattern | anchor | negated | predicate
//! field      = name ':' pattern
//! negated    = '!' name
//! predicate  = '(' '#name' (capture | str | identifier)* ')'
//! ```

use super::core::Parser;
use super::cst::SyntaxKind::{self, *};
use super::cst::token_sets::{ARGUMENTS, PATTERN_FIRST, QUANTIFIERS, ROOT_PATTERN_FIRST};
use crate::error::QueryErrorKind;

impl Parser<'_> {
    pub(super) fn parse_root(&mut self) {
        self.start_node(Root);

        while !self.eof() {
            let kind = self.current();
            if kind == ParenOpen && self.next_is(PredicateName) {
                self.error("predicate must be inside a pattern");
                self.parse_predicate();
                continue;
            }
            if ROOT_PATTERN_FIRST.contains(kind) {
                self.parse_pattern();
                continue;
            }
            match kind {
                Id if self.next_is(Colon) => {
                    self.error("field must be inside a node pattern");
                    self.parse_pattern();
                }
                Dot => self.error_and_bump("anchor must be inside a node pattern"),
                Negation => self.error_and_bump("negated field must be inside a node pattern"),
                _ => self.error_unexpected(),
            }
        }

        self.drain_trivia();
        self.finish_node();
    }

    /// A pattern with its quantifier and capture suffixes.
    fn parse_pattern(&mut self) {
        if !self.enter_recursion() {
            self.error("patterns nested too deeply");
            self.start_node(Error);
            while !self.eof() {
                self.bump();
            }
            self.finish_node();
            return;
        }

        let checkpoint = self.checkpoint();
        match self.current() {
            ParenOpen => self.parse_parenthesized(),
            BracketOpen => self.parse_alt(),
            Underscore => self.parse_wildcard(),
            DoubleQuote => self.parse_str(),
            Id if self.next_is(Colon) => self.parse_field(),
            Id => {
                let text = self.current_text();
                self.error_and_bump(format!("node kinds must be parenthesized, as in `({text})`"));
            }
            _ => self.error_unexpected(),
        }

        loop {
            match self.current() {
                kind if QUANTIFIERS.contains(kind) => {
                    self.start_node_at(checkpoint, Quantifier);
                    self.bump();
                    self.finish_node();
                }
                CaptureName => {
                    self.start_node_at(checkpoint, Capture);
                    self.bump();
                    self.finish_node();
                }
                At => self.error_and_bump("expected a capture name after `@`"),
                _ => break,
            }
        }

        self.exit_recursion();
    }

    /// `(` starts a node, a group or a predicate depending on what follows.
    fn parse_parenthesized(&mut self) {
        match self.peek_nth(1) {
            ParenOpen | BracketOpen | DoubleQuote | Dot => self.parse_group(),
            PredicateName => {
                self.error("predicate must follow the patterns it tests");
                self.parse_predicate();
            }
            _ => self.parse_tree(),
        }
    }

    fn parse_tree(&mut self) {
        self.start_node(Tree);
        self.push_delimiter(ParenOpen);
        self.bump();

        match self.current() {
            Id | Underscore | KwError => self.bump(),
            KwMissing => {
                self.bump();
                match self.current() {
                    Id => self.bump(),
                    DoubleQuote => self.parse_str(),
                    _ => {}
                }
            }
            ParenClose => self.error("empty pattern `()`"),
            _ => self.error("expected a node kind or `_` after `(`"),
        }

        self.parse_children(ParenClose);
        self.close(ParenClose);
        self.finish_node();
    }

    fn parse_group(&mut self) {
        self.start_node(Group);
        self.push_delimiter(ParenOpen);
        self.bump();
        self.parse_children(ParenClose);
        self.close(ParenClose);
        self.finish_node();
    }

    fn parse_alt(&mut self) {
        self.start_node(Alt);
        self.push_delimiter(BracketOpen);
        self.bump();

        loop {
            if self.eof() {
                self.error_unclosed();
                break;
            }
            match self.current() {
                BracketClose => break,
                Dot => self.error_and_bump("anchors are not allowed in alternations"),
                Negation => self.error_and_bump("negated fields are not allowed in alternations"),
                ParenOpen if self.next_is(PredicateName) => {
                    self.error("predicates are not allowed in alternations");
                    self.parse_predicate();
                }
                kind if PATTERN_FIRST.contains(kind) => self.parse_pattern(),
                _ => self.error_unexpected(),
            }
        }

        self.close(BracketClose);
        self.finish_node();
    }

    fn parse_children(&mut self, until: SyntaxKind) {
        loop {
            if self.eof() {
                self.error_unclosed();
                break;
            }
            let kind = self.current();
            if kind == until {
                break;
            }
            match kind {
                Dot => self.parse_anchor(),
                Negation => self.parse_negated_field(),
                ParenOpen if self.next_is(PredicateName) => self.parse_predicate(),
                kind if PATTERN_FIRST.contains(kind) => self.parse_pattern(),
                _ => self.error_unexpected(),
            }
        }
    }

    fn close(&mut self, closer: SyntaxKind) {
        self.eat_token(closer);
        self.pop_delimiter();
    }

    fn parse_field(&mut self) {
        self.start_node(Field);
        self.bump();
        self.expect(Colon, "`:` after field name");

        match self.current() {
            Dot | Negation => self.error("expected a pattern after the field name"),
            kind if PATTERN_FIRST.contains(kind) => self.parse_pattern(),
            _ => self.error("expected a pattern after the field name"),
        }

        self.finish_node();
    }

    fn parse_negated_field(&mut self) {
        self.start_node(NegatedField);
        self.bump();
        self.expect(Id, "field name after `!`");
        self.finish_node();
    }

    fn parse_anchor(&mut self) {
        self.start_node(Anchor);
        self.bump();
        self.finish_node();
    }

    fn parse_wildcard(&mut self) {
        self.start_node(Wildcard);
        self.bump();
        self.finish_node();
    }

    fn parse_str(&mut self) {
        self.start_node(Str);
        self.bump();
        self.eat_token(StrVal);
        self.expect(DoubleQuote, "closing `\"`");
        self.finish_node();
    }

    /// `(#name args...)`. Errors inside report as malformed predicates.
    fn parse_predicate(&mut self) {
        let outer = std::mem::replace(&mut self.error_kind, QueryErrorKind::Predicate);

        self.start_node(Predicate);
        self.push_delimiter(ParenOpen);
        self.bump();
        self.expect(PredicateName, "predicate name");

        loop {
            if self.eof() {
                self.error_unclosed();
                break;
            }
            match self.current() {
                ParenClose => break,
                DoubleQuote => self.parse_str(),
                kind if ARGUMENTS.contains(kind) => self.bump(),
                _ => self.error_and_bump("predicate arguments are captures, strings or identifiers"),
            }
        }

        self.close(ParenClose);
        self.finish_node();

        self.error_kind = outer;
    }

    fn error_unexpected(&mut self) {
        let kind = self.current();
        let message = match kind {
            ParenClose | BracketClose => "unmatched closing delimiter".to_owned(),
            CaptureName | At => "capture must follow a pattern".to_owned(),
            Star | Plus | Question => "quantifier must follow a pattern".to_owned(),
            KwError | KwMissing => {
                format!("`{}` must be parenthesized", self.current_text())
            }
            Garbage if self.current_text().starts_with('"') => {
                "unterminated string literal".to_owned()
            }
            _ => format!("unexpected `{}`", self.current_text()),
        };
        self.error_and_bump(message);
    }
}
