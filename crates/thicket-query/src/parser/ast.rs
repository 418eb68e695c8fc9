//! Typed AST wrappers over CST nodes.
//!
//! Each struct wraps a `SyntaxNode` and provides typed accessors. Accessors
//! return `None` where error recovery left a piece out.

use rowan::TextRange;

use super::cst::{SyntaxKind, SyntaxNode, SyntaxToken};
use super::lexer::unescape;

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl $name {
            pub fn cast(node: SyntaxNode) -> Option<Self> {
                (node.kind() == SyntaxKind::$kind).then(|| Self(node))
            }

            pub fn as_cst(&self) -> &SyntaxNode {
                &self.0
            }

            pub fn text_range(&self) -> TextRange {
                self.0.text_range()
            }
        }
    };
}

ast_node!(Root, Root);
ast_node!(Tree, Tree);
ast_node!(Group, Group);
ast_node!(Alt, Alt);
ast_node!(Str, Str);
ast_node!(Wildcard, Wildcard);
ast_node!(Anchor, Anchor);
ast_node!(Field, Field);
ast_node!(NegatedField, NegatedField);
ast_node!(Capture, Capture);
ast_node!(Quantifier, Quantifier);
ast_node!(Predicate, Predicate);

/// Anything that can sit in a pattern's child list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Tree(Tree),
    Group(Group),
    Alt(Alt),
    Str(Str),
    Wildcard(Wildcard),
    Anchor(Anchor),
    Field(Field),
    NegatedField(NegatedField),
    Capture(Capture),
    Quantifier(Quantifier),
    Predicate(Predicate),
}

impl Expr {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::Tree => Tree::cast(node).map(Expr::Tree),
            SyntaxKind::Group => Group::cast(node).map(Expr::Group),
            SyntaxKind::Alt => Alt::cast(node).map(Expr::Alt),
            SyntaxKind::Str => Str::cast(node).map(Expr::Str),
            SyntaxKind::Wildcard => Wildcard::cast(node).map(Expr::Wildcard),
            SyntaxKind::Anchor => Anchor::cast(node).map(Expr::Anchor),
            SyntaxKind::Field => Field::cast(node).map(Expr::Field),
            SyntaxKind::NegatedField => NegatedField::cast(node).map(Expr::NegatedField),
            SyntaxKind::Capture => Capture::cast(node).map(Expr::Capture),
            SyntaxKind::Quantifier => Quantifier::cast(node).map(Expr::Quantifier),
            SyntaxKind::Predicate => Predicate::cast(node).map(Expr::Predicate),
            _ => None,
        }
    }

    pub fn as_cst(&self) -> &SyntaxNode {
        match self {
            Expr::Tree(n) => n.as_cst(),
            Expr::Group(n) => n.as_cst(),
            Expr::Alt(n) => n.as_cst(),
            Expr::Str(n) => n.as_cst(),
            Expr::Wildcard(n) => n.as_cst(),
            Expr::Anchor(n) => n.as_cst(),
            Expr::Field(n) => n.as_cst(),
            Expr::NegatedField(n) => n.as_cst(),
            Expr::Capture(n) => n.as_cst(),
            Expr::Quantifier(n) => n.as_cst(),
            Expr::Predicate(n) => n.as_cst(),
        }
    }

    pub fn text_range(&self) -> TextRange {
        self.as_cst().text_range()
    }
}

fn token(node: &SyntaxNode, pred: impl Fn(SyntaxKind) -> bool) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|it| it.into_token())
        .find(|t| pred(t.kind()))
}

fn children(node: &SyntaxNode) -> impl Iterator<Item = Expr> + '_ {
    node.children().filter_map(Expr::cast)
}

impl Root {
    pub fn exprs(&self) -> impl Iterator<Item = Expr> + '_ {
        children(&self.0)
    }
}

/// What a `( ... )` node pattern matches by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeHead {
    Kind(SyntaxToken),
    /// `(_)`
    AnyNamed,
    /// `(ERROR)`
    Error,
    /// `(MISSING)`, optionally restricted to a token or node kind.
    Missing(Option<MissingKind>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingKind {
    Named(SyntaxToken),
    Anonymous(Str),
}

impl Tree {
    pub fn head(&self) -> Option<TreeHead> {
        let head = token(&self.0, |k| {
            matches!(
                k,
                SyntaxKind::Id | SyntaxKind::Underscore | SyntaxKind::KwError | SyntaxKind::KwMissing
            )
        })?;
        Some(match head.kind() {
            SyntaxKind::Underscore => TreeHead::AnyNamed,
            SyntaxKind::KwError => TreeHead::Error,
            SyntaxKind::KwMissing => {
                let named = token(&self.0, |k| k == SyntaxKind::Id).map(MissingKind::Named);
                let anonymous = self.0.children().find_map(Str::cast).map(MissingKind::Anonymous);
                TreeHead::Missing(named.or(anonymous))
            }
            _ => TreeHead::Kind(head),
        })
    }

    /// Child patterns, excluding the string operand of `(MISSING "x")`.
    pub fn children(&self) -> impl Iterator<Item = Expr> + '_ {
        let is_missing = token(&self.0, |k| k == SyntaxKind::KwMissing).is_some();
        children(&self.0)
            .skip_while(move |e| is_missing && matches!(e, Expr::Str(_)))
    }
}

impl Group {
    pub fn children(&self) -> impl Iterator<Item = Expr> + '_ {
        children(&self.0)
    }
}

impl Alt {
    pub fn branches(&self) -> impl Iterator<Item = Expr> + '_ {
        children(&self.0)
    }
}

impl Str {
    /// Decoded literal value.
    pub fn value(&self) -> String {
        token(&self.0, |k| k == SyntaxKind::StrVal)
            .map(|t| unescape(t.text()))
            .unwrap_or_default()
    }
}

impl Field {
    pub fn name(&self) -> Option<SyntaxToken> {
        token(&self.0, |k| k == SyntaxKind::Id)
    }

    pub fn value(&self) -> Option<Expr> {
        children(&self.0).next()
    }
}

impl NegatedField {
    pub fn name(&self) -> Option<SyntaxToken> {
        token(&self.0, |k| k == SyntaxKind::Id)
    }
}

impl Capture {
    pub fn inner(&self) -> Option<Expr> {
        children(&self.0).next()
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        token(&self.0, |k| k == SyntaxKind::CaptureName)
    }

    /// Capture name without the `@` sigil.
    pub fn name(&self) -> Option<String> {
        self.name_token().map(|t| t.text()[1..].to_owned())
    }
}

/// Repetition operator of a [`Quantifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantifierOp {
    /// `?`
    Optional,
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
}

impl Quantifier {
    pub fn inner(&self) -> Option<Expr> {
        children(&self.0).next()
    }

    pub fn op(&self) -> Option<QuantifierOp> {
        let op = token(&self.0, |k| {
            matches!(k, SyntaxKind::Star | SyntaxKind::Plus | SyntaxKind::Question)
        })?;
        Some(match op.kind() {
            SyntaxKind::Star => QuantifierOp::ZeroOrMore,
            SyntaxKind::Plus => QuantifierOp::OneOrMore,
            _ => QuantifierOp::Optional,
        })
    }
}

/// One argument of a [`Predicate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredicateArg {
    /// `@name`, without the sigil.
    Capture(String, TextRange),
    /// `"text"` or a bare identifier.
    String(String),
}

impl Predicate {
    /// Predicate name without the `#` sigil, suffix included.
    pub fn name(&self) -> Option<String> {
        token(&self.0, |k| k == SyntaxKind::PredicateName).map(|t| t.text()[1..].to_owned())
    }

    pub fn args(&self) -> Vec<PredicateArg> {
        self.0
            .children_with_tokens()
            .filter_map(|element| match element {
                rowan::NodeOrToken::Token(t) if t.kind() == SyntaxKind::CaptureName => Some(
                    PredicateArg::Capture(t.text()[1..].to_owned(), t.text_range()),
                ),
                rowan::NodeOrToken::Token(t) if t.kind() == SyntaxKind::Id => {
                    Some(PredicateArg::String(t.text().to_owned()))
                }
                rowan::NodeOrToken::Node(n) => Str::cast(n).map(|s| PredicateArg::String(s.value())),
                _ => None,
            })
            .collect()
    }
}
