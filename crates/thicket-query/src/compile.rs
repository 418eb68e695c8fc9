//! Lowering of parsed patterns into step programs.
//!
//! Each top-level pattern becomes a small NFA over a pre-order walk of the tree:
//! [`Step::Node`] consumes one node at a depth relative to the pattern's first
//! node, [`Step::Split`] and [`Step::Jump`] encode alternation and repetition,
//! and [`Step::Done`] ends the program. Node kinds, fields and parent/child
//! pairings are checked against the language while lowering.

use std::collections::BTreeMap;
use std::collections::HashSet;

use rowan::TextRange;
use thicket_core::{FieldId, Interner, Language, NodeTypes, SymbolId};

use crate::error::{QueryError, QueryErrorKind};
use crate::parser::SyntaxToken;
use crate::parser::ast::{self, Expr, MissingKind, PredicateArg, QuantifierOp, TreeHead};
use crate::query::{CaptureQuantifier, PredicateStep, QueryPredicate, QueryPredicateArg};

/// What a node step accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Matcher {
    /// `_`: any node.
    Any,
    /// `(_)`: any named node.
    AnyNamed,
    Symbol(SymbolId),
    Error,
    Missing(Option<SymbolId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NodeStep {
    /// Depth below the pattern's outermost nodes.
    pub depth: usize,
    pub matcher: Matcher,
    pub field: Option<FieldId>,
    pub negated_fields: Vec<FieldId>,
    pub captures: Vec<u32>,
    /// Anchored to the previous sibling step, or to the parent's first named child.
    pub immediate: bool,
    /// Anchored to the parent's last named child.
    pub last_child: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    Node(NodeStep),
    /// Continue at the next step and also at `target`.
    Split(usize),
    Jump(usize),
    Done,
}

/// One compiled top-level pattern.
#[derive(Debug, Clone)]
pub(crate) struct Pattern {
    pub steps: Vec<Step>,
    pub start_byte: usize,
    pub max_depth: usize,
    pub predicate_steps: Vec<PredicateStep>,
    pub predicates: Vec<QueryPredicate>,
    pub capture_quantifiers: BTreeMap<u32, CaptureQuantifier>,
    pub rooted: bool,
    pub disabled: bool,
}

impl Pattern {
    pub(crate) fn node_step(&self, pc: usize) -> Option<&NodeStep> {
        match &self.steps[pc] {
            Step::Node(step) => Some(step),
            _ => None,
        }
    }

    /// Node and `Done` steps reachable from `pc` without consuming a node, in priority order.
    pub(crate) fn closure(&self, pc: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![pc];
        while let Some(pc) = stack.pop() {
            if !visited.insert(pc) {
                continue;
            }
            match self.steps[pc] {
                Step::Node(_) | Step::Done => out.push(pc),
                Step::Jump(target) => stack.push(target),
                Step::Split(target) => {
                    stack.push(target);
                    stack.push(pc + 1);
                }
            }
        }
        out
    }
}

/// Result of lowering one expression.
#[derive(Debug, Default)]
struct Fragment {
    /// Node steps that can consume the expression's first node.
    heads: Vec<usize>,
    /// Node steps that can consume its last node at the same depth.
    tails: Vec<usize>,
    /// How many times the head nodes match.
    repeat: CaptureQuantifier,
    quantifiers: BTreeMap<u32, CaptureQuantifier>,
}

/// Where an expression sits, for structure checks.
#[derive(Debug, Clone, Copy, Default)]
struct Context {
    parent: Option<SymbolId>,
    field: Option<FieldId>,
}

pub(crate) struct Compiler<'a> {
    language: &'a Language,
    source: &'a str,
    captures: &'a mut Interner,
    strings: &'a mut Interner,
    steps: Vec<Step>,
    pending_predicates: Vec<ast::Predicate>,
    declared: HashSet<u32>,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(
        language: &'a Language,
        source: &'a str,
        captures: &'a mut Interner,
        strings: &'a mut Interner,
    ) -> Self {
        Self {
            language,
            source,
            captures,
            strings,
            steps: Vec::new(),
            pending_predicates: Vec::new(),
            declared: HashSet::new(),
        }
    }

    pub(crate) fn compile_pattern(&mut self, expr: &Expr) -> Result<Pattern, QueryError> {
        self.steps.clear();
        self.pending_predicates.clear();
        self.declared.clear();

        let fragment = self.compile_expr(expr, 0, Context::default(), None)?;
        self.steps.push(Step::Done);

        let steps = std::mem::take(&mut self.steps);
        let max_depth = steps
            .iter()
            .filter_map(|s| match s {
                Step::Node(n) => Some(n.depth),
                _ => None,
            })
            .max()
            .unwrap_or(0);

        let mut pattern = Pattern {
            steps,
            start_byte: expr.text_range().start().into(),
            max_depth,
            predicate_steps: Vec::new(),
            predicates: Vec::new(),
            capture_quantifiers: fragment.quantifiers,
            rooted: is_rooted(expr),
            disabled: false,
        };

        if pattern.closure(0).iter().any(|&pc| pattern.steps[pc] == Step::Done) {
            return Err(self.error(
                expr.text_range(),
                QueryErrorKind::Syntax,
                "pattern must match at least one node",
            ));
        }

        for predicate in std::mem::take(&mut self.pending_predicates) {
            self.compile_predicate(&predicate, &mut pattern)?;
        }
        Ok(pattern)
    }

    fn compile_expr(
        &mut self,
        expr: &Expr,
        depth: usize,
        ctx: Context,
        parent_step: Option<usize>,
    ) -> Result<Fragment, QueryError> {
        match expr {
            Expr::Tree(tree) => self.compile_tree(tree, depth, ctx),
            Expr::Str(s) => {
                let symbol = self.anonymous_symbol(s)?;
                self.check_child(ctx, symbol, s.text_range())?;
                Ok(self.push_leaf(depth, Matcher::Symbol(symbol)))
            }
            Expr::Wildcard(_) => Ok(self.push_leaf(depth, Matcher::Any)),
            Expr::Group(group) => {
                let items: Vec<Expr> = group.children().collect();
                self.compile_sequence(&items, depth, ctx, parent_step, group.text_range())
            }
            Expr::Alt(alt) => self.compile_alt(alt, depth, ctx, parent_step),
            Expr::Quantifier(q) => self.compile_quantifier(q, depth, ctx, parent_step),
            Expr::Capture(capture) => self.compile_capture(capture, depth, ctx, parent_step),
            Expr::Field(field) => self.compile_field(field, depth, ctx, parent_step),
            Expr::Anchor(_) | Expr::NegatedField(_) | Expr::Predicate(_) => Err(self.error(
                expr.text_range(),
                QueryErrorKind::Syntax,
                "expected a pattern",
            )),
        }
    }

    fn push_leaf(&mut self, depth: usize, matcher: Matcher) -> Fragment {
        let index = self.steps.len();
        self.steps.push(Step::Node(NodeStep {
            depth,
            matcher,
            field: None,
            negated_fields: Vec::new(),
            captures: Vec::new(),
            immediate: false,
            last_child: false,
        }));
        Fragment {
            heads: vec![index],
            tails: vec![index],
            repeat: CaptureQuantifier::One,
            quantifiers: BTreeMap::new(),
        }
    }

    fn compile_tree(
        &mut self,
        tree: &ast::Tree,
        depth: usize,
        ctx: Context,
    ) -> Result<Fragment, QueryError> {
        let range = tree.text_range();
        let Some(head) = tree.head() else {
            return Err(self.error(range, QueryErrorKind::Syntax, "expected a node kind"));
        };

        let matcher = match head {
            TreeHead::Kind(token) => {
                let symbol = self.named_symbol(token.text(), token.text_range())?;
                self.check_child(ctx, symbol, range)?;
                Matcher::Symbol(symbol)
            }
            TreeHead::AnyNamed => Matcher::AnyNamed,
            TreeHead::Error => Matcher::Error,
            TreeHead::Missing(None) => Matcher::Missing(None),
            TreeHead::Missing(Some(MissingKind::Named(token))) => {
                Matcher::Missing(Some(self.named_symbol(token.text(), token.text_range())?))
            }
            TreeHead::Missing(Some(MissingKind::Anonymous(s))) => {
                Matcher::Missing(Some(self.anonymous_symbol(&s)?))
            }
        };

        let fragment = self.push_leaf(depth, matcher);
        let index = fragment.heads[0];
        let items: Vec<Expr> = tree.children().collect();
        if items.is_empty() {
            return Ok(fragment);
        }
        if matches!(matcher, Matcher::Missing(_)) {
            return Err(self.error(
                items[0].text_range(),
                QueryErrorKind::Syntax,
                "`MISSING` patterns can't have children",
            ));
        }

        let child_ctx = Context {
            parent: match matcher {
                Matcher::Symbol(symbol) => Some(symbol),
                _ => None,
            },
            field: None,
        };
        let children = self.compile_sequence(&items, depth + 1, child_ctx, Some(index), range)?;
        Ok(Fragment {
            quantifiers: children.quantifiers,
            ..fragment
        })
    }

    /// Sibling patterns with their anchors, negated fields and predicates.
    fn compile_sequence(
        &mut self,
        items: &[Expr],
        depth: usize,
        ctx: Context,
        parent_step: Option<usize>,
        range: TextRange,
    ) -> Result<Fragment, QueryError> {
        let mut fragments: Vec<Fragment> = Vec::new();
        let mut anchor: Option<TextRange> = None;

        for item in items {
            match item {
                Expr::Anchor(a) => anchor = Some(a.text_range()),
                Expr::NegatedField(negated) => {
                    let Some(step) = parent_step else {
                        return Err(self.error(
                            negated.text_range(),
                            QueryErrorKind::Syntax,
                            "negated field must be inside a node pattern",
                        ));
                    };
                    let field = self.field_id(negated.name(), negated.text_range())?;
                    if let Step::Node(node) = &mut self.steps[step] {
                        node.negated_fields.push(field);
                    }
                }
                Expr::Predicate(predicate) => self.pending_predicates.push(predicate.clone()),
                pattern => {
                    let fragment = self.compile_expr(pattern, depth, ctx, parent_step)?;
                    if let Some(anchor_range) = anchor.take() {
                        if fragments.is_empty() && parent_step.is_none() && depth == 0 {
                            return Err(self.error(
                                anchor_range,
                                QueryErrorKind::Syntax,
                                "anchor at the start of a top-level group has no parent",
                            ));
                        }
                        for &head in &fragment.heads {
                            self.node_mut(head).immediate = true;
                        }
                    }
                    fragments.push(fragment);
                }
            }
        }

        if let Some(anchor_range) = anchor {
            let Some(last) = fragments.last() else {
                return Err(self.error(
                    anchor_range,
                    QueryErrorKind::Syntax,
                    "anchor needs a sibling pattern",
                ));
            };
            if parent_step.is_none() && depth == 0 {
                return Err(self.error(
                    anchor_range,
                    QueryErrorKind::Syntax,
                    "anchor at the end of a top-level group has no parent",
                ));
            }
            for &tail in &last.tails {
                self.node_mut(tail).last_child = true;
            }
        }

        if fragments.is_empty() {
            if parent_step.is_some() {
                return Ok(Fragment::default());
            }
            return Err(self.error(range, QueryErrorKind::Syntax, "group has no patterns"));
        }

        let mut quantifiers = BTreeMap::new();
        for fragment in &fragments {
            quantifiers = merge(&quantifiers, &fragment.quantifiers, CaptureQuantifier::add);
        }

        // Leading items that may match nothing expose the item after them as a
        // possible first node; trailing ones do the same for the last node.
        let mut heads = Vec::new();
        let mut repeat = CaptureQuantifier::Zero;
        for fragment in &fragments {
            heads.extend_from_slice(&fragment.heads);
            repeat = repeat.add(fragment.repeat);
            if !fragment.repeat.is_optional() {
                break;
            }
        }
        let mut tails = Vec::new();
        for fragment in fragments.iter().rev() {
            tails.extend_from_slice(&fragment.tails);
            if !fragment.repeat.is_optional() {
                break;
            }
        }

        Ok(Fragment {
            heads,
            tails,
            repeat,
            quantifiers,
        })
    }

    fn compile_alt(
        &mut self,
        alt: &ast::Alt,
        depth: usize,
        ctx: Context,
        parent_step: Option<usize>,
    ) -> Result<Fragment, QueryError> {
        let branches: Vec<Expr> = alt.branches().collect();
        if branches.is_empty() {
            return Err(self.error(
                alt.text_range(),
                QueryErrorKind::Syntax,
                "alternation has no branches",
            ));
        }

        let mut result: Option<Fragment> = None;
        let mut jumps = Vec::new();
        for (i, branch) in branches.iter().enumerate() {
            let is_last = i + 1 == branches.len();
            let split = (!is_last).then(|| {
                self.steps.push(Step::Split(usize::MAX));
                self.steps.len() - 1
            });

            let fragment = self.compile_expr(branch, depth, ctx, parent_step)?;

            if let Some(split) = split {
                jumps.push(self.steps.len());
                self.steps.push(Step::Jump(usize::MAX));
                self.steps[split] = Step::Split(self.steps.len());
            }

            result = Some(match result {
                None => fragment,
                Some(acc) => Fragment {
                    heads: [acc.heads, fragment.heads].concat(),
                    tails: [acc.tails, fragment.tails].concat(),
                    repeat: acc.repeat.join(fragment.repeat),
                    quantifiers: merge(&acc.quantifiers, &fragment.quantifiers, CaptureQuantifier::join),
                },
            });
        }

        let end = self.steps.len();
        for jump in jumps {
            self.steps[jump] = Step::Jump(end);
        }
        Ok(result.unwrap_or_default())
    }

    fn compile_quantifier(
        &mut self,
        quantifier: &ast::Quantifier,
        depth: usize,
        ctx: Context,
        parent_step: Option<usize>,
    ) -> Result<Fragment, QueryError> {
        let (Some(inner), Some(op)) = (quantifier.inner(), quantifier.op()) else {
            return Err(self.error(
                quantifier.text_range(),
                QueryErrorKind::Syntax,
                "malformed quantifier",
            ));
        };

        let start = self.steps.len();
        let fragment = match op {
            QuantifierOp::Optional => {
                self.steps.push(Step::Split(usize::MAX));
                let fragment = self.compile_expr(&inner, depth, ctx, parent_step)?;
                self.steps[start] = Step::Split(self.steps.len());
                fragment
            }
            QuantifierOp::ZeroOrMore => {
                self.steps.push(Step::Split(usize::MAX));
                let fragment = self.compile_expr(&inner, depth, ctx, parent_step)?;
                self.steps.push(Step::Jump(start));
                self.steps[start] = Step::Split(self.steps.len());
                fragment
            }
            QuantifierOp::OneOrMore => {
                let fragment = self.compile_expr(&inner, depth, ctx, parent_step)?;
                self.steps.push(Step::Split(start));
                fragment
            }
        };

        Ok(Fragment {
            repeat: fragment.repeat.repeated(op),
            quantifiers: fragment
                .quantifiers
                .iter()
                .map(|(&id, q)| (id, q.repeated(op)))
                .collect(),
            ..fragment
        })
    }

    fn compile_capture(
        &mut self,
        capture: &ast::Capture,
        depth: usize,
        ctx: Context,
        parent_step: Option<usize>,
    ) -> Result<Fragment, QueryError> {
        let (Some(inner), Some(name)) = (capture.inner(), capture.name()) else {
            return Err(self.error(
                capture.text_range(),
                QueryErrorKind::Syntax,
                "malformed capture",
            ));
        };
        let fragment = self.compile_expr(&inner, depth, ctx, parent_step)?;

        let id = self.captures.intern(&name).index() as u32;
        self.declared.insert(id);
        for &head in &fragment.heads {
            let step = self.node_mut(head);
            if !step.captures.contains(&id) {
                step.captures.push(id);
            }
        }

        let own = BTreeMap::from([(id, fragment.repeat)]);
        Ok(Fragment {
            quantifiers: merge(&fragment.quantifiers, &own, CaptureQuantifier::add),
            ..fragment
        })
    }

    fn compile_field(
        &mut self,
        field: &ast::Field,
        depth: usize,
        ctx: Context,
        parent_step: Option<usize>,
    ) -> Result<Fragment, QueryError> {
        let name = field.name();
        let id = self.field_id(name.clone(), field.text_range())?;

        if let Some(parent) = ctx.parent {
            let types = self.language.node_types();
            if types.contains(parent) && !types.has_field(parent, id) {
                let range = name.map_or(field.text_range(), |t| t.text_range());
                return Err(self.error(
                    range,
                    QueryErrorKind::Structure,
                    format!(
                        "`{}` has no field `{}`",
                        self.language.symbol_name(parent),
                        self.language.field_name_for_id(id).unwrap_or_default()
                    ),
                ));
            }
        }

        let Some(value) = field.value() else {
            return Err(self.error(
                field.text_range(),
                QueryErrorKind::Syntax,
                "expected a pattern after the field name",
            ));
        };
        let value_ctx = Context {
            field: Some(id),
            ..ctx
        };
        let fragment = self.compile_expr(&value, depth, value_ctx, parent_step)?;
        for &head in &fragment.heads {
            self.node_mut(head).field = Some(id);
        }
        Ok(fragment)
    }

    fn compile_predicate(
        &mut self,
        predicate: &ast::Predicate,
        pattern: &mut Pattern,
    ) -> Result<(), QueryError> {
        let Some(operator) = predicate.name() else {
            return Err(self.error(
                predicate.text_range(),
                QueryErrorKind::Predicate,
                "predicate has no name",
            ));
        };

        let operator_id = self.strings.intern(&operator).index() as u32;
        pattern.predicate_steps.push(PredicateStep::String(operator_id));

        let mut args = Vec::new();
        for arg in predicate.args() {
            match arg {
                PredicateArg::Capture(name, range) => {
                    let id = self
                        .captures
                        .get(&name)
                        .map(|id| id.index() as u32)
                        .filter(|id| self.declared.contains(id));
                    let Some(id) = id else {
                        return Err(self.error(
                            range,
                            QueryErrorKind::Capture,
                            format!("`@{name}` is not captured by this pattern"),
                        ));
                    };
                    pattern.predicate_steps.push(PredicateStep::Capture(id));
                    args.push(QueryPredicateArg::Capture(id));
                }
                PredicateArg::String(value) => {
                    let id = self.strings.intern(&value).index() as u32;
                    pattern.predicate_steps.push(PredicateStep::String(id));
                    args.push(QueryPredicateArg::String(value));
                }
            }
        }
        pattern.predicate_steps.push(PredicateStep::Done);
        pattern.predicates.push(QueryPredicate { operator, args });
        Ok(())
    }

    fn node_mut(&mut self, pc: usize) -> &mut NodeStep {
        match &mut self.steps[pc] {
            Step::Node(step) => step,
            other => unreachable!("step {pc} is not a node step: {other:?}"),
        }
    }

    fn named_symbol(&self, name: &str, range: TextRange) -> Result<SymbolId, QueryError> {
        self.language
            .symbol_for_name(name, true)
            .filter(|&symbol| self.language.symbol_is_visible(symbol))
            .ok_or_else(|| {
                self.error(
                    range,
                    QueryErrorKind::NodeType,
                    format!("`{name}` is not a node kind of {}", self.language.name()),
                )
            })
    }

    fn anonymous_symbol(&self, s: &ast::Str) -> Result<SymbolId, QueryError> {
        let value = s.value();
        self.language
            .symbol_for_name(&value, false)
            .filter(|&symbol| self.language.symbol_is_visible(symbol))
            .ok_or_else(|| {
                self.error(
                    s.text_range(),
                    QueryErrorKind::NodeType,
                    format!("{value:?} is not a token of {}", self.language.name()),
                )
            })
    }

    fn field_id(
        &self,
        name: Option<SyntaxToken>,
        fallback: TextRange,
    ) -> Result<FieldId, QueryError> {
        let Some(token) = name else {
            return Err(self.error(fallback, QueryErrorKind::Syntax, "expected a field name"));
        };
        self.language.field_id_for_name(token.text()).ok_or_else(|| {
            self.error(
                token.text_range(),
                QueryErrorKind::Field,
                format!("`{}` is not a field of {}", token.text(), self.language.name()),
            )
        })
    }

    /// Rejects a child kind its parent can never hold.
    fn check_child(&self, ctx: Context, child: SymbolId, range: TextRange) -> Result<(), QueryError> {
        let Some(parent) = ctx.parent else {
            return Ok(());
        };
        let types = self.language.node_types();
        if !types.contains(parent) || types.is_extra(child) {
            return Ok(());
        }

        let parent_name = self.language.symbol_name(parent);
        let child_name = self.language.symbol_name(child);
        match ctx.field {
            Some(field) => {
                if types.valid_field_types(parent, field).contains(&child) {
                    return Ok(());
                }
                let field_name = self.language.field_name_for_id(field).unwrap_or_default();
                Err(self.error(
                    range,
                    QueryErrorKind::Structure,
                    format!("`{child_name}` can't be the `{field_name}` of `{parent_name}`"),
                ))
            }
            None => {
                if !self.language.symbol_is_named(child) || types.can_contain(parent, child) {
                    return Ok(());
                }
                Err(self.error(
                    range,
                    QueryErrorKind::Structure,
                    format!("`{parent_name}` can't contain `{child_name}`"),
                ))
            }
        }
    }

    fn error(
        &self,
        range: TextRange,
        kind: QueryErrorKind,
        message: impl Into<String>,
    ) -> QueryError {
        QueryError::new(self.source, range.into(), kind, message)
    }
}

fn merge(
    a: &BTreeMap<u32, CaptureQuantifier>,
    b: &BTreeMap<u32, CaptureQuantifier>,
    op: fn(CaptureQuantifier, CaptureQuantifier) -> CaptureQuantifier,
) -> BTreeMap<u32, CaptureQuantifier> {
    let mut out = BTreeMap::new();
    for &id in a.keys().chain(b.keys()) {
        let left = a.get(&id).copied().unwrap_or(CaptureQuantifier::Zero);
        let right = b.get(&id).copied().unwrap_or(CaptureQuantifier::Zero);
        out.insert(id, op(left, right));
    }
    out
}

/// A pattern is rooted when every match starts from a single node.
fn is_rooted(expr: &Expr) -> bool {
    match expr {
        Expr::Capture(c) => c.inner().is_some_and(|e| is_rooted(&e)),
        Expr::Field(f) => f.value().is_some_and(|e| is_rooted(&e)),
        Expr::Quantifier(q) => {
            q.op() == Some(QuantifierOp::Optional) && q.inner().is_some_and(|e| is_rooted(&e))
        }
        Expr::Alt(alt) => alt.branches().all(|b| is_rooted(&b)),
        Expr::Group(group) => {
            let patterns: Vec<Expr> = group
                .children()
                .filter(|e| {
                    !matches!(e, Expr::Anchor(_) | Expr::Predicate(_) | Expr::NegatedField(_))
                })
                .collect();
            patterns.len() == 1 && is_rooted(&patterns[0])
        }
        _ => true,
    }
}
