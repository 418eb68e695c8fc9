//! Compiled queries.

use thicket_core::{Interner, Language, StringId};

use crate::compile::{Compiler, Pattern, Step};
use crate::error::{QueryError, QueryErrorKind};
use crate::parser::{self, ast::QuantifierOp};

/// How many nodes a capture can bind within one match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CaptureQuantifier {
    #[default]
    Zero,
    ZeroOrOne,
    ZeroOrMore,
    One,
    OneOrMore,
}

impl CaptureQuantifier {
    /// `(min, max)` with `None` standing for unbounded.
    fn bounds(self) -> (u8, Option<u8>) {
        match self {
            Self::Zero => (0, Some(0)),
            Self::ZeroOrOne => (0, Some(1)),
            Self::ZeroOrMore => (0, None),
            Self::One => (1, Some(1)),
            Self::OneOrMore => (1, None),
        }
    }

    fn from_bounds(min: u8, max: Option<u8>) -> Self {
        match (min.min(1), max) {
            (_, Some(0)) => Self::Zero,
            (0, Some(1)) => Self::ZeroOrOne,
            (1, Some(1)) => Self::One,
            (0, _) => Self::ZeroOrMore,
            _ => Self::OneOrMore,
        }
    }

    /// Allows no match at all.
    pub fn is_optional(self) -> bool {
        self.bounds().0 == 0
    }

    /// Two patterns in sequence.
    pub fn add(self, other: Self) -> Self {
        let (a_min, a_max) = self.bounds();
        let (b_min, b_max) = other.bounds();
        let max = match (a_max, b_max) {
            (Some(a), Some(b)) if a + b <= 1 => Some(a + b),
            (Some(_), Some(_)) => None,
            _ => None,
        };
        Self::from_bounds(a_min + b_min, max)
    }

    /// Two alternatives.
    pub fn join(self, other: Self) -> Self {
        let (a_min, a_max) = self.bounds();
        let (b_min, b_max) = other.bounds();
        let max = match (a_max, b_max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
        Self::from_bounds(a_min.min(b_min), max)
    }

    pub(crate) fn repeated(self, op: QuantifierOp) -> Self {
        if self == Self::Zero {
            return self;
        }
        let (min, max) = self.bounds();
        match op {
            QuantifierOp::Optional => Self::from_bounds(0, max),
            QuantifierOp::ZeroOrMore => Self::ZeroOrMore,
            QuantifierOp::OneOrMore => Self::from_bounds(min, None),
        }
    }
}

/// Raw predicate program of a pattern: each predicate is a run of steps closed by `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateStep {
    Capture(u32),
    String(u32),
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryPredicateArg {
    Capture(u32),
    String(String),
}

/// A predicate with its name split off, e.g. `#eq?` with two arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryPredicate {
    pub operator: String,
    pub args: Vec<QueryPredicateArg>,
}

/// A set of patterns compiled against one language.
///
/// Capture and string ids are shared by all patterns. Predicates are recorded,
/// not evaluated.
#[derive(Debug, Clone)]
pub struct Query {
    language: Language,
    pub(crate) patterns: Vec<Pattern>,
    captures: Interner,
    strings: Interner,
}

impl Query {
    pub fn new(language: &Language, source: &str) -> Result<Self, QueryError> {
        if !language.is_compatible() {
            return Err(QueryError::new(
                source,
                0..0,
                QueryErrorKind::Language,
                format!(
                    "`{}` has descriptor version {}, which this engine can't read",
                    language.name(),
                    language.version()
                ),
            ));
        }

        let parse = parser::parse(source);
        if let Some(error) = parse.errors().first() {
            return Err(error.clone());
        }

        let mut captures = Interner::new();
        let mut strings = Interner::new();
        let mut compiler = Compiler::new(language, source, &mut captures, &mut strings);
        let patterns = parse
            .root()
            .exprs()
            .map(|expr| compiler.compile_pattern(&expr))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            language: language.clone(),
            patterns,
            captures,
            strings,
        })
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn capture_count(&self) -> usize {
        self.captures.len()
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    pub fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.captures.iter().map(|(_, name)| name)
    }

    pub fn capture_name_for_id(&self, id: u32) -> Option<&str> {
        self.captures.try_resolve(StringId::from_index(id as usize))
    }

    pub fn capture_index_for_name(&self, name: &str) -> Option<u32> {
        self.captures.get(name).map(|id| id.index() as u32)
    }

    pub fn string_value_for_id(&self, id: u32) -> Option<&str> {
        self.strings.try_resolve(StringId::from_index(id as usize))
    }

    /// Byte offset of the pattern in the query source.
    pub fn start_byte_for_pattern(&self, index: usize) -> Option<usize> {
        self.patterns.get(index).map(|p| p.start_byte)
    }

    pub fn predicates_for_pattern(&self, index: usize) -> &[PredicateStep] {
        self.patterns
            .get(index)
            .map_or(&[], |p| p.predicate_steps.as_slice())
    }

    pub fn general_predicates(&self, index: usize) -> &[QueryPredicate] {
        self.patterns
            .get(index)
            .map_or(&[], |p| p.predicates.as_slice())
    }

    /// Quantifier of every capture id in the pattern; `Zero` for captures it doesn't use.
    pub fn capture_quantifiers(&self, index: usize) -> Vec<CaptureQuantifier> {
        let Some(pattern) = self.patterns.get(index) else {
            return Vec::new();
        };
        (0..self.capture_count() as u32)
            .map(|id| {
                pattern
                    .capture_quantifiers
                    .get(&id)
                    .copied()
                    .unwrap_or_default()
            })
            .collect()
    }

    pub fn is_pattern_rooted(&self, index: usize) -> bool {
        self.patterns.get(index).is_some_and(|p| p.rooted)
    }

    /// Stops recording `name` in matches. The capture keeps its id.
    pub fn disable_capture(&mut self, name: &str) {
        let Some(id) = self.capture_index_for_name(name) else {
            return;
        };
        for pattern in &mut self.patterns {
            for step in &mut pattern.steps {
                if let Step::Node(node) = step {
                    node.captures.retain(|&c| c != id);
                }
            }
        }
    }

    /// Stops matching the pattern. Indices of other patterns don't change.
    pub fn disable_pattern(&mut self, index: usize) {
        if let Some(pattern) = self.patterns.get_mut(index) {
            pattern.disabled = true;
        }
    }

    pub fn is_pattern_disabled(&self, index: usize) -> bool {
        self.patterns.get(index).is_some_and(|p| p.disabled)
    }
}
