//! Node type information: which children and fields each node kind may carry.
//!
//! Two layers:
//! - **Serialization layer**: 1:1 mapping to the `node-types.json` shape
//! - **Analysis layer**: id-indexed structures for efficient lookups

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{FieldId, SymbolId};

// ============================================================================
// Serialization Layer
// ============================================================================

/// Raw node definition in `node-types.json` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(rename = "type")]
    pub type_name: String,
    pub named: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub root: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub extra: bool,
    #[serde(default, skip_serializing_if = "indexmap::IndexMap::is_empty")]
    pub fields: indexmap::IndexMap<String, RawCardinality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<RawCardinality>,
}

/// Cardinality constraints for a field or children slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCardinality {
    pub multiple: bool,
    pub required: bool,
    pub types: Vec<RawTypeRef>,
}

/// Reference to a node type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RawTypeRef {
    #[serde(rename = "type")]
    pub type_name: String,
    pub named: bool,
}

/// Parse `node-types.json` content into raw nodes.
pub fn parse_node_types(json: &str) -> Result<Vec<RawNode>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Render raw nodes as pretty `node-types.json`.
pub fn render_node_types(nodes: &[RawNode]) -> String {
    // Serializing plain data with string keys cannot fail.
    serde_json::to_string_pretty(nodes).unwrap_or_default()
}

// ============================================================================
// Analysis Layer
// ============================================================================

/// Cardinality info for a field or children slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinality {
    pub multiple: bool,
    pub required: bool,
}

/// Trait for node type constraint lookups.
///
/// Provides what the parse tables don't: root identification, extras and the
/// child/field shape of each node kind. Query compilation uses it to reject
/// patterns that can never match.
pub trait NodeTypes {
    fn root(&self) -> Option<SymbolId>;
    fn is_extra(&self, symbol: SymbolId) -> bool;
    fn contains(&self, symbol: SymbolId) -> bool;

    fn has_field(&self, symbol: SymbolId, field: FieldId) -> bool;
    fn field_cardinality(&self, symbol: SymbolId, field: FieldId) -> Option<Cardinality>;
    fn valid_field_types(&self, symbol: SymbolId, field: FieldId) -> &[SymbolId];

    fn children_cardinality(&self, symbol: SymbolId) -> Option<Cardinality>;
    fn valid_child_types(&self, symbol: SymbolId) -> &[SymbolId];

    /// True if `child` may appear under `symbol` anywhere: as a plain child or in any field.
    fn can_contain(&self, symbol: SymbolId, child: SymbolId) -> bool;
}

/// Information about a single field on a node type.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub cardinality: Cardinality,
    pub valid_types: Vec<SymbolId>,
}

/// Information about a node type's children (non-field children).
#[derive(Debug, Clone)]
pub struct ChildrenInfo {
    pub cardinality: Cardinality,
    pub valid_types: Vec<SymbolId>,
}

/// Complete node type information.
#[derive(Debug, Clone)]
pub struct NodeTypeInfo {
    pub name: String,
    pub named: bool,
    pub fields: HashMap<FieldId, FieldInfo>,
    pub children: Option<ChildrenInfo>,
}

/// Compiled node type database for a language.
#[derive(Debug, Clone, Default)]
pub struct DynamicNodeTypes {
    nodes: HashMap<SymbolId, NodeTypeInfo>,
    extras: Vec<SymbolId>,
    root: Option<SymbolId>,
}

impl DynamicNodeTypes {
    /// Build from raw nodes and id resolution functions.
    ///
    /// Entries whose names don't resolve are skipped.
    pub fn build<F, G>(raw_nodes: &[RawNode], symbol_for_name: F, field_for_name: G) -> Self
    where
        F: Fn(&str, bool) -> Option<SymbolId>,
        G: Fn(&str) -> Option<FieldId>,
    {
        let resolve_types = |raw: &RawCardinality| -> Vec<SymbolId> {
            raw.types
                .iter()
                .filter_map(|t| symbol_for_name(&t.type_name, t.named))
                .collect()
        };
        let cardinality = |raw: &RawCardinality| Cardinality {
            multiple: raw.multiple,
            required: raw.required,
        };

        let mut nodes = HashMap::new();
        let mut extras = Vec::new();
        let mut root = None;

        for raw in raw_nodes {
            let Some(symbol) = symbol_for_name(&raw.type_name, raw.named) else {
                continue;
            };
            if raw.root {
                root = Some(symbol);
            }
            if raw.extra {
                extras.push(symbol);
            }

            let fields = raw
                .fields
                .iter()
                .filter_map(|(name, card)| {
                    let field = field_for_name(name)?;
                    Some((
                        field,
                        FieldInfo {
                            cardinality: cardinality(card),
                            valid_types: resolve_types(card),
                        },
                    ))
                })
                .collect();

            let children = raw.children.as_ref().map(|card| ChildrenInfo {
                cardinality: cardinality(card),
                valid_types: resolve_types(card),
            });

            nodes.insert(
                symbol,
                NodeTypeInfo {
                    name: raw.type_name.clone(),
                    named: raw.named,
                    fields,
                    children,
                },
            );
        }

        Self {
            nodes,
            extras,
            root,
        }
    }

    pub fn get(&self, symbol: SymbolId) -> Option<&NodeTypeInfo> {
        self.nodes.get(&symbol)
    }

    pub fn field(&self, symbol: SymbolId, field: FieldId) -> Option<&FieldInfo> {
        self.get(symbol)?.fields.get(&field)
    }

    pub fn children(&self, symbol: SymbolId) -> Option<&ChildrenInfo> {
        self.get(symbol)?.children.as_ref()
    }

    pub fn extras(&self) -> &[SymbolId] {
        &self.extras
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeTypes for DynamicNodeTypes {
    fn root(&self) -> Option<SymbolId> {
        self.root
    }

    fn is_extra(&self, symbol: SymbolId) -> bool {
        self.extras.contains(&symbol)
    }

    fn contains(&self, symbol: SymbolId) -> bool {
        self.nodes.contains_key(&symbol)
    }

    fn has_field(&self, symbol: SymbolId, field: FieldId) -> bool {
        self.field(symbol, field).is_some()
    }

    fn field_cardinality(&self, symbol: SymbolId, field: FieldId) -> Option<Cardinality> {
        self.field(symbol, field).map(|f| f.cardinality)
    }

    fn valid_field_types(&self, symbol: SymbolId, field: FieldId) -> &[SymbolId] {
        self.field(symbol, field)
            .map(|f| f.valid_types.as_slice())
            .unwrap_or(&[])
    }

    fn children_cardinality(&self, symbol: SymbolId) -> Option<Cardinality> {
        self.children(symbol).map(|c| c.cardinality)
    }

    fn valid_child_types(&self, symbol: SymbolId) -> &[SymbolId] {
        self.children(symbol)
            .map(|c| c.valid_types.as_slice())
            .unwrap_or(&[])
    }

    fn can_contain(&self, symbol: SymbolId, child: SymbolId) -> bool {
        if self.extras.contains(&child) {
            return true;
        }
        let Some(info) = self.get(symbol) else {
            return false;
        };
        info.children
            .as_ref()
            .is_some_and(|c| c.valid_types.contains(&child))
            || info.fields.values().any(|f| f.valid_types.contains(&child))
    }
}
