use std::num::NonZeroU16;

use crate::{DynamicNodeTypes, NodeTypes, parse_node_types, render_node_types};

const SAMPLE_JSON: &str = r#"[
    {
        "type": "program",
        "named": true,
        "root": true,
        "children": {
            "multiple": true,
            "required": false,
            "types": [{"type": "assignment", "named": true}]
        }
    },
    {
        "type": "assignment",
        "named": true,
        "fields": {
            "left": {
                "multiple": false,
                "required": true,
                "types": [{"type": "identifier", "named": true}]
            },
            "right": {
                "multiple": false,
                "required": true,
                "types": [{"type": "number", "named": true}]
            }
        }
    },
    {"type": "comment", "named": true, "extra": true},
    {"type": "identifier", "named": true},
    {"type": "number", "named": true},
    {"type": "=", "named": false}
]"#;

fn symbol_for(name: &str, named: bool) -> Option<u16> {
    match (name, named) {
        ("program", true) => Some(10),
        ("assignment", true) => Some(11),
        ("comment", true) => Some(4),
        ("identifier", true) => Some(1),
        ("number", true) => Some(2),
        ("=", false) => Some(3),
        _ => None,
    }
}

fn field_for(name: &str) -> Option<NonZeroU16> {
    match name {
        "left" => NonZeroU16::new(1),
        "right" => NonZeroU16::new(2),
        _ => None,
    }
}

#[test]
fn parse_raw_nodes() {
    let nodes = parse_node_types(SAMPLE_JSON).unwrap();
    assert_eq!(nodes.len(), 6);

    let assignment = nodes.iter().find(|n| n.type_name == "assignment").unwrap();
    assert!(assignment.named);
    assert_eq!(assignment.fields.len(), 2);
    assert!(assignment.children.is_none());
}

#[test]
fn render_then_parse_preserves_nodes() {
    let nodes = parse_node_types(SAMPLE_JSON).unwrap();
    let rendered = render_node_types(&nodes);
    assert_eq!(parse_node_types(&rendered).unwrap(), nodes);
    assert!(!rendered.contains("\"extra\": false"));
}

#[test]
fn build_dynamic_node_types() {
    let nodes = parse_node_types(SAMPLE_JSON).unwrap();
    let types = DynamicNodeTypes::build(&nodes, symbol_for, field_for);
    let left = NonZeroU16::new(1).unwrap();
    let right = NonZeroU16::new(2).unwrap();

    assert_eq!(types.len(), 6);
    assert_eq!(types.root(), Some(10));
    assert!(types.is_extra(4));
    assert!(types.has_field(11, left));
    assert!(!types.has_field(10, left));
    assert_eq!(types.valid_field_types(11, right), &[2]);
    assert!(types.field_cardinality(11, left).unwrap().required);
    assert_eq!(types.valid_child_types(10), &[11]);
    assert!(types.children_cardinality(10).unwrap().multiple);
}

#[test]
fn can_contain_checks_children_fields_and_extras() {
    let nodes = parse_node_types(SAMPLE_JSON).unwrap();
    let types = DynamicNodeTypes::build(&nodes, symbol_for, field_for);

    assert!(types.can_contain(10, 11));
    assert!(types.can_contain(11, 1));
    assert!(types.can_contain(11, 4));
    assert!(!types.can_contain(10, 1));
    assert!(!types.can_contain(1, 2));
}
