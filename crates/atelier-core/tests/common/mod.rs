// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared fixture: a small diagram metamodel used across integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use atelier_core::{
    Attribute, Constraint, Metamodel, ObjectMemory, ObjectTrait, ObjectType, StructuralKind,
    ValueType, Variant,
};

/// Builds the test metamodel:
/// - trait `Named`: `name: string` (default `""`), `text: string` (default `""`)
/// - type `Block`: node, `Named`
/// - type `Note`: unstructured, `Named`
/// - type `Parameter`: edge, no attributes
pub fn metamodel_with(constraints: Vec<Constraint>) -> Metamodel {
    let named = ObjectTrait::new(
        "Named",
        vec![
            Attribute::new("name", ValueType::STRING).with_default(Variant::from("")),
            Attribute::new("text", ValueType::STRING).with_default(Variant::from("")),
        ],
    );
    let types = vec![
        ObjectType::new(
            "Block",
            StructuralKind::Node,
            vec![std::sync::Arc::new(named.clone())],
        ),
        ObjectType::new(
            "Note",
            StructuralKind::Unstructured,
            vec![std::sync::Arc::new(named.clone())],
        ),
        ObjectType::new("Parameter", StructuralKind::Edge, Vec::new()),
    ];
    Metamodel::new(vec![named], types, BTreeMap::new(), constraints)
        .expect("test metamodel is well formed")
}

pub fn metamodel() -> Metamodel {
    metamodel_with(Vec::new())
}

pub fn memory() -> ObjectMemory {
    ObjectMemory::new(metamodel())
}
