// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![cfg(feature = "serde")]

use std::collections::BTreeMap;
use std::sync::Arc;

use atelier_core::{
    ForeignError, ForeignObject, ForeignStructure, ObjectMemory, ObjectType, Point,
    SnapshotId, StructuralComponent, StructuralKind, Variant,
};

mod common;

fn type_by_name(memory: &ObjectMemory, name: &str) -> Arc<ObjectType> {
    Arc::clone(memory.metamodel().type_by_name(name).expect("known type"))
}

fn attrs(pairs: Vec<(&str, Variant)>) -> BTreeMap<String, Variant> {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect()
}

#[test]
fn snapshot_round_trips_through_json() {
    let mut memory = common::memory();
    let block = type_by_name(&memory, "Block");

    let frame = memory.create_frame(None);
    let object = memory.create_object(
        frame,
        &block,
        None,
        attrs(vec![
            ("name", Variant::from("reservoir")),
            ("text", Variant::from("p = 1,2")),
        ]),
    );
    memory.accept(frame, true).expect("frame is valid");

    let view = memory.current_view().expect("current view");
    let snapshot = view.object(object).expect("object");
    let record = ForeignObject::from_snapshot(snapshot);

    let json = serde_json::to_string(&record).expect("serializes");
    let decoded: ForeignObject = serde_json::from_str(&json).expect("deserializes");
    assert_eq!(decoded, record);
    assert_eq!(decoded.info.structure, ForeignStructure::Node);
    assert_eq!(decoded.info.type_name, "Block");

    // Reconstruct into a fresh memory bound to the same metamodel.
    let mut restored = common::memory();
    let snapshot_id = restored
        .create_snapshot_from_foreign(&decoded)
        .expect("reconstructs");
    let restored_snapshot = restored.snapshot(snapshot_id).expect("snapshot");
    assert_eq!(restored_snapshot.object_id().value(), decoded.info.id);
    assert_eq!(
        restored_snapshot.attribute("name"),
        Some(&Variant::from("reservoir"))
    );

    // Recorded identifiers are reserved; fresh allocations move past them.
    let fresh = restored.allocate_id(None);
    assert!(fresh > decoded.info.snapshot_id);
    assert!(fresh > decoded.info.id);
}

#[test]
fn edge_records_carry_endpoints() {
    let mut memory = common::memory();
    let block = type_by_name(&memory, "Block");
    let parameter = type_by_name(&memory, "Parameter");

    let frame = memory.create_frame(None);
    let a = memory.create_object(frame, &block, None, BTreeMap::new());
    let b = memory.create_object(frame, &block, None, BTreeMap::new());
    let edge = memory.create_object(
        frame,
        &parameter,
        Some(StructuralComponent::Edge {
            origin: a,
            target: b,
        }),
        BTreeMap::new(),
    );
    memory.accept(frame, true).expect("frame is valid");

    let view = memory.current_view().expect("current view");
    let record = ForeignObject::from_snapshot(view.object(edge).expect("edge"));
    assert_eq!(record.info.structure, ForeignStructure::Edge);
    assert_eq!(record.info.origin, Some(a.value()));
    assert_eq!(record.info.target, Some(b.value()));

    let mut restored = common::memory();
    let snapshot_id = restored
        .create_snapshot_from_foreign(&record)
        .expect("reconstructs");
    let snapshot = restored.snapshot(snapshot_id).expect("snapshot");
    assert_eq!(snapshot.origin().map(|id| id.value()), Some(a.value()));
    assert_eq!(snapshot.target().map(|id| id.value()), Some(b.value()));
}

#[test]
fn variant_wire_form_is_tagged_by_kind() {
    let mut memory = common::memory();
    let note = type_by_name(&memory, "Note");

    let frame = memory.create_frame(None);
    let object = memory.create_object(
        frame,
        &note,
        None,
        attrs(vec![("name", Variant::from("origin marker"))]),
    );
    memory.accept(frame, true).expect("frame is valid");

    let view = memory.current_view().expect("current view");
    let record = ForeignObject::from_snapshot(view.object(object).expect("note"));
    let json = serde_json::to_value(&record).expect("serializes");
    assert_eq!(json["attributes"]["name"]["type"], "string");
    assert_eq!(json["attributes"]["name"]["value"], "origin marker");
    assert_eq!(json["info"]["structure"], "unstructured");
}

#[test]
fn point_values_survive_the_wire() {
    let record = ForeignObject {
        info: atelier_core::ForeignInfo {
            id: 100,
            snapshot_id: 101,
            type_name: "Note".to_owned(),
            structure: ForeignStructure::Unstructured,
            origin: None,
            target: None,
            parent: None,
        },
        attributes: [(
            "name".to_owned(),
            atelier_core::ForeignVariant::from(&Variant::from(Point::new(1.5, -2.0))),
        )]
        .into_iter()
        .collect(),
    };
    let json = serde_json::to_string(&record).expect("serializes");
    let decoded: ForeignObject = serde_json::from_str(&json).expect("deserializes");
    let value = Variant::from(decoded.attributes["name"].clone());
    assert_eq!(value, Variant::from(Point::new(1.5, -2.0)));
}

#[test]
fn unknown_type_and_structure_mismatch_are_errors() {
    let mut memory = common::memory();

    let unknown = ForeignObject {
        info: atelier_core::ForeignInfo {
            id: 1,
            snapshot_id: 2,
            type_name: "Widget".to_owned(),
            structure: ForeignStructure::Node,
            origin: None,
            target: None,
            parent: None,
        },
        attributes: BTreeMap::new(),
    };
    assert_eq!(
        memory.create_snapshot_from_foreign(&unknown),
        Err(ForeignError::UnknownObjectType("Widget".to_owned()))
    );

    let mismatched = ForeignObject {
        info: atelier_core::ForeignInfo {
            id: 1,
            snapshot_id: 2,
            type_name: "Block".to_owned(),
            structure: ForeignStructure::Edge,
            origin: Some(10),
            target: Some(11),
            parent: None,
        },
        attributes: BTreeMap::new(),
    };
    assert_eq!(
        memory.create_snapshot_from_foreign(&mismatched),
        Err(ForeignError::StructureMismatch {
            type_name: "Block".to_owned(),
            expected: StructuralKind::Node,
            got: StructuralKind::Edge,
        })
    );

    let dangling_edge = ForeignObject {
        info: atelier_core::ForeignInfo {
            id: 1,
            snapshot_id: 2,
            type_name: "Parameter".to_owned(),
            structure: ForeignStructure::Edge,
            origin: Some(10),
            target: None,
            parent: None,
        },
        attributes: BTreeMap::new(),
    };
    assert_eq!(
        memory.create_snapshot_from_foreign(&dangling_edge),
        Err(ForeignError::MissingEndpoints { id: 1 })
    );
}

#[test]
fn duplicate_identifiers_are_rejected() {
    let mut memory = common::memory();
    let note = type_by_name(&memory, "Note");

    let first = ForeignObject {
        info: atelier_core::ForeignInfo {
            id: 1,
            snapshot_id: 2,
            type_name: note.name.clone(),
            structure: ForeignStructure::Unstructured,
            origin: None,
            target: None,
            parent: None,
        },
        attributes: BTreeMap::new(),
    };
    let snapshot_id = memory
        .create_snapshot_from_foreign(&first)
        .expect("first record reconstructs");
    assert_eq!(snapshot_id, SnapshotId::from_raw(2));

    let duplicate = ForeignObject {
        info: atelier_core::ForeignInfo {
            id: 3,
            snapshot_id: 2,
            type_name: note.name.clone(),
            structure: ForeignStructure::Unstructured,
            origin: None,
            target: None,
            parent: None,
        },
        attributes: BTreeMap::new(),
    };
    assert_eq!(
        memory.create_snapshot_from_foreign(&duplicate),
        Err(ForeignError::DuplicateId(2))
    );
}
