// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::sync::Arc;

use atelier_core::{
    EdgeDirection, GraphView, NeighborhoodSelector, ObjectId, ObjectMemory, ObjectType,
    Predicate, StructuralComponent,
};

mod common;

struct Fixture {
    memory: ObjectMemory,
    a: ObjectId,
    b: ObjectId,
    c: ObjectId,
    note: ObjectId,
    ab: ObjectId,
    bc: ObjectId,
}

fn type_by_name(memory: &ObjectMemory, name: &str) -> Arc<ObjectType> {
    Arc::clone(memory.metamodel().type_by_name(name).expect("known type"))
}

/// Three blocks in a chain `a -> b -> c` plus one unstructured note.
fn fixture() -> Fixture {
    let mut memory = common::memory();
    let block = type_by_name(&memory, "Block");
    let note_type = type_by_name(&memory, "Note");
    let parameter = type_by_name(&memory, "Parameter");

    let frame = memory.create_frame(None);
    let a = memory.create_object(frame, &block, None, BTreeMap::new());
    let b = memory.create_object(frame, &block, None, BTreeMap::new());
    let c = memory.create_object(frame, &block, None, BTreeMap::new());
    let note = memory.create_object(frame, &note_type, None, BTreeMap::new());
    let edge = |origin, target| Some(StructuralComponent::Edge { origin, target });
    let ab = memory.create_object(frame, &parameter, edge(a, b), BTreeMap::new());
    let bc = memory.create_object(frame, &parameter, edge(b, c), BTreeMap::new());
    memory.accept(frame, true).expect("frame is valid");

    Fixture {
        memory,
        a,
        b,
        c,
        note,
        ab,
        bc,
    }
}

#[test]
fn nodes_and_edges_project_by_structural_kind() {
    let fixture = fixture();
    let view = fixture.memory.current_view().expect("current view");
    let graph = GraphView::new(view);

    let nodes: Vec<ObjectId> = graph.nodes().map(|n| n.object_id()).collect();
    assert_eq!(nodes, vec![fixture.a, fixture.b, fixture.c]);
    let edges: Vec<ObjectId> = graph.edges().map(|e| e.object_id()).collect();
    assert_eq!(edges, vec![fixture.ab, fixture.bc]);

    assert!(graph.contains_node(fixture.a));
    assert!(!graph.contains_node(fixture.note));
    assert!(!graph.contains_node(fixture.ab));
    assert!(graph.contains_edge(fixture.bc));
    assert!(!graph.contains_edge(fixture.b));
    assert!(graph.node(fixture.ab).is_none());
    assert!(graph.edge(fixture.a).is_none());
}

#[test]
fn incidence_queries_scan_linearly() {
    let fixture = fixture();
    let view = fixture.memory.current_view().expect("current view");
    let graph = GraphView::new(view);

    let outgoing: Vec<ObjectId> = graph
        .outgoing(fixture.b)
        .iter()
        .map(|e| e.object_id())
        .collect();
    assert_eq!(outgoing, vec![fixture.bc]);

    let incoming: Vec<ObjectId> = graph
        .incoming(fixture.b)
        .iter()
        .map(|e| e.object_id())
        .collect();
    assert_eq!(incoming, vec![fixture.ab]);

    let neighbours: Vec<ObjectId> = graph
        .neighbours(fixture.b)
        .iter()
        .map(|e| e.object_id())
        .collect();
    assert_eq!(neighbours, vec![fixture.ab, fixture.bc]);
    assert!(graph.neighbours(fixture.note).is_empty());
}

#[test]
fn selection_uses_the_predicate_algebra() {
    let fixture = fixture();
    let view = fixture.memory.current_view().expect("current view");
    let graph = GraphView::new(view);

    let blocks = graph.select_nodes(&Predicate::is_type("Block"));
    assert_eq!(blocks.len(), 3);
    assert!(graph.select_nodes(&Predicate::is_type("Note")).is_empty());
    let parameters = graph.select_edges(&Predicate::is_type("Parameter"));
    assert_eq!(parameters.len(), 2);
    let none = graph.select_edges(&Predicate::is_type("Parameter").not());
    assert!(none.is_empty());
}

#[test]
fn hood_exposes_filtered_edges_and_opposite_nodes() {
    let fixture = fixture();
    let view = fixture.memory.current_view().expect("current view");
    let graph = GraphView::new(view);

    let outgoing = graph.hood(
        fixture.b,
        &NeighborhoodSelector::new(EdgeDirection::Outgoing, Predicate::is_type("Parameter")),
    );
    assert_eq!(outgoing.edges(), &[fixture.bc]);
    assert_eq!(outgoing.nodes(), &[fixture.c]);

    let incoming = graph.hood(
        fixture.b,
        &NeighborhoodSelector::new(EdgeDirection::Incoming, Predicate::Any),
    );
    assert_eq!(incoming.edges(), &[fixture.ab]);
    assert_eq!(incoming.nodes(), &[fixture.a]);

    let filtered_out = graph.hood(
        fixture.b,
        &NeighborhoodSelector::new(EdgeDirection::Outgoing, Predicate::Any.not()),
    );
    assert!(filtered_out.edges().is_empty());
}

#[test]
fn topological_sort_orders_the_chain() {
    let fixture = fixture();
    let view = fixture.memory.current_view().expect("current view");
    let graph = GraphView::new(view);

    let sorted = graph
        .topological_sort(
            &[fixture.b, fixture.c, fixture.a],
            &[fixture.ab, fixture.bc],
        )
        .expect("chain is acyclic");
    assert_eq!(sorted, vec![fixture.a, fixture.b, fixture.c]);
}

#[test]
fn topological_sort_breaks_ties_by_ascending_id() {
    let fixture = fixture();
    let view = fixture.memory.current_view().expect("current view");
    let graph = GraphView::new(view);

    // No edges at all: the order is purely the deterministic tie-break.
    let sorted = graph
        .topological_sort(&[fixture.c, fixture.a, fixture.b], &[])
        .expect("no edges, no cycle");
    assert_eq!(sorted, vec![fixture.a, fixture.b, fixture.c]);
}

#[test]
fn cycle_is_reported_with_back_edges() {
    let mut fixture = fixture();
    let parameter = type_by_name(&fixture.memory, "Parameter");

    let frame = fixture.memory.derive_frame(None, None);
    let ca = fixture.memory.create_object(
        frame,
        &parameter,
        Some(StructuralComponent::Edge {
            origin: fixture.c,
            target: fixture.a,
        }),
        BTreeMap::new(),
    );
    fixture.memory.accept(frame, true).expect("frame is valid");

    let view = fixture.memory.current_view().expect("current view");
    let graph = GraphView::new(view);
    let error = graph
        .topological_sort(
            &[fixture.a, fixture.b, fixture.c],
            &[fixture.ab, fixture.bc, ca],
        )
        .expect_err("cycle must be detected");
    assert_eq!(error.back_edges, vec![fixture.ab, fixture.bc, ca]);
}

#[test]
fn view_works_over_open_frames_too() {
    let mut memory = common::memory();
    let block = type_by_name(&memory, "Block");
    let frame = memory.create_frame(None);
    let a = memory.create_object(frame, &block, None, BTreeMap::new());

    let view = memory.frame(frame).expect("open frame view");
    let graph = GraphView::new(view);
    assert!(graph.contains_node(a));
    assert_eq!(graph.nodes().count(), 1);
}
