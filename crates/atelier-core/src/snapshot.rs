// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Object snapshots: one immutable-after-validation version of one object.
//!
//! Snapshots reference other objects strictly by [`ObjectId`]
//! (arena-with-indices): the memory's snapshot table owns every snapshot, and
//! a snapshot never owns another. Structural payloads are a tagged variant on
//! the snapshot, not a type hierarchy; graph projections filter on the tag.
//!
//! # Invariants
//! - Once a snapshot reaches [`SnapshotState::Validated`] it is never mutated
//!   again; every mutator asserts this.
//! - `origin`/`target`/`parent`/`children` must resolve inside every frame
//!   the snapshot belongs to. The frame acceptance check enforces this; the
//!   snapshot itself only stores the ids.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ident::{ObjectId, SnapshotId};
use crate::metamodel::{ObjectType, StructuralKind};
use crate::value::Variant;

/// Per-snapshot structural payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralComponent {
    /// No graph role.
    Unstructured,
    /// Graph node.
    Node,
    /// Directed edge between two objects in the same frame.
    Edge {
        /// Object the edge originates from.
        origin: ObjectId,
        /// Object the edge points to.
        target: ObjectId,
    },
}

impl StructuralComponent {
    /// Returns the structural kind tag of this payload.
    #[must_use]
    pub fn kind(&self) -> StructuralKind {
        match self {
            Self::Unstructured => StructuralKind::Unstructured,
            Self::Node => StructuralKind::Node,
            Self::Edge { .. } => StructuralKind::Edge,
        }
    }
}

/// Lifecycle state of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotState {
    /// Allocated but not yet filled in; not insertable into frames.
    Uninitialized,
    /// Mutable, owned by at most one open frame.
    Transient,
    /// Frozen by frame acceptance; immutable forever after.
    Validated,
}

/// One version of one design object.
#[derive(Debug, Clone)]
pub struct ObjectSnapshot {
    object_id: ObjectId,
    snapshot_id: SnapshotId,
    object_type: Arc<ObjectType>,
    structure: StructuralComponent,
    attributes: BTreeMap<String, Variant>,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
    state: SnapshotState,
}

impl ObjectSnapshot {
    /// Creates a transient snapshot with no attributes and no hierarchy.
    #[must_use]
    pub fn new(
        object_id: ObjectId,
        snapshot_id: SnapshotId,
        object_type: Arc<ObjectType>,
        structure: StructuralComponent,
    ) -> Self {
        Self {
            object_id,
            snapshot_id,
            object_type,
            structure,
            attributes: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            state: SnapshotState::Transient,
        }
    }

    /// Produces a fresh transient snapshot of the same object.
    ///
    /// Everything except the snapshot identity and the lifecycle state is
    /// copied from `self`. This is the derivation step behind copy-on-write.
    #[must_use]
    pub fn derive(&self, snapshot_id: SnapshotId) -> Self {
        Self {
            object_id: self.object_id,
            snapshot_id,
            object_type: Arc::clone(&self.object_type),
            structure: self.structure,
            attributes: self.attributes.clone(),
            parent: self.parent,
            children: self.children.clone(),
            state: SnapshotState::Transient,
        }
    }

    /// Identity of the object this snapshot is a version of.
    #[must_use]
    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    /// Identity of this particular version.
    #[must_use]
    pub fn snapshot_id(&self) -> SnapshotId {
        self.snapshot_id
    }

    /// The object's type.
    #[must_use]
    pub fn object_type(&self) -> &Arc<ObjectType> {
        &self.object_type
    }

    /// The structural payload.
    #[must_use]
    pub fn structure(&self) -> StructuralComponent {
        self.structure
    }

    /// Structural kind tag, shorthand for `structure().kind()`.
    #[must_use]
    pub fn structural_kind(&self) -> StructuralKind {
        self.structure.kind()
    }

    /// Edge origin, when this snapshot is an edge.
    #[must_use]
    pub fn origin(&self) -> Option<ObjectId> {
        match self.structure {
            StructuralComponent::Edge { origin, .. } => Some(origin),
            _ => None,
        }
    }

    /// Edge target, when this snapshot is an edge.
    #[must_use]
    pub fn target(&self) -> Option<ObjectId> {
        match self.structure {
            StructuralComponent::Edge { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> SnapshotState {
        self.state
    }

    /// Parent object in the ownership hierarchy, if any.
    #[must_use]
    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    /// Child objects, in insertion order.
    #[must_use]
    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    /// Looks up an attribute value by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Variant> {
        self.attributes.get(name)
    }

    /// Iterates over attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&String, &Variant)> {
        self.attributes.iter()
    }

    /// Sets an attribute value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Variant) {
        self.assert_mutable();
        self.attributes.insert(name.into(), value);
    }

    /// Removes an attribute; returns the previous value if present.
    pub fn remove_attribute(&mut self, name: &str) -> Option<Variant> {
        self.assert_mutable();
        self.attributes.remove(name)
    }

    /// Sets or clears the parent reference.
    pub fn set_parent(&mut self, parent: Option<ObjectId>) {
        self.assert_mutable();
        self.parent = parent;
    }

    /// Appends a child reference; duplicates are ignored.
    pub fn add_child(&mut self, child: ObjectId) {
        self.assert_mutable();
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    /// Removes a child reference; returns `true` if it was present.
    pub fn remove_child(&mut self, child: ObjectId) -> bool {
        self.assert_mutable();
        let before = self.children.len();
        self.children.retain(|&existing| existing != child);
        self.children.len() != before
    }

    /// Freezes the snapshot at frame acceptance.
    ///
    /// After this call every mutator asserts.
    pub fn freeze(&mut self) {
        self.state = SnapshotState::Validated;
    }

    fn assert_mutable(&self) {
        assert!(
            self.state != SnapshotState::Validated,
            "validated snapshot {} (object {}) must not be mutated",
            self.snapshot_id,
            self.object_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;
    use crate::metamodel::Attribute;
    use crate::metamodel::ObjectTrait;

    fn node_type() -> Arc<ObjectType> {
        Arc::new(ObjectType::new(
            "Block",
            StructuralKind::Node,
            vec![Arc::new(ObjectTrait::new(
                "Named",
                vec![Attribute::new("name", ValueType::STRING)],
            ))],
        ))
    }

    fn transient(object: u64, snapshot: u64) -> ObjectSnapshot {
        ObjectSnapshot::new(
            ObjectId::from_raw(object),
            SnapshotId::from_raw(snapshot),
            node_type(),
            StructuralComponent::Node,
        )
    }

    #[test]
    fn derivation_copies_everything_but_identity() {
        let mut original = transient(1, 10);
        original.set_attribute("name", Variant::from("a"));
        original.add_child(ObjectId::from_raw(2));
        original.set_parent(Some(ObjectId::from_raw(3)));

        let derived = original.derive(SnapshotId::from_raw(11));
        assert_eq!(derived.object_id(), original.object_id());
        assert_ne!(derived.snapshot_id(), original.snapshot_id());
        assert_eq!(derived.attribute("name"), original.attribute("name"));
        assert_eq!(derived.children(), original.children());
        assert_eq!(derived.parent(), original.parent());
        assert_eq!(derived.state(), SnapshotState::Transient);
    }

    #[test]
    fn children_are_duplicate_free() {
        let mut snapshot = transient(1, 10);
        snapshot.add_child(ObjectId::from_raw(2));
        snapshot.add_child(ObjectId::from_raw(2));
        assert_eq!(snapshot.children().len(), 1);
        assert!(snapshot.remove_child(ObjectId::from_raw(2)));
        assert!(!snapshot.remove_child(ObjectId::from_raw(2)));
    }

    #[test]
    #[should_panic(expected = "must not be mutated")]
    fn frozen_snapshot_rejects_mutation() {
        let mut snapshot = transient(1, 10);
        snapshot.freeze();
        snapshot.set_attribute("name", Variant::from("late"));
    }

    #[test]
    fn edge_endpoints() {
        let edge = ObjectSnapshot::new(
            ObjectId::from_raw(1),
            SnapshotId::from_raw(10),
            Arc::new(ObjectType::new("Arrow", StructuralKind::Edge, Vec::new())),
            StructuralComponent::Edge {
                origin: ObjectId::from_raw(2),
                target: ObjectId::from_raw(3),
            },
        );
        assert_eq!(edge.origin(), Some(ObjectId::from_raw(2)));
        assert_eq!(edge.target(), Some(ObjectId::from_raw(3)));
        assert_eq!(edge.structural_kind(), StructuralKind::Edge);

        let node = transient(1, 11);
        assert_eq!(node.origin(), None);
        assert_eq!(node.target(), None);
    }
}
