// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Foreign records: the serialization contract for external archive layers.
//!
//! Core types stay serialization-free; this module mirrors them as plain
//! serde documents. An archive layer stores [`ForeignObject`] records and
//! reconstructs memory state through
//! [`ObjectMemory::create_snapshot_from_foreign`], which reserves the
//! recorded identifiers and resolves the type by name against the bound
//! metamodel.
//!
//! Unlike in-memory operations, reconstruction consumes external input, so
//! malformed records are errors rather than caller bugs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ident::{FrameId, ObjectId, SnapshotId};
use crate::memory::ObjectMemory;
use crate::metamodel::StructuralKind;
use crate::snapshot::{ObjectSnapshot, StructuralComponent};
use crate::value::{Atom, Point, Variant, VariantArray};

/// Serialized value, tagged by value kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ForeignVariant {
    /// Signed 64-bit integer.
    Int(i64),
    /// Double-precision float.
    Double(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    String(String),
    /// Point as an `[x, y]` pair.
    Point([f64; 2]),
    /// Array of integers.
    IntArray(Vec<i64>),
    /// Array of doubles.
    DoubleArray(Vec<f64>),
    /// Array of booleans.
    BoolArray(Vec<bool>),
    /// Array of strings.
    StringArray(Vec<String>),
    /// Array of points.
    PointArray(Vec<[f64; 2]>),
}

impl From<&Variant> for ForeignVariant {
    fn from(value: &Variant) -> Self {
        match value {
            Variant::Atom(Atom::Int(value)) => Self::Int(*value),
            Variant::Atom(Atom::Double(value)) => Self::Double(*value),
            Variant::Atom(Atom::Bool(value)) => Self::Bool(*value),
            Variant::Atom(Atom::String(text)) => Self::String(text.clone()),
            Variant::Atom(Atom::Point(point)) => Self::Point([point.x, point.y]),
            Variant::Array(VariantArray::Int(items)) => Self::IntArray(items.clone()),
            Variant::Array(VariantArray::Double(items)) => Self::DoubleArray(items.clone()),
            Variant::Array(VariantArray::Bool(items)) => Self::BoolArray(items.clone()),
            Variant::Array(VariantArray::String(items)) => Self::StringArray(items.clone()),
            Variant::Array(VariantArray::Point(items)) => {
                Self::PointArray(items.iter().map(|p| [p.x, p.y]).collect())
            }
        }
    }
}

impl From<ForeignVariant> for Variant {
    fn from(value: ForeignVariant) -> Self {
        match value {
            ForeignVariant::Int(value) => Variant::Atom(Atom::Int(value)),
            ForeignVariant::Double(value) => Variant::Atom(Atom::Double(value)),
            ForeignVariant::Bool(value) => Variant::Atom(Atom::Bool(value)),
            ForeignVariant::String(text) => Variant::Atom(Atom::String(text)),
            ForeignVariant::Point([x, y]) => Variant::Atom(Atom::Point(Point::new(x, y))),
            ForeignVariant::IntArray(items) => Variant::Array(VariantArray::Int(items)),
            ForeignVariant::DoubleArray(items) => Variant::Array(VariantArray::Double(items)),
            ForeignVariant::BoolArray(items) => Variant::Array(VariantArray::Bool(items)),
            ForeignVariant::StringArray(items) => Variant::Array(VariantArray::String(items)),
            ForeignVariant::PointArray(items) => Variant::Array(VariantArray::Point(
                items.into_iter().map(|[x, y]| Point::new(x, y)).collect(),
            )),
        }
    }
}

/// Structural kind tag in its wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignStructure {
    /// No graph role.
    Unstructured,
    /// Graph node.
    Node,
    /// Directed edge; `origin` and `target` must be present.
    Edge,
}

impl ForeignStructure {
    fn kind(self) -> StructuralKind {
        match self {
            Self::Unstructured => StructuralKind::Unstructured,
            Self::Node => StructuralKind::Node,
            Self::Edge => StructuralKind::Edge,
        }
    }
}

/// Identity and structure of one serialized snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignInfo {
    /// Object identifier.
    pub id: u64,
    /// Snapshot identifier.
    pub snapshot_id: u64,
    /// Object type, by name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Structural kind tag.
    pub structure: ForeignStructure,
    /// Edge origin; present exactly for edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<u64>,
    /// Edge target; present exactly for edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u64>,
    /// Parent object in the ownership hierarchy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
}

/// One serialized snapshot: identity plus tagged attribute values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignObject {
    /// Identity and structure.
    pub info: ForeignInfo,
    /// Attribute values by name.
    pub attributes: BTreeMap<String, ForeignVariant>,
}

impl ForeignObject {
    /// Projects a snapshot into its foreign record form.
    #[must_use]
    pub fn from_snapshot(snapshot: &ObjectSnapshot) -> Self {
        let structure = match snapshot.structure() {
            StructuralComponent::Unstructured => ForeignStructure::Unstructured,
            StructuralComponent::Node => ForeignStructure::Node,
            StructuralComponent::Edge { .. } => ForeignStructure::Edge,
        };
        Self {
            info: ForeignInfo {
                id: snapshot.object_id().value(),
                snapshot_id: snapshot.snapshot_id().value(),
                type_name: snapshot.object_type().name.clone(),
                structure,
                origin: snapshot.origin().map(ObjectId::value),
                target: snapshot.target().map(ObjectId::value),
                parent: snapshot.parent().map(ObjectId::value),
            },
            attributes: snapshot
                .attributes()
                .map(|(name, value)| (name.clone(), ForeignVariant::from(value)))
                .collect(),
        }
    }
}

/// Errors reported while reconstructing state from foreign records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForeignError {
    /// The record names a type the bound metamodel does not declare.
    #[error("unknown object type: {0}")]
    UnknownObjectType(String),
    /// The record's structure tag does not match the named type.
    #[error("type {type_name} is {expected}, record says {got}")]
    StructureMismatch {
        /// Type the record names.
        type_name: String,
        /// Structural kind the type declares.
        expected: StructuralKind,
        /// Structural kind the record carries.
        got: StructuralKind,
    },
    /// An edge record lacks `origin` or `target`.
    #[error("edge record {id} is missing origin or target")]
    MissingEndpoints {
        /// Object id of the offending record.
        id: u64,
    },
    /// A recorded identifier is already in use in this memory.
    #[error("identifier {0} is already in use")]
    DuplicateId(u64),
}

impl ObjectMemory {
    /// Reconstructs a snapshot from its foreign record.
    ///
    /// The recorded identifiers are reserved in the identity space; the type
    /// resolves by name against the bound metamodel. The snapshot is created
    /// transient and registered in the snapshot table; inserting it into a
    /// frame is the caller's next step.
    ///
    /// # Errors
    /// Returns a [`ForeignError`] for unknown types, structure/type
    /// disagreement, missing edge endpoints, or identifier collisions.
    pub fn create_snapshot_from_foreign(
        &mut self,
        foreign: &ForeignObject,
    ) -> Result<SnapshotId, ForeignError> {
        let info = &foreign.info;
        let object_type = match self.metamodel().type_by_name(&info.type_name) {
            Some(ty) => std::sync::Arc::clone(ty),
            None => return Err(ForeignError::UnknownObjectType(info.type_name.clone())),
        };

        let recorded = info.structure.kind();
        if recorded != object_type.structural_kind {
            return Err(ForeignError::StructureMismatch {
                type_name: info.type_name.clone(),
                expected: object_type.structural_kind,
                got: recorded,
            });
        }
        let structure = match info.structure {
            ForeignStructure::Unstructured => StructuralComponent::Unstructured,
            ForeignStructure::Node => StructuralComponent::Node,
            ForeignStructure::Edge => {
                let (Some(origin), Some(target)) = (info.origin, info.target) else {
                    return Err(ForeignError::MissingEndpoints { id: info.id });
                };
                StructuralComponent::Edge {
                    origin: ObjectId::from_raw(origin),
                    target: ObjectId::from_raw(target),
                }
            }
        };

        for raw in [info.id, info.snapshot_id] {
            if self.snapshot(SnapshotId::from_raw(raw)).is_some()
                || self.contains_frame(FrameId::from_raw(raw))
            {
                return Err(ForeignError::DuplicateId(raw));
            }
        }

        let attributes: BTreeMap<String, Variant> = foreign
            .attributes
            .iter()
            .map(|(name, value)| (name.clone(), Variant::from(value.clone())))
            .collect();

        let snapshot_id = self.create_snapshot(
            &object_type,
            Some(ObjectId::from_raw(info.id)),
            Some(SnapshotId::from_raw(info.snapshot_id)),
            attributes,
            Some(structure),
        );
        if let Some(parent) = info.parent {
            let Some(snapshot) = self.snapshot_mut(snapshot_id) else {
                unreachable!("freshly created snapshot {snapshot_id} is missing")
            };
            snapshot.set_parent(Some(ObjectId::from_raw(parent)));
        }
        Ok(snapshot_id)
    }
}
