// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Object memory: identity allocation, snapshot lifecycle, frame
//! transactions, and undo/redo history.
//!
//! The memory owns every snapshot in a single table; frames reference
//! snapshots by id. The editing cycle is: derive a mutable frame from the
//! current stable frame, mutate snapshots through the copy-on-write point
//! [`ObjectMemory::mutable_object`], then [`ObjectMemory::accept`] the frame.
//! Acceptance validates the whole frame and is atomic: either the frame is
//! promoted to stable and the history advanced, or nothing changed.
//!
//! Unknown-frame, unknown-snapshot, and duplicate-id conditions are caller
//! bugs, not runtime errors; operations assert them. Validation findings are
//! the only expected failure and surface as [`FrameValidationError`].
//!
//! One memory is a single logical agent: no interior locks, no suspension.
//! Independent memories are fully independent.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::checker::{validate_frame, FrameValidationError};
use crate::frame::{FrameEntry, FrameState, FrameView, MutableFrame, SnapshotTable, StableFrame};
use crate::ident::{FrameId, IdentitySpace, ObjectId, SnapshotId};
use crate::metamodel::{Metamodel, ObjectType, StructuralKind};
use crate::snapshot::{ObjectSnapshot, SnapshotState, StructuralComponent};
use crate::value::Variant;

/// Versioned store for a typed, attributed object graph.
#[derive(Debug)]
pub struct ObjectMemory {
    identity: IdentitySpace,
    snapshots: SnapshotTable,
    stable_frames: BTreeMap<FrameId, StableFrame>,
    mutable_frames: BTreeMap<FrameId, MutableFrame>,
    current_frame: Option<FrameId>,
    undoable: Vec<FrameId>,
    redoable: Vec<FrameId>,
    metamodel: Arc<Metamodel>,
}

impl ObjectMemory {
    /// Creates an empty memory bound to a metamodel.
    ///
    /// The binding is permanent; there is no rebinding operation.
    #[must_use]
    pub fn new(metamodel: Metamodel) -> Self {
        Self {
            identity: IdentitySpace::new(),
            snapshots: BTreeMap::new(),
            stable_frames: BTreeMap::new(),
            mutable_frames: BTreeMap::new(),
            current_frame: None,
            undoable: Vec::new(),
            redoable: Vec::new(),
            metamodel: Arc::new(metamodel),
        }
    }

    /// The bound metamodel.
    #[must_use]
    pub fn metamodel(&self) -> &Arc<Metamodel> {
        &self.metamodel
    }

    /// Allocates a raw identifier from the shared identity space.
    ///
    /// With `required`, the given value is reserved instead: it must not be
    /// in use by any snapshot or frame (asserted), and the counter advances
    /// past it.
    pub fn allocate_id(&mut self, required: Option<u64>) -> u64 {
        match required {
            None => self.identity.allocate(),
            Some(value) => {
                assert!(
                    !self.snapshots.contains_key(&SnapshotId::from_raw(value)),
                    "identifier {value} already names a snapshot"
                );
                assert!(
                    !self.contains_frame(FrameId::from_raw(value)),
                    "identifier {value} already names a frame"
                );
                self.identity.reserve(value);
                value
            }
        }
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Creates a transient snapshot and registers it in the snapshot table.
    ///
    /// The structural payload must agree with the type's structural kind;
    /// when omitted it is defaulted for unstructured and node types (edge
    /// types have no default payload). Attributes omitted by the caller are
    /// filled from the type's trait defaults.
    pub fn create_snapshot(
        &mut self,
        object_type: &Arc<ObjectType>,
        id: Option<ObjectId>,
        snapshot_id: Option<SnapshotId>,
        attributes: BTreeMap<String, Variant>,
        structure: Option<StructuralComponent>,
    ) -> SnapshotId {
        let structure = match structure {
            Some(structure) => {
                assert!(
                    structure.kind() == object_type.structural_kind,
                    "type {} is {}, got a {} payload",
                    object_type.name,
                    object_type.structural_kind,
                    structure.kind()
                );
                structure
            }
            None => match object_type.structural_kind {
                StructuralKind::Unstructured => StructuralComponent::Unstructured,
                StructuralKind::Node => StructuralComponent::Node,
                StructuralKind::Edge => {
                    unreachable!("edge type {} requires origin and target", object_type.name)
                }
            },
        };

        let object_id = match id {
            Some(id) => ObjectId::from_raw(self.allocate_id(Some(id.value()))),
            None => ObjectId::from_raw(self.identity.allocate()),
        };
        let snapshot_id = match snapshot_id {
            Some(id) => SnapshotId::from_raw(self.allocate_id(Some(id.value()))),
            None => SnapshotId::from_raw(self.identity.allocate()),
        };

        let mut snapshot =
            ObjectSnapshot::new(object_id, snapshot_id, Arc::clone(object_type), structure);
        for (name, value) in attributes {
            snapshot.set_attribute(name, value);
        }
        for descriptor in object_type.attributes() {
            if snapshot.attribute(&descriptor.name).is_none() {
                if let Some(default) = &descriptor.default {
                    snapshot.set_attribute(descriptor.name.clone(), default.clone());
                }
            }
        }

        self.snapshots.insert(snapshot_id, snapshot);
        snapshot_id
    }

    /// Produces a fresh transient snapshot copied from an existing one.
    pub fn derive_snapshot(&mut self, origin: SnapshotId) -> SnapshotId {
        let snapshot_id = SnapshotId::from_raw(self.identity.allocate());
        let Some(original) = self.snapshots.get(&origin) else {
            unreachable!("unknown snapshot {origin}")
        };
        let derived = original.derive(snapshot_id);
        self.snapshots.insert(snapshot_id, derived);
        snapshot_id
    }

    /// Looks up a snapshot by id.
    #[must_use]
    pub fn snapshot(&self, id: SnapshotId) -> Option<&ObjectSnapshot> {
        self.snapshots.get(&id)
    }

    /// Mutable table access for in-crate reconstruction paths.
    pub(crate) fn snapshot_mut(&mut self, id: SnapshotId) -> Option<&mut ObjectSnapshot> {
        self.snapshots.get_mut(&id)
    }

    // ------------------------------------------------------------------
    // Frames
    // ------------------------------------------------------------------

    /// Creates an empty open frame.
    pub fn create_frame(&mut self, id: Option<FrameId>) -> FrameId {
        let frame_id = match id {
            Some(id) => FrameId::from_raw(self.allocate_id(Some(id.value()))),
            None => FrameId::from_raw(self.identity.allocate()),
        };
        self.mutable_frames
            .insert(frame_id, MutableFrame::new(frame_id));
        frame_id
    }

    /// Starts a new mutable frame borrowing the contents of a stable frame.
    ///
    /// Without `original` the current frame is used; with no current frame
    /// the new frame starts empty.
    pub fn derive_frame(&mut self, original: Option<FrameId>, id: Option<FrameId>) -> FrameId {
        let original = original.or(self.current_frame);
        let frame_id = match id {
            Some(id) => FrameId::from_raw(self.allocate_id(Some(id.value()))),
            None => FrameId::from_raw(self.identity.allocate()),
        };
        let frame = match original {
            None => MutableFrame::new(frame_id),
            Some(original) => {
                let Some(stable) = self.stable_frames.get(&original) else {
                    unreachable!("unknown stable frame {original}")
                };
                MutableFrame::derived(frame_id, stable)
            }
        };
        self.mutable_frames.insert(frame_id, frame);
        frame_id
    }

    /// Returns `true` when the id names a stable or mutable frame.
    #[must_use]
    pub fn contains_frame(&self, id: FrameId) -> bool {
        self.stable_frames.contains_key(&id) || self.mutable_frames.contains_key(&id)
    }

    /// Read-only view of a stable or mutable frame.
    #[must_use]
    pub fn frame(&self, id: FrameId) -> Option<FrameView<'_>> {
        if let Some(stable) = self.stable_frames.get(&id) {
            return Some(FrameView::stable(&self.snapshots, stable));
        }
        self.mutable_frames
            .get(&id)
            .map(|frame| FrameView::mutable(&self.snapshots, frame))
    }

    /// The stable frame with the given id, if any.
    #[must_use]
    pub fn stable_frame(&self, id: FrameId) -> Option<&StableFrame> {
        self.stable_frames.get(&id)
    }

    /// The mutable frame with the given id, if any.
    #[must_use]
    pub fn mutable_frame(&self, id: FrameId) -> Option<&MutableFrame> {
        self.mutable_frames.get(&id)
    }

    /// Identity of the frame the design currently points at.
    #[must_use]
    pub fn current_frame(&self) -> Option<FrameId> {
        self.current_frame
    }

    /// Read-only view of the current frame.
    #[must_use]
    pub fn current_view(&self) -> Option<FrameView<'_>> {
        self.current_frame.and_then(|id| self.frame(id))
    }

    // ------------------------------------------------------------------
    // Frame editing
    // ------------------------------------------------------------------

    /// Inserts an existing snapshot into an open frame.
    ///
    /// Owned insertion requires a transient snapshot; borrowed insertion
    /// requires a validated one. The frame must not already contain the
    /// object or the snapshot.
    pub fn insert(&mut self, frame: FrameId, snapshot_id: SnapshotId, owned: bool) {
        let Some(snapshot) = self.snapshots.get(&snapshot_id) else {
            unreachable!("unknown snapshot {snapshot_id}")
        };
        let state = snapshot.state();
        let object_id = snapshot.object_id();
        assert!(
            state != SnapshotState::Uninitialized,
            "snapshot {snapshot_id} is uninitialized"
        );
        if owned {
            assert!(
                state == SnapshotState::Transient,
                "owned insertion requires a mutable snapshot, {snapshot_id} is validated"
            );
        } else {
            assert!(
                state == SnapshotState::Validated,
                "borrowed insertion requires a validated snapshot, {snapshot_id} is transient"
            );
        }
        let frame_ref = self.open_frame_mut(frame);
        assert!(
            !frame_ref.references_snapshot(snapshot_id),
            "frame {frame} already references snapshot {snapshot_id}"
        );
        frame_ref.insert_entry(
            object_id,
            FrameEntry {
                snapshot_id,
                owned,
            },
        );
    }

    /// Creates a new object in an open frame: allocate, snapshot, insert.
    pub fn create_object(
        &mut self,
        frame: FrameId,
        object_type: &Arc<ObjectType>,
        structure: Option<StructuralComponent>,
        attributes: BTreeMap<String, Variant>,
    ) -> ObjectId {
        let object_id = ObjectId::from_raw(self.identity.allocate());
        let snapshot_id =
            self.create_snapshot(object_type, Some(object_id), None, attributes, structure);
        self.insert(frame, snapshot_id, true);
        object_id
    }

    /// Returns a mutable snapshot of an object inside an open frame.
    ///
    /// This is the single copy-on-write point: owned entries are returned
    /// directly; borrowed entries are first replaced by a freshly derived
    /// snapshot with a new snapshot id.
    pub fn mutable_object(&mut self, frame: FrameId, object: ObjectId) -> &mut ObjectSnapshot {
        let frame_ref = self.open_frame_mut(frame);
        let Some(entry) = frame_ref.entry(object) else {
            unreachable!("frame {frame} does not contain object {object}")
        };

        let snapshot_id = if entry.owned {
            entry.snapshot_id
        } else {
            let derived_id = SnapshotId::from_raw(self.identity.allocate());
            let Some(original) = self.snapshots.get(&entry.snapshot_id) else {
                unreachable!("unknown snapshot {}", entry.snapshot_id)
            };
            let derived = original.derive(derived_id);
            trace!(
                frame = frame.value(),
                object = object.value(),
                from = entry.snapshot_id.value(),
                to = derived_id.value(),
                "copy-on-write derivation"
            );
            self.snapshots.insert(derived_id, derived);
            let Some(frame_ref) = self.mutable_frames.get_mut(&frame) else {
                unreachable!("unknown mutable frame {frame}")
            };
            frame_ref.promote_entry(object, derived_id);
            derived_id
        };

        let Some(snapshot) = self.snapshots.get_mut(&snapshot_id) else {
            unreachable!("unknown snapshot {snapshot_id}")
        };
        snapshot
    }

    /// Removes an object and everything structurally dependent on it.
    ///
    /// Collects the object and all its descendants through `children`, then
    /// iteratively removes every edge whose origin or target points into the
    /// removed set, so that surviving entries never reference a removed id.
    /// Returns the removed object ids.
    pub fn remove_cascading(&mut self, frame: FrameId, object: ObjectId) -> BTreeSet<ObjectId> {
        {
            let frame_ref = self.open_frame_mut(frame);
            assert!(
                frame_ref.contains(object),
                "frame {frame} does not contain object {object}"
            );
        }

        // Phase 1: the object and its descendants.
        let mut removal: BTreeSet<ObjectId> = BTreeSet::new();
        let mut queue: VecDeque<ObjectId> = VecDeque::new();
        queue.push_back(object);
        while let Some(current) = queue.pop_front() {
            if !removal.insert(current) {
                continue;
            }
            if let Some(snapshot) = self.frame_object(frame, current) {
                queue.extend(snapshot.children().iter().copied());
            }
        }

        // Phase 2: structural dependants, to a fixed point so that chains of
        // edges pointing at edges resolve completely.
        loop {
            let view = self.view_of(frame);
            let dependants: Vec<ObjectId> = view
                .iter()
                .filter(|snapshot| !removal.contains(&snapshot.object_id()))
                .filter(|snapshot| {
                    snapshot.origin().is_some_and(|origin| removal.contains(&origin))
                        || snapshot.target().is_some_and(|target| removal.contains(&target))
                })
                .map(ObjectSnapshot::object_id)
                .collect();
            if dependants.is_empty() {
                break;
            }
            removal.extend(dependants);
        }

        // Detach removed objects from surviving parents, then drop entries.
        let mut detachments: Vec<(ObjectId, ObjectId)> = Vec::new();
        for &removed in &removal {
            if let Some(snapshot) = self.frame_object(frame, removed) {
                if let Some(parent) = snapshot.parent() {
                    if !removal.contains(&parent) {
                        detachments.push((parent, removed));
                    }
                }
            }
        }
        for (parent, child) in detachments {
            self.mutable_object(frame, parent).remove_child(child);
        }

        let Some(frame_ref) = self.mutable_frames.get_mut(&frame) else {
            unreachable!("unknown mutable frame {frame}")
        };
        let mut dropped_snapshots: Vec<SnapshotId> = Vec::new();
        for &removed in &removal {
            if frame_ref.contains(removed) {
                let entry = frame_ref.remove_entry(removed);
                if entry.owned {
                    dropped_snapshots.push(entry.snapshot_id);
                }
            }
        }
        // Owned snapshots of removed objects have no other referent.
        for snapshot_id in dropped_snapshots {
            self.snapshots.remove(&snapshot_id);
        }

        debug!(
            frame = frame.value(),
            object = object.value(),
            removed = removal.len(),
            "cascading removal"
        );
        removal
    }

    // ------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------

    /// Makes `child` a child of `parent`; both endpoints are copied on write.
    ///
    /// The edit assumes the intended result is acyclic; the constraint
    /// checker owns cycle detection.
    pub fn add_child(&mut self, frame: FrameId, parent: ObjectId, child: ObjectId) {
        self.mutable_object(frame, child).set_parent(Some(parent));
        self.mutable_object(frame, parent).add_child(child);
    }

    /// Detaches `child` from `parent`; both endpoints are copied on write.
    pub fn remove_child(&mut self, frame: FrameId, parent: ObjectId, child: ObjectId) {
        self.mutable_object(frame, parent).remove_child(child);
        let snapshot = self.mutable_object(frame, child);
        if snapshot.parent() == Some(parent) {
            snapshot.set_parent(None);
        }
    }

    /// Re-parents `child`, detaching it from its previous parent first.
    pub fn set_parent(&mut self, frame: FrameId, child: ObjectId, parent: Option<ObjectId>) {
        let previous = {
            let Some(snapshot) = self.frame_object(frame, child) else {
                unreachable!("frame {frame} does not contain object {child}")
            };
            snapshot.parent()
        };
        if let Some(previous) = previous {
            self.mutable_object(frame, previous).remove_child(child);
        }
        self.mutable_object(frame, child).set_parent(parent);
        if let Some(parent) = parent {
            self.mutable_object(frame, parent).add_child(child);
        }
    }

    /// Detaches `child` from its parent, if it has one.
    pub fn remove_from_parent(&mut self, frame: FrameId, child: ObjectId) {
        self.set_parent(frame, child, None);
    }

    // ------------------------------------------------------------------
    // Acceptance, discard, history
    // ------------------------------------------------------------------

    /// Validates and promotes an open frame to stable.
    ///
    /// On success every owned snapshot is frozen and the frame moves to the
    /// stable table. With `append_to_history`, the previous current frame is
    /// pushed onto the undo list and the redo list is cleared.
    ///
    /// # Errors
    /// Returns the aggregate [`FrameValidationError`] and leaves the memory
    /// byte-for-byte unchanged; the frame stays open.
    pub fn accept(
        &mut self,
        frame: FrameId,
        append_to_history: bool,
    ) -> Result<FrameId, FrameValidationError> {
        assert!(
            !self.stable_frames.contains_key(&frame),
            "frame {frame} is already stable"
        );
        {
            let Some(frame_ref) = self.mutable_frames.get(&frame) else {
                unreachable!("unknown mutable frame {frame}")
            };
            assert!(
                frame_ref.state() == FrameState::Open,
                "frame {frame} is not open"
            );
            let view = FrameView::mutable(&self.snapshots, frame_ref);
            validate_frame(&view, &self.metamodel)?;
        }

        let Some(mut frame_ref) = self.mutable_frames.remove(&frame) else {
            unreachable!("unknown mutable frame {frame}")
        };
        frame_ref.mark_validated();
        let mut objects: BTreeMap<ObjectId, SnapshotId> = BTreeMap::new();
        for (&object, entry) in frame_ref.entries() {
            if entry.owned {
                let Some(snapshot) = self.snapshots.get_mut(&entry.snapshot_id) else {
                    unreachable!("unknown snapshot {}", entry.snapshot_id)
                };
                snapshot.freeze();
            }
            objects.insert(object, entry.snapshot_id);
        }
        self.stable_frames
            .insert(frame, StableFrame::new(frame, objects));

        if append_to_history {
            if let Some(previous) = self.current_frame {
                self.undoable.push(previous);
            }
            self.redoable.clear();
        }
        self.current_frame = Some(frame);

        debug!(
            frame = frame.value(),
            history = append_to_history,
            "frame accepted"
        );
        Ok(frame)
    }

    /// Drops an open frame without accepting it.
    ///
    /// Owned snapshots of the frame were never validated and have no stable
    /// referent, so they are removed from the snapshot table.
    pub fn discard(&mut self, frame: FrameId) {
        let Some(frame_ref) = self.mutable_frames.remove(&frame) else {
            unreachable!("unknown mutable frame {frame}")
        };
        frame_ref.assert_open();
        for entry in frame_ref.entries().values() {
            if entry.owned {
                self.snapshots.remove(&entry.snapshot_id);
            }
        }
        debug!(frame = frame.value(), "frame discarded");
    }

    /// Removes a frame from the memory.
    ///
    /// Open frames are discarded. Stable frames must not be on the history
    /// timeline; their snapshots are retained (other frames may share them).
    pub fn remove_frame(&mut self, id: FrameId) {
        if self.mutable_frames.contains_key(&id) {
            self.discard(id);
            return;
        }
        assert!(
            self.current_frame != Some(id)
                && !self.undoable.contains(&id)
                && !self.redoable.contains(&id),
            "frame {id} is on the history timeline"
        );
        let removed = self.stable_frames.remove(&id);
        assert!(removed.is_some(), "unknown frame {id}");
    }

    /// Frames that can be undone to, oldest first.
    #[must_use]
    pub fn undoable_frames(&self) -> &[FrameId] {
        &self.undoable
    }

    /// Frames that can be redone to, oldest first.
    #[must_use]
    pub fn redoable_frames(&self) -> &[FrameId] {
        &self.redoable
    }

    /// Returns `true` when at least one frame can be undone to.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undoable.is_empty()
    }

    /// Returns `true` when at least one frame can be redone to.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redoable.is_empty()
    }

    /// Rewinds the current frame to an undoable frame.
    ///
    /// Frames newer than the target, including the current frame, move to
    /// the front of the redo list in chronological order. Only references
    /// are reassigned; no snapshot is copied.
    pub fn undo(&mut self, to: FrameId) {
        let Some(index) = self.undoable.iter().position(|&frame| frame == to) else {
            unreachable!("frame {to} is not undoable")
        };
        let Some(current) = self.current_frame else {
            unreachable!("undo with no current frame")
        };
        let mut moved = self.undoable.split_off(index);
        moved.remove(0);
        moved.push(current);
        moved.extend(self.redoable.drain(..));
        self.redoable = moved;
        self.current_frame = Some(to);
        debug!(frame = to.value(), "undo");
    }

    /// Advances the current frame to a redoable frame. Symmetric to
    /// [`ObjectMemory::undo`].
    pub fn redo(&mut self, to: FrameId) {
        let Some(index) = self.redoable.iter().position(|&frame| frame == to) else {
            unreachable!("frame {to} is not redoable")
        };
        let Some(current) = self.current_frame else {
            unreachable!("redo with no current frame")
        };
        let mut rest = self.redoable.split_off(index);
        rest.remove(0);
        let moved: Vec<FrameId> = self.redoable.drain(..).collect();
        self.undoable.push(current);
        self.undoable.extend(moved);
        self.redoable = rest;
        self.current_frame = Some(to);
        debug!(frame = to.value(), "redo");
    }

    // ------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------

    fn open_frame_mut(&mut self, frame: FrameId) -> &mut MutableFrame {
        let Some(frame_ref) = self.mutable_frames.get_mut(&frame) else {
            unreachable!("unknown mutable frame {frame}")
        };
        frame_ref.assert_open();
        frame_ref
    }

    fn view_of(&self, frame: FrameId) -> FrameView<'_> {
        let Some(view) = self.frame(frame) else {
            unreachable!("unknown frame {frame}")
        };
        view
    }

    fn frame_object(&self, frame: FrameId, object: ObjectId) -> Option<&ObjectSnapshot> {
        self.view_of(frame).object(object)
    }
}
