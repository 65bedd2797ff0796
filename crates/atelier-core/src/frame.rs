// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Frames: sets of snapshots constituting one version of the design.
//!
//! A frame maps object ids to snapshot ids; the snapshots themselves are
//! owned by the memory's snapshot table. [`StableFrame`] is a validated,
//! immutable version eligible for the history timeline. [`MutableFrame`] is a
//! version under construction whose entries are either *owned* (the frame may
//! mutate them) or *borrowed* from the stable frame it was derived from.
//!
//! [`FrameView`] is the strictly read-only projection joining a frame with
//! the snapshot table. It exposes only query methods so that validation and
//! graph code cannot accidentally mutate frame state.

use std::collections::{BTreeMap, BTreeSet};

use crate::ident::{FrameId, ObjectId, SnapshotId};
use crate::snapshot::ObjectSnapshot;

/// Table owning every snapshot known to a memory, keyed by snapshot id.
pub(crate) type SnapshotTable = BTreeMap<SnapshotId, ObjectSnapshot>;

/// Validated, immutable frame.
///
/// # Invariants
/// - Every referenced snapshot is in state `Validated`.
/// - The object map never changes after promotion.
#[derive(Debug, Clone)]
pub struct StableFrame {
    id: FrameId,
    objects: BTreeMap<ObjectId, SnapshotId>,
}

impl StableFrame {
    pub(crate) fn new(id: FrameId, objects: BTreeMap<ObjectId, SnapshotId>) -> Self {
        Self { id, objects }
    }

    /// Frame identity.
    #[must_use]
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Returns `true` when the frame contains a version of the object.
    #[must_use]
    pub fn contains(&self, object: ObjectId) -> bool {
        self.objects.contains_key(&object)
    }

    /// Snapshot id recorded for the object, if present.
    #[must_use]
    pub fn snapshot_id(&self, object: ObjectId) -> Option<SnapshotId> {
        self.objects.get(&object).copied()
    }

    /// Number of objects in the frame.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` when the frame holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub(crate) fn objects(&self) -> &BTreeMap<ObjectId, SnapshotId> {
        &self.objects
    }
}

/// Construction state of a mutable frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Accepting mutations.
    Open,
    /// Accepted; awaiting removal of the mutable entry.
    Validated,
}

/// One entry of a mutable frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEntry {
    /// Snapshot recorded for the object.
    pub snapshot_id: SnapshotId,
    /// `true` when the frame may mutate the snapshot; `false` for entries
    /// borrowed read-only from the originating stable frame.
    pub owned: bool,
}

/// Frame under construction.
#[derive(Debug, Clone)]
pub struct MutableFrame {
    id: FrameId,
    state: FrameState,
    entries: BTreeMap<ObjectId, FrameEntry>,
    removed: BTreeSet<ObjectId>,
}

impl MutableFrame {
    /// Creates an empty open frame.
    #[must_use]
    pub(crate) fn new(id: FrameId) -> Self {
        Self {
            id,
            state: FrameState::Open,
            entries: BTreeMap::new(),
            removed: BTreeSet::new(),
        }
    }

    /// Creates an open frame whose initial contents borrow every snapshot of
    /// `original`.
    #[must_use]
    pub(crate) fn derived(id: FrameId, original: &StableFrame) -> Self {
        let entries = original
            .objects()
            .iter()
            .map(|(&object, &snapshot_id)| {
                (
                    object,
                    FrameEntry {
                        snapshot_id,
                        owned: false,
                    },
                )
            })
            .collect();
        Self {
            id,
            state: FrameState::Open,
            entries,
            removed: BTreeSet::new(),
        }
    }

    /// Frame identity.
    #[must_use]
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Construction state.
    #[must_use]
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Returns `true` when the frame contains a version of the object.
    #[must_use]
    pub fn contains(&self, object: ObjectId) -> bool {
        self.entries.contains_key(&object)
    }

    /// Entry recorded for the object, if present.
    #[must_use]
    pub fn entry(&self, object: ObjectId) -> Option<FrameEntry> {
        self.entries.get(&object).copied()
    }

    /// Objects removed from this frame since derivation.
    #[must_use]
    pub fn removed_objects(&self) -> &BTreeSet<ObjectId> {
        &self.removed
    }

    /// Number of objects in the frame.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the frame holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` when any entry references the snapshot id.
    #[must_use]
    pub fn references_snapshot(&self, snapshot_id: SnapshotId) -> bool {
        self.entries
            .values()
            .any(|entry| entry.snapshot_id == snapshot_id)
    }

    pub(crate) fn entries(&self) -> &BTreeMap<ObjectId, FrameEntry> {
        &self.entries
    }

    /// Records an entry for an object absent from the frame.
    pub(crate) fn insert_entry(&mut self, object: ObjectId, entry: FrameEntry) {
        self.assert_open();
        let previous = self.entries.insert(object, entry);
        assert!(
            previous.is_none(),
            "frame {} already contains object {object}",
            self.id
        );
        // Re-inserting a previously removed object revives it.
        self.removed.remove(&object);
    }

    /// Replaces a borrowed entry with an owned one after derivation.
    pub(crate) fn promote_entry(&mut self, object: ObjectId, snapshot_id: SnapshotId) {
        self.assert_open();
        let Some(entry) = self.entries.get_mut(&object) else {
            unreachable!("frame {} has no entry for object {object}", self.id)
        };
        entry.snapshot_id = snapshot_id;
        entry.owned = true;
    }

    /// Removes an object's entry and records it in the removed set.
    ///
    /// Returns the removed entry.
    pub(crate) fn remove_entry(&mut self, object: ObjectId) -> FrameEntry {
        self.assert_open();
        let Some(entry) = self.entries.remove(&object) else {
            unreachable!("frame {} has no entry for object {object}", self.id)
        };
        self.removed.insert(object);
        entry
    }

    /// Marks the frame validated; called by `accept` just before promotion.
    pub(crate) fn mark_validated(&mut self) {
        self.state = FrameState::Validated;
    }

    pub(crate) fn assert_open(&self) {
        assert!(
            self.state == FrameState::Open,
            "frame {} is not open for mutation",
            self.id
        );
    }
}

/// Contents of a frame, independent of its kind.
#[derive(Debug, Clone, Copy)]
enum FrameObjects<'a> {
    Stable(&'a BTreeMap<ObjectId, SnapshotId>),
    Mutable(&'a BTreeMap<ObjectId, FrameEntry>),
}

/// Read-only view joining a frame with the memory's snapshot table.
///
/// The lifetime ties the view to the memory; holding a view borrows the
/// memory immutably, so no frame can change underneath it.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    id: FrameId,
    snapshots: &'a SnapshotTable,
    objects: FrameObjects<'a>,
}

impl<'a> FrameView<'a> {
    pub(crate) fn stable(snapshots: &'a SnapshotTable, frame: &'a StableFrame) -> Self {
        Self {
            id: frame.id(),
            snapshots,
            objects: FrameObjects::Stable(frame.objects()),
        }
    }

    pub(crate) fn mutable(snapshots: &'a SnapshotTable, frame: &'a MutableFrame) -> Self {
        Self {
            id: frame.id(),
            snapshots,
            objects: FrameObjects::Mutable(frame.entries()),
        }
    }

    /// Identity of the viewed frame.
    #[must_use]
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Returns `true` when the frame contains a version of the object.
    #[must_use]
    pub fn contains(&self, object: ObjectId) -> bool {
        match self.objects {
            FrameObjects::Stable(objects) => objects.contains_key(&object),
            FrameObjects::Mutable(entries) => entries.contains_key(&object),
        }
    }

    /// Snapshot id recorded for the object, if present.
    #[must_use]
    pub fn snapshot_id(&self, object: ObjectId) -> Option<SnapshotId> {
        match self.objects {
            FrameObjects::Stable(objects) => objects.get(&object).copied(),
            FrameObjects::Mutable(entries) => {
                entries.get(&object).map(|entry| entry.snapshot_id)
            }
        }
    }

    /// The object's snapshot in this frame, if present.
    #[must_use]
    pub fn object(&self, object: ObjectId) -> Option<&'a ObjectSnapshot> {
        let snapshot_id = self.snapshot_id(object)?;
        let Some(snapshot) = self.snapshots.get(&snapshot_id) else {
            unreachable!("frame {} references unknown snapshot {snapshot_id}", self.id)
        };
        Some(snapshot)
    }

    /// Number of objects in the frame.
    #[must_use]
    pub fn len(&self) -> usize {
        match self.objects {
            FrameObjects::Stable(objects) => objects.len(),
            FrameObjects::Mutable(entries) => entries.len(),
        }
    }

    /// Returns `true` when the frame holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over object ids in ascending order.
    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + 'a {
        let ids: Vec<ObjectId> = match self.objects {
            FrameObjects::Stable(objects) => objects.keys().copied().collect(),
            FrameObjects::Mutable(entries) => entries.keys().copied().collect(),
        };
        ids.into_iter()
    }

    /// Iterates over snapshots in ascending object id order.
    pub fn iter(&self) -> impl Iterator<Item = &'a ObjectSnapshot> + '_ {
        let view = *self;
        self.object_ids().map(move |object| {
            let Some(snapshot) = view.object(object) else {
                unreachable!("frame {} lost object {object} mid-iteration", view.id)
            };
            snapshot
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn derived_frame_borrows_everything() {
        let mut objects = BTreeMap::new();
        objects.insert(ObjectId::from_raw(1), SnapshotId::from_raw(10));
        objects.insert(ObjectId::from_raw(2), SnapshotId::from_raw(11));
        let stable = StableFrame::new(FrameId::from_raw(100), objects);

        let derived = MutableFrame::derived(FrameId::from_raw(101), &stable);
        assert_eq!(derived.len(), 2);
        let entry = derived.entry(ObjectId::from_raw(1)).unwrap();
        assert!(!entry.owned);
        assert_eq!(entry.snapshot_id, SnapshotId::from_raw(10));
    }

    #[test]
    fn removal_is_recorded_and_revived_on_reinsert() {
        let mut frame = MutableFrame::new(FrameId::from_raw(1));
        frame.insert_entry(
            ObjectId::from_raw(7),
            FrameEntry {
                snapshot_id: SnapshotId::from_raw(70),
                owned: true,
            },
        );
        frame.remove_entry(ObjectId::from_raw(7));
        assert!(frame.removed_objects().contains(&ObjectId::from_raw(7)));

        frame.insert_entry(
            ObjectId::from_raw(7),
            FrameEntry {
                snapshot_id: SnapshotId::from_raw(71),
                owned: true,
            },
        );
        assert!(!frame.removed_objects().contains(&ObjectId::from_raw(7)));
    }

    #[test]
    #[should_panic(expected = "already contains object")]
    fn double_insert_panics() {
        let mut frame = MutableFrame::new(FrameId::from_raw(1));
        let entry = FrameEntry {
            snapshot_id: SnapshotId::from_raw(70),
            owned: true,
        };
        frame.insert_entry(ObjectId::from_raw(7), entry);
        frame.insert_entry(ObjectId::from_raw(7), entry);
    }
}
