// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::sync::Arc;

use atelier_core::{FrameId, ObjectId, ObjectMemory, ObjectType};

mod common;

fn block_type(memory: &ObjectMemory) -> Arc<ObjectType> {
    Arc::clone(
        memory
            .metamodel()
            .type_by_name("Block")
            .expect("Block type"),
    )
}

fn accept_empty(memory: &mut ObjectMemory) -> FrameId {
    let frame = memory.create_frame(None);
    memory.accept(frame, true).expect("empty frame is valid")
}

fn accept_with_new_block(memory: &mut ObjectMemory) -> (FrameId, ObjectId) {
    let ty = block_type(memory);
    let frame = memory.derive_frame(None, None);
    let object = memory.create_object(frame, &ty, None, BTreeMap::new());
    let accepted = memory.accept(frame, true).expect("frame is valid");
    (accepted, object)
}

#[test]
fn undo_redo_trail() {
    let mut memory = common::memory();

    let v0 = accept_empty(&mut memory);
    let (v1, a) = accept_with_new_block(&mut memory);
    let (v2, b) = accept_with_new_block(&mut memory);

    assert_eq!(memory.current_frame(), Some(v2));
    assert_eq!(memory.undoable_frames(), &[v0, v1]);
    assert!(memory.redoable_frames().is_empty());
    assert!(memory.can_undo());
    assert!(!memory.can_redo());

    memory.undo(v1);
    assert_eq!(memory.current_frame(), Some(v1));
    assert_eq!(memory.undoable_frames(), &[v0]);
    assert_eq!(memory.redoable_frames(), &[v2]);
    let current = memory.current_view().expect("current view");
    assert!(current.contains(a));
    assert!(!current.contains(b));

    memory.undo(v0);
    assert_eq!(memory.current_frame(), Some(v0));
    assert!(memory.undoable_frames().is_empty());
    assert_eq!(memory.redoable_frames(), &[v1, v2]);
    let current = memory.current_view().expect("current view");
    assert!(!current.contains(a));
    assert!(!current.contains(b));

    memory.redo(v2);
    assert_eq!(memory.current_frame(), Some(v2));
    assert_eq!(memory.undoable_frames(), &[v0, v1]);
    assert!(memory.redoable_frames().is_empty());
    let current = memory.current_view().expect("current view");
    assert!(current.contains(a));
    assert!(current.contains(b));
}

#[test]
fn accepting_after_undo_truncates_redo() {
    let mut memory = common::memory();

    let v0 = accept_empty(&mut memory);
    let (_v1, a) = accept_with_new_block(&mut memory);
    let (_v2, b) = accept_with_new_block(&mut memory);

    memory.undo(v0);
    let (v3, c) = accept_with_new_block(&mut memory);

    assert_eq!(memory.current_frame(), Some(v3));
    assert_eq!(memory.undoable_frames(), &[v0]);
    assert!(memory.redoable_frames().is_empty());
    let current = memory.current_view().expect("current view");
    assert!(current.contains(c));
    assert!(!current.contains(a));
    assert!(!current.contains(b));
}

#[test]
fn undo_and_redo_reassign_references_only() {
    let mut memory = common::memory();

    let v0 = accept_empty(&mut memory);
    let (v1, a) = accept_with_new_block(&mut memory);

    let snapshot_before = memory
        .frame(v1)
        .expect("frame view")
        .snapshot_id(a)
        .expect("snapshot id");
    memory.undo(v0);
    memory.redo(v1);
    let snapshot_after = memory
        .frame(v1)
        .expect("frame view")
        .snapshot_id(a)
        .expect("snapshot id");
    assert_eq!(snapshot_before, snapshot_after);
}

#[test]
fn history_lists_never_overlap_current() {
    let mut memory = common::memory();

    let _v0 = accept_empty(&mut memory);
    let (v1, _) = accept_with_new_block(&mut memory);
    let (_v2, _) = accept_with_new_block(&mut memory);
    memory.undo(v1);

    let mut seen: Vec<FrameId> = Vec::new();
    seen.extend(memory.undoable_frames());
    seen.extend(memory.current_frame());
    seen.extend(memory.redoable_frames());
    let mut deduped = seen.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(seen.len(), deduped.len(), "history entries overlap: {seen:?}");
    for frame in seen {
        assert!(memory.stable_frame(frame).is_some(), "{frame} is not stable");
    }
}

#[test]
fn accept_without_history_leaves_undo_lists_alone() {
    let mut memory = common::memory();

    let _v0 = accept_empty(&mut memory);
    let (v1, _) = accept_with_new_block(&mut memory);

    let ty = block_type(&memory);
    let frame = memory.derive_frame(None, None);
    memory.create_object(frame, &ty, None, BTreeMap::new());
    let v2 = memory.accept(frame, false).expect("frame is valid");

    assert_eq!(memory.current_frame(), Some(v2));
    // v1 was not pushed; the undo list still holds only the first frame.
    assert_eq!(memory.undoable_frames().len(), 1);
    assert_ne!(memory.undoable_frames(), &[v1]);
}
