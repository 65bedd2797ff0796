// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! atelier-core: versioned object-graph design store.
//!
//! The store holds a domain model as a typed, attributed graph of objects
//! and records its complete edit history as immutable frames forming an
//! undo/redo tree with a single linear active timeline. On top of the store
//! sits a small arithmetic expression sub-language used by application
//! domains to attach computed formulas to objects.
//!
//! # Editing cycle
//!
//! 1. Derive a [`MutableFrame`] from the current stable frame
//!    ([`ObjectMemory::derive_frame`]).
//! 2. Mutate snapshots through the copy-on-write point
//!    ([`ObjectMemory::mutable_object`]) or create and remove objects.
//! 3. Submit with [`ObjectMemory::accept`]: the frame is validated against
//!    the bound [`Metamodel`] and either promoted atomically onto the
//!    history timeline or rejected with every finding at once.
//!
//! # Determinism
//!
//! Identifier-keyed state lives in `BTreeMap`s and every traversal follows
//! ascending identifier order, so queries, validation reports, and
//! [`GraphView::topological_sort`] are reproducible run to run.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

/// Expression sub-language: lexer, parser, CST, binder, evaluator.
pub mod expr;

mod checker;
mod constraint;
#[cfg(feature = "serde")]
mod foreign;
mod frame;
mod ident;
mod memory;
mod metamodel;
mod predicate;
mod snapshot;
mod value;
mod view;

// Re-exports for stable public API
pub use checker::{check_constraints, validate_frame, FrameValidationError, TypeError};
pub use constraint::{Constraint, ConstraintViolation, Requirement};
#[cfg(feature = "serde")]
pub use foreign::{ForeignError, ForeignInfo, ForeignObject, ForeignStructure, ForeignVariant};
pub use frame::{FrameEntry, FrameState, FrameView, MutableFrame, StableFrame};
pub use ident::{FrameId, IdentitySpace, ObjectId, SnapshotId};
pub use memory::ObjectMemory;
pub use metamodel::{
    Attribute, Metamodel, MetamodelError, ObjectTrait, ObjectType, StructuralKind,
};
pub use predicate::Predicate;
pub use snapshot::{ObjectSnapshot, SnapshotState, StructuralComponent};
pub use value::{Atom, AtomType, Point, ValueError, ValueType, Variant, VariantArray};
pub use view::{
    EdgeDirection, GraphCycleError, GraphView, Neighborhood, NeighborhoodSelector,
};
