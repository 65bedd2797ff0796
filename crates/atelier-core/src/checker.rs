// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Frame validation: referential integrity, attribute typing, constraints.
//!
//! Validation accumulates **all** findings before returning, so a caller
//! sees every broken reference, type error, and constraint violation of a
//! frame in one pass. It is pure: the frame is never modified, which is what
//! makes `accept` atomic: promotion starts only after validation succeeds.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::constraint::ConstraintViolation;
use crate::frame::FrameView;
use crate::ident::ObjectId;
use crate::metamodel::Metamodel;
use crate::value::ValueType;

/// One attribute-level finding on one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// The snapshot carries an attribute its type does not declare.
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),
    /// A declared attribute with no default is absent.
    #[error("missing required attribute: {0}")]
    MissingAttribute(String),
    /// A declared attribute carries a value of the wrong kind.
    #[error("attribute {attribute}: expected {expected}, got {got}")]
    TypeMismatch {
        /// Attribute name.
        attribute: String,
        /// Kind declared by the type.
        expected: ValueType,
        /// Kind actually carried.
        got: ValueType,
    },
}

/// Aggregate validation failure for one frame.
///
/// The frame stays open and the memory is untouched when this is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameValidationError {
    /// Objects whose structural references do not resolve in the frame.
    pub broken_references: Vec<ObjectId>,
    /// Attribute findings per object.
    pub type_errors: BTreeMap<ObjectId, Vec<TypeError>>,
    /// Constraint violations in constraint declaration order.
    pub violations: Vec<ConstraintViolation>,
}

impl FrameValidationError {
    /// Returns `true` when no finding was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.broken_references.is_empty()
            && self.type_errors.is_empty()
            && self.violations.is_empty()
    }
}

impl core::fmt::Display for FrameValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "frame validation failed: {} broken reference(s), {} object(s) with type errors, {} constraint violation(s)",
            self.broken_references.len(),
            self.type_errors.len(),
            self.violations.len()
        )
    }
}

impl std::error::Error for FrameValidationError {}

/// Validates a frame against a metamodel.
///
/// # Errors
/// Returns the aggregate [`FrameValidationError`] carrying every broken
/// reference, attribute finding, and constraint violation of the frame.
pub fn validate_frame(
    view: &FrameView<'_>,
    metamodel: &Metamodel,
) -> Result<(), FrameValidationError> {
    let mut result = FrameValidationError::default();

    for snapshot in view.iter() {
        let mut references: Vec<ObjectId> = Vec::new();
        if let Some(origin) = snapshot.origin() {
            references.push(origin);
        }
        if let Some(target) = snapshot.target() {
            references.push(target);
        }
        if let Some(parent) = snapshot.parent() {
            references.push(parent);
        }
        references.extend_from_slice(snapshot.children());
        if references.iter().any(|&reference| !view.contains(reference)) {
            result.broken_references.push(snapshot.object_id());
        }

        let findings = check_attributes(snapshot);
        if !findings.is_empty() {
            result.type_errors.insert(snapshot.object_id(), findings);
        }
    }

    result.violations = check_constraints(view, metamodel);

    if result.is_empty() {
        Ok(())
    } else {
        Err(result)
    }
}

fn check_attributes(snapshot: &crate::snapshot::ObjectSnapshot) -> Vec<TypeError> {
    let object_type = snapshot.object_type();
    let mut findings: Vec<TypeError> = Vec::new();

    for descriptor in object_type.attributes() {
        match snapshot.attribute(&descriptor.name) {
            Some(value) => {
                let got = value.value_type();
                if got != descriptor.value_type {
                    findings.push(TypeError::TypeMismatch {
                        attribute: descriptor.name.clone(),
                        expected: descriptor.value_type,
                        got,
                    });
                }
            }
            None if descriptor.default.is_none() => {
                findings.push(TypeError::MissingAttribute(descriptor.name.clone()));
            }
            None => {}
        }
    }

    for (name, _) in snapshot.attributes() {
        if object_type.attribute(name).is_none() {
            findings.push(TypeError::UnknownAttribute(name.clone()));
        }
    }

    findings
}

/// Runs every metamodel constraint over the frame.
///
/// Pure; returns violations in constraint declaration order.
#[must_use]
pub fn check_constraints(
    view: &FrameView<'_>,
    metamodel: &Metamodel,
) -> Vec<ConstraintViolation> {
    let mut violations = Vec::new();
    for constraint in &metamodel.constraints {
        let candidates = constraint.predicate.select(view);
        let violators = constraint.requirement.check(view, &candidates);
        if !violators.is_empty() {
            violations.push(ConstraintViolation {
                constraint: constraint.name.clone(),
                objects: violators,
            });
        }
    }
    violations
}
