// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Predicate algebra for selecting objects from a frame.
//!
//! Predicates are a sum type with explicit combinators rather than an
//! inheritance hierarchy; evaluation is a total recursive function over a
//! snapshot. Constraints pair a predicate (candidate selection) with a
//! requirement (violation detection).

use crate::frame::FrameView;
use crate::ident::ObjectId;
use crate::snapshot::ObjectSnapshot;

/// Object selection predicate.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Matches every object.
    Any,
    /// Matches objects whose type has the given name.
    IsType(String),
    /// Matches objects whose type mixes in the named trait.
    HasTrait(String),
    /// Both operands match.
    And(Box<Predicate>, Box<Predicate>),
    /// Either operand matches.
    Or(Box<Predicate>, Box<Predicate>),
    /// The operand does not match.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Predicate matching objects of the named type.
    #[must_use]
    pub fn is_type(name: impl Into<String>) -> Self {
        Self::IsType(name.into())
    }

    /// Predicate matching objects with the named trait.
    #[must_use]
    pub fn has_trait(name: impl Into<String>) -> Self {
        Self::HasTrait(name.into())
    }

    /// Conjunction combinator.
    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Disjunction combinator.
    #[must_use]
    pub fn or(self, other: Predicate) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Negation combinator.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Evaluates the predicate against one snapshot.
    #[must_use]
    pub fn matches(&self, snapshot: &ObjectSnapshot) -> bool {
        match self {
            Self::Any => true,
            Self::IsType(name) => snapshot.object_type().name == *name,
            Self::HasTrait(name) => snapshot.object_type().has_trait(name),
            Self::And(lhs, rhs) => lhs.matches(snapshot) && rhs.matches(snapshot),
            Self::Or(lhs, rhs) => lhs.matches(snapshot) || rhs.matches(snapshot),
            Self::Not(inner) => !inner.matches(snapshot),
        }
    }

    /// Selects matching objects from a frame, in ascending object id order.
    #[must_use]
    pub fn select(&self, view: &FrameView<'_>) -> Vec<ObjectId> {
        view.iter()
            .filter(|snapshot| self.matches(snapshot))
            .map(ObjectSnapshot::object_id)
            .collect()
    }
}
