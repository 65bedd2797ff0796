// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Constraints: predicate/requirement pairs checked at frame acceptance.
//!
//! A constraint selects candidate objects with a [`Predicate`] and feeds them
//! to a [`Requirement`], which returns the subset violating it. Requirements
//! are domain-neutral; application metamodels compose them with predicates to
//! express their rules.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::frame::FrameView;
use crate::ident::ObjectId;
use crate::predicate::Predicate;
use crate::value::Variant;

/// Violation check applied to a constraint's candidate set.
#[derive(Debug, Clone)]
pub enum Requirement {
    /// Every candidate is a violator. Used to forbid whole object classes.
    RejectAll,
    /// No candidate is ever a violator.
    AcceptAll,
    /// The named attribute must be unique across the candidate set; every
    /// member of a duplicate group is a violator. Candidates without the
    /// attribute are ignored.
    UniqueAttribute(String),
    /// No two candidate edges may connect the same pair of objects in
    /// opposite directions. Self-loops violate trivially.
    UnidirectionalEdge,
    /// The subgraph induced by candidate edges matching the inner predicate
    /// must be acyclic; edges participating in a cycle are violators.
    AcyclicGraph(Predicate),
}

impl Requirement {
    /// Returns the candidates violating this requirement, in ascending
    /// object id order. Pure; the frame is never touched.
    #[must_use]
    pub fn check(&self, view: &FrameView<'_>, candidates: &[ObjectId]) -> Vec<ObjectId> {
        match self {
            Self::RejectAll => candidates.to_vec(),
            Self::AcceptAll => Vec::new(),
            Self::UniqueAttribute(name) => check_unique_attribute(view, candidates, name),
            Self::UnidirectionalEdge => check_unidirectional(view, candidates),
            Self::AcyclicGraph(edge_predicate) => {
                check_acyclic(view, candidates, edge_predicate)
            }
        }
    }
}

fn check_unique_attribute(
    view: &FrameView<'_>,
    candidates: &[ObjectId],
    name: &str,
) -> Vec<ObjectId> {
    let mut groups: HashMap<Variant, Vec<ObjectId>> = HashMap::new();
    for &candidate in candidates {
        let Some(snapshot) = view.object(candidate) else {
            continue;
        };
        if let Some(value) = snapshot.attribute(name) {
            groups.entry(value.clone()).or_default().push(candidate);
        }
    }
    let mut violators: BTreeSet<ObjectId> = BTreeSet::new();
    for group in groups.values() {
        if group.len() > 1 {
            violators.extend(group.iter().copied());
        }
    }
    violators.into_iter().collect()
}

fn check_unidirectional(view: &FrameView<'_>, candidates: &[ObjectId]) -> Vec<ObjectId> {
    let mut endpoints: BTreeMap<ObjectId, (ObjectId, ObjectId)> = BTreeMap::new();
    for &candidate in candidates {
        let Some(snapshot) = view.object(candidate) else {
            continue;
        };
        if let (Some(origin), Some(target)) = (snapshot.origin(), snapshot.target()) {
            endpoints.insert(candidate, (origin, target));
        }
    }
    let mut violators: BTreeSet<ObjectId> = BTreeSet::new();
    for (&edge, &(origin, target)) in &endpoints {
        if origin == target {
            violators.insert(edge);
            continue;
        }
        for (&other, &(other_origin, other_target)) in &endpoints {
            if other != edge && other_origin == target && other_target == origin {
                violators.insert(edge);
                violators.insert(other);
            }
        }
    }
    violators.into_iter().collect()
}

/// Kahn-style peel: repeatedly drop edges out of zero-in-degree endpoints;
/// whatever survives participates in a cycle.
fn check_acyclic(
    view: &FrameView<'_>,
    candidates: &[ObjectId],
    edge_predicate: &Predicate,
) -> Vec<ObjectId> {
    let mut edges: BTreeMap<ObjectId, (ObjectId, ObjectId)> = BTreeMap::new();
    for &candidate in candidates {
        let Some(snapshot) = view.object(candidate) else {
            continue;
        };
        if !edge_predicate.matches(snapshot) {
            continue;
        }
        if let (Some(origin), Some(target)) = (snapshot.origin(), snapshot.target()) {
            edges.insert(candidate, (origin, target));
        }
    }

    let mut in_degree: BTreeMap<ObjectId, usize> = BTreeMap::new();
    for &(origin, target) in edges.values() {
        in_degree.entry(origin).or_insert(0);
        *in_degree.entry(target).or_insert(0) += 1;
    }

    let mut ready: BTreeSet<ObjectId> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&node, _)| node)
        .collect();
    let mut remaining = edges.clone();
    while let Some(&node) = ready.iter().next() {
        ready.remove(&node);
        let outgoing: Vec<ObjectId> = remaining
            .iter()
            .filter(|(_, &(origin, _))| origin == node)
            .map(|(&edge, _)| edge)
            .collect();
        for edge in outgoing {
            let Some((_, target)) = remaining.remove(&edge) else {
                continue;
            };
            let Some(degree) = in_degree.get_mut(&target) else {
                continue;
            };
            *degree -= 1;
            if *degree == 0 {
                ready.insert(target);
            }
        }
    }

    remaining.into_keys().collect()
}

/// Named constraint a frame must satisfy at acceptance.
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Constraint name, used in violation reports.
    pub name: String,
    /// Selects candidate objects from the frame.
    pub predicate: Predicate,
    /// Returns the candidates that violate the constraint.
    pub requirement: Requirement,
}

impl Constraint {
    /// Creates a constraint.
    #[must_use]
    pub fn new(name: impl Into<String>, predicate: Predicate, requirement: Requirement) -> Self {
        Self {
            name: name.into(),
            predicate,
            requirement,
        }
    }
}

/// One constraint's violators within a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintViolation {
    /// Name of the violated constraint.
    pub constraint: String,
    /// Violating objects, in ascending id order.
    pub objects: Vec<ObjectId>,
}

impl core::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "constraint {} violated by {} object(s)",
            self.constraint,
            self.objects.len()
        )
    }
}
