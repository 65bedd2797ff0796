// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph view: a transient projection of a frame as nodes and edges.
//!
//! Snapshots with structural kind `node` surface as nodes, `edge` snapshots
//! as edges with endpoints resolved against the same frame. The view is
//! strictly read-only and exposes only query methods; neighborhood queries
//! are linear scans; callers needing speed cache their own indexes.
//!
//! Traversal order is deterministic throughout: iteration follows ascending
//! object id, and [`GraphView::topological_sort`] breaks ties the same way.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::frame::FrameView;
use crate::ident::ObjectId;
use crate::metamodel::StructuralKind;
use crate::predicate::Predicate;
use crate::snapshot::ObjectSnapshot;

/// Direction selector for neighborhood queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    /// Edges whose target is the selected node.
    Incoming,
    /// Edges whose origin is the selected node.
    Outgoing,
}

/// Selects the edges of interest around a node.
#[derive(Debug, Clone)]
pub struct NeighborhoodSelector {
    /// Which endpoint the node of interest occupies.
    pub direction: EdgeDirection,
    /// Filter applied to the candidate edges.
    pub predicate: Predicate,
}

impl NeighborhoodSelector {
    /// Creates a selector.
    #[must_use]
    pub fn new(direction: EdgeDirection, predicate: Predicate) -> Self {
        Self {
            direction,
            predicate,
        }
    }
}

/// Filtered edges around one node, with the nodes at the opposite endpoints.
#[derive(Debug, Clone)]
pub struct Neighborhood {
    /// The node the neighborhood is centered on.
    pub node: ObjectId,
    /// Direction the selector filtered by.
    pub direction: EdgeDirection,
    edges: Vec<ObjectId>,
    nodes: Vec<ObjectId>,
}

impl Neighborhood {
    /// Selected edges, in ascending id order.
    #[must_use]
    pub fn edges(&self) -> &[ObjectId] {
        &self.edges
    }

    /// Opposite-endpoint nodes of the selected edges, aligned with
    /// [`Neighborhood::edges`].
    #[must_use]
    pub fn nodes(&self) -> &[ObjectId] {
        &self.nodes
    }
}

/// The sorted input contained a cycle; a topological order does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("graph contains a cycle through {} edge(s)", .back_edges.len())]
pub struct GraphCycleError {
    /// Edges that survive the acyclic peel, i.e. edges on or behind a cycle.
    pub back_edges: Vec<ObjectId>,
}

/// Read-only graph projection of a frame.
#[derive(Debug, Clone, Copy)]
pub struct GraphView<'a> {
    frame: FrameView<'a>,
}

impl<'a> GraphView<'a> {
    /// Creates a view over a frame.
    #[must_use]
    pub fn new(frame: FrameView<'a>) -> Self {
        Self { frame }
    }

    /// The underlying frame view.
    #[must_use]
    pub fn frame(&self) -> FrameView<'a> {
        self.frame
    }

    /// Iterates over node snapshots in ascending object id order.
    pub fn nodes(&self) -> impl Iterator<Item = &'a ObjectSnapshot> + '_ {
        self.frame
            .iter()
            .filter(|snapshot| snapshot.structural_kind() == StructuralKind::Node)
    }

    /// Iterates over edge snapshots in ascending object id order.
    pub fn edges(&self) -> impl Iterator<Item = &'a ObjectSnapshot> + '_ {
        self.frame
            .iter()
            .filter(|snapshot| snapshot.structural_kind() == StructuralKind::Edge)
    }

    /// The node with the given id, if the frame holds one.
    #[must_use]
    pub fn node(&self, id: ObjectId) -> Option<&'a ObjectSnapshot> {
        self.frame
            .object(id)
            .filter(|snapshot| snapshot.structural_kind() == StructuralKind::Node)
    }

    /// The edge with the given id, if the frame holds one.
    #[must_use]
    pub fn edge(&self, id: ObjectId) -> Option<&'a ObjectSnapshot> {
        self.frame
            .object(id)
            .filter(|snapshot| snapshot.structural_kind() == StructuralKind::Edge)
    }

    /// Returns `true` when the frame holds a node with the given id.
    #[must_use]
    pub fn contains_node(&self, id: ObjectId) -> bool {
        self.node(id).is_some()
    }

    /// Returns `true` when the frame holds an edge with the given id.
    #[must_use]
    pub fn contains_edge(&self, id: ObjectId) -> bool {
        self.edge(id).is_some()
    }

    /// Edges originating from the given node.
    #[must_use]
    pub fn outgoing(&self, origin: ObjectId) -> Vec<&'a ObjectSnapshot> {
        self.edges()
            .filter(|edge| edge.origin() == Some(origin))
            .collect()
    }

    /// Edges pointing at the given node.
    #[must_use]
    pub fn incoming(&self, target: ObjectId) -> Vec<&'a ObjectSnapshot> {
        self.edges()
            .filter(|edge| edge.target() == Some(target))
            .collect()
    }

    /// Edges touching the given node from either side.
    #[must_use]
    pub fn neighbours(&self, id: ObjectId) -> Vec<&'a ObjectSnapshot> {
        self.edges()
            .filter(|edge| edge.origin() == Some(id) || edge.target() == Some(id))
            .collect()
    }

    /// Nodes matching a predicate, in ascending id order.
    #[must_use]
    pub fn select_nodes(&self, predicate: &Predicate) -> Vec<&'a ObjectSnapshot> {
        self.nodes()
            .filter(|snapshot| predicate.matches(snapshot))
            .collect()
    }

    /// Edges matching a predicate, in ascending id order.
    #[must_use]
    pub fn select_edges(&self, predicate: &Predicate) -> Vec<&'a ObjectSnapshot> {
        self.edges()
            .filter(|snapshot| predicate.matches(snapshot))
            .collect()
    }

    /// Filtered edges around a node, with their opposite endpoints.
    #[must_use]
    pub fn hood(&self, node: ObjectId, selector: &NeighborhoodSelector) -> Neighborhood {
        let mut edges: Vec<ObjectId> = Vec::new();
        let mut nodes: Vec<ObjectId> = Vec::new();
        for edge in self.edges() {
            if !selector.predicate.matches(edge) {
                continue;
            }
            let (Some(origin), Some(target)) = (edge.origin(), edge.target()) else {
                continue;
            };
            let opposite = match selector.direction {
                EdgeDirection::Outgoing if origin == node => target,
                EdgeDirection::Incoming if target == node => origin,
                _ => continue,
            };
            edges.push(edge.object_id());
            nodes.push(opposite);
        }
        Neighborhood {
            node,
            direction: selector.direction,
            edges,
            nodes,
        }
    }

    /// Topological order of the induced subgraph, by Kahn's algorithm.
    ///
    /// Only the given nodes and edges participate; edges whose endpoints are
    /// outside `nodes` are ignored. Ready nodes are consumed in ascending
    /// object id order so the result is reproducible.
    ///
    /// # Errors
    /// Returns [`GraphCycleError`] with the surviving back edges when the
    /// subgraph is cyclic.
    pub fn topological_sort(
        &self,
        nodes: &[ObjectId],
        edges: &[ObjectId],
    ) -> Result<Vec<ObjectId>, GraphCycleError> {
        let node_set: BTreeSet<ObjectId> = nodes.iter().copied().collect();
        let mut endpoints: BTreeMap<ObjectId, (ObjectId, ObjectId)> = BTreeMap::new();
        for &edge_id in edges {
            let Some(edge) = self.edge(edge_id) else {
                continue;
            };
            let (Some(origin), Some(target)) = (edge.origin(), edge.target()) else {
                continue;
            };
            if node_set.contains(&origin) && node_set.contains(&target) {
                endpoints.insert(edge_id, (origin, target));
            }
        }

        let mut in_degree: BTreeMap<ObjectId, usize> =
            node_set.iter().map(|&node| (node, 0)).collect();
        for &(_, target) in endpoints.values() {
            if let Some(degree) = in_degree.get_mut(&target) {
                *degree += 1;
            }
        }

        let mut ready: BTreeSet<ObjectId> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&node, _)| node)
            .collect();
        let mut remaining = endpoints;
        let mut sorted: Vec<ObjectId> = Vec::with_capacity(node_set.len());

        while let Some(&node) = ready.iter().next() {
            ready.remove(&node);
            sorted.push(node);
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

        if remaining.is_empty() {
            Ok(sorted)
        } else {
            Err(GraphCycleError {
                back_edges: remaining.into_keys().collect(),
            })
        }
    }
}
