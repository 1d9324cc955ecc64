// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fmt::Debug;
use std::hash::Hash;

use crate::AStarWeight;

/// Directed, weighted connection to `target`, as returned by an [AStarGraph].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedEdge<V, W> {
    pub target: V,
    pub weight: W,
}

impl<V, W> WeightedEdge<V, W> {
    pub fn new(target: V, weight: W) -> Self {
        Self { target, weight }
    }
}

/// Capabilities a graph must provide to be searched by the [astar](crate::astar) functions.
///
/// Searches only ever read from the graph. Sharing one graph between searches
/// running on different threads is possible if the implementation is [Sync];
/// any internal caching is the implementation's responsibility.
pub trait AStarGraph {
    /// Opaque vertex identifier.
    type Vertex: Copy + Eq + Hash + Ord + Debug;

    /// Edge weight. All edge weights must be non-negative.
    type Weight: AStarWeight;

    /// Appends all edges leaving `vertex` to `edges`. The buffer is always empty when called.
    fn outgoing_edges(
        &self,
        vertex: Self::Vertex,
        edges: &mut Vec<WeightedEdge<Self::Vertex, Self::Weight>>,
    );

    /// Appends all edges entering `vertex` to `edges`, with `target` set to the
    /// _source_ of the edge. The buffer is always empty when called.
    ///
    /// Only used by the backward wave of [find_path_bidirectional](crate::astar::find_path_bidirectional).
    fn ingoing_edges(
        &self,
        vertex: Self::Vertex,
        edges: &mut Vec<WeightedEdge<Self::Vertex, Self::Weight>>,
    );

    /// Estimates the cost of the cheapest route from `from` to `to`.
    ///
    /// The estimate must never exceed the real cost and must be consistent
    /// (`h(u, t) <= w(u, v) + h(v, t)` for every edge). The bidirectional search
    /// additionally expects it to be symmetric. A constant zero is always valid.
    fn heuristic_cost_estimate(&self, from: Self::Vertex, to: Self::Vertex) -> Self::Weight;

    /// Tolerance used when comparing route weights.
    fn weight_epsilon(&self) -> Self::Weight {
        Self::Weight::EPSILON
    }
}

impl<G: AStarGraph + ?Sized> AStarGraph for &G {
    type Vertex = G::Vertex;
    type Weight = G::Weight;

    fn outgoing_edges(
        &self,
        vertex: Self::Vertex,
        edges: &mut Vec<WeightedEdge<Self::Vertex, Self::Weight>>,
    ) {
        (**self).outgoing_edges(vertex, edges)
    }

    fn ingoing_edges(
        &self,
        vertex: Self::Vertex,
        edges: &mut Vec<WeightedEdge<Self::Vertex, Self::Weight>>,
    ) {
        (**self).ingoing_edges(vertex, edges)
    }

    fn heuristic_cost_estimate(&self, from: Self::Vertex, to: Self::Vertex) -> Self::Weight {
        (**self).heuristic_cost_estimate(from, to)
    }

    fn weight_epsilon(&self) -> Self::Weight {
        (**self).weight_epsilon()
    }
}

/// View of a graph with all edges reversed.
///
/// Running a unidirectional wave over `Reversed(g)` from `t` computes distances _to_ `t` in `g`.
#[derive(Debug, Clone, Copy)]
pub struct Reversed<G>(pub G);

impl<G: AStarGraph> AStarGraph for Reversed<G> {
    type Vertex = G::Vertex;
    type Weight = G::Weight;

    fn outgoing_edges(
        &self,
        vertex: Self::Vertex,
        edges: &mut Vec<WeightedEdge<Self::Vertex, Self::Weight>>,
    ) {
        self.0.ingoing_edges(vertex, edges)
    }

    fn ingoing_edges(
        &self,
        vertex: Self::Vertex,
        edges: &mut Vec<WeightedEdge<Self::Vertex, Self::Weight>>,
    ) {
        self.0.outgoing_edges(vertex, edges)
    }

    fn heuristic_cost_estimate(&self, from: Self::Vertex, to: Self::Vertex) -> Self::Weight {
        self.0.heuristic_cost_estimate(to, from)
    }

    fn weight_epsilon(&self) -> Self::Weight {
        self.0.weight_epsilon()
    }
}
