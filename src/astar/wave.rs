// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;

use crate::astar::{AStarGraph, WeightedEdge};
use crate::AStarWeight;

/// Entry of the priority queue used by [propagate_wave]:
/// a vertex with its tentative (possibly reduced) distance from the start.
#[derive(Debug, Clone, Copy)]
pub struct State<V, W> {
    pub vertex: V,
    pub distance: W,
}

impl<V, W: PartialOrd> PartialEq for State<V, W> {
    fn eq(&self, other: &Self) -> bool {
        self.distance.eq(&other.distance)
    }
}

impl<V, W: PartialOrd> Eq for State<V, W> {}

impl<V, W: PartialOrd> PartialOrd for State<V, W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V, W: PartialOrd> Ord for State<V, W> {
    fn cmp(&self, other: &Self) -> Ordering {
        // NOTE: We revert the order of comparison,
        // as shorter distances are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
    }
}

/// Walks `parents` back from `last` and returns the path in forward order (ending with `last`).
pub(crate) fn reconstruct_path<V: Copy + Eq + Hash>(parents: &HashMap<V, V>, mut last: V) -> Vec<V> {
    let mut path = vec![last];

    while let Some(&v) = parents.get(&last) {
        path.push(v);
        last = v;
    }

    path.reverse();
    return path;
}

/// Best known distances and parents of vertices reached by [propagate_wave].
///
/// A vertex has a parent if and only if it was reached from another vertex
/// (the start of a wave has a distance, but no parent).
/// The context may be reused between waves; [propagate_wave] clears it before starting.
#[derive(Debug, Clone)]
pub struct Context<V, W> {
    distances: HashMap<V, W>,
    parents: HashMap<V, V>,
}

impl<V: Copy + Eq + Hash, W: AStarWeight> Context<V, W> {
    pub fn new() -> Self {
        Self {
            distances: HashMap::default(),
            parents: HashMap::default(),
        }
    }

    pub fn clear(&mut self) {
        self.distances.clear();
        self.parents.clear();
    }

    pub fn has_distance(&self, vertex: V) -> bool {
        self.distances.contains_key(&vertex)
    }

    /// Returns the best known distance to `vertex`, or [AStarWeight::MAX] if it was not reached.
    pub fn distance(&self, vertex: V) -> W {
        self.distances.get(&vertex).copied().unwrap_or(W::MAX)
    }

    pub fn set_distance(&mut self, vertex: V, distance: W) {
        self.distances.insert(vertex, distance);
    }

    pub fn parent(&self, child: V) -> Option<V> {
        self.parents.get(&child).copied()
    }

    pub fn set_parent(&mut self, child: V, parent: V) {
        self.parents.insert(child, parent);
    }

    /// Iterates over all reached vertices and their distances, in arbitrary order.
    pub fn distances(&self) -> impl Iterator<Item = (V, W)> + '_ {
        self.distances.iter().map(|(&v, &d)| (v, d))
    }

    /// Returns the path from the start of the wave to `vertex`.
    pub fn reconstruct_path(&self, vertex: V) -> Vec<V> {
        reconstruct_path(&self.parents, vertex)
    }
}

impl<V: Copy + Eq + Hash, W: AStarWeight> Default for Context<V, W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs Dijkstra's algorithm from `start`, customized by three callbacks:
///
/// - `visit_vertex(vertex, distance)` is called once a vertex is settled;
///   returning `false` stops the wave immediately,
/// - `adjust_edge_weight(from, edge)` maps a raw edge weight into the weight
///   used by the wave (e.g. an A* reduced weight); must never be negative,
/// - `filter_states(state)` may reject an improving relaxation, keeping the
///   vertex out of the queue.
///
/// A relaxation only happens if it improves the best known distance by more than
/// [AStarGraph::weight_epsilon]. Self-loops are ignored.
pub fn propagate_wave<G, Visit, Adjust, Filter>(
    graph: &G,
    start: G::Vertex,
    context: &mut Context<G::Vertex, G::Weight>,
    mut visit_vertex: Visit,
    mut adjust_edge_weight: Adjust,
    mut filter_states: Filter,
) where
    G: AStarGraph,
    Visit: FnMut(G::Vertex, G::Weight) -> bool,
    Adjust: FnMut(G::Vertex, &WeightedEdge<G::Vertex, G::Weight>) -> G::Weight,
    Filter: FnMut(&State<G::Vertex, G::Weight>) -> bool,
{
    let epsilon = graph.weight_epsilon();

    context.clear();

    let mut queue: BinaryHeap<State<G::Vertex, G::Weight>> = BinaryHeap::default();
    let mut adj: Vec<WeightedEdge<G::Vertex, G::Weight>> = Vec::default();

    context.set_distance(start, G::Weight::ZERO);
    queue.push(State {
        vertex: start,
        distance: G::Weight::ZERO,
    });

    while let Some(state_v) = queue.pop() {
        // The same vertex may be pushed multiple times before being settled.
        if state_v.distance > context.distance(state_v.vertex) {
            continue;
        }

        if !visit_vertex(state_v.vertex, state_v.distance) {
            return;
        }

        adj.clear();
        graph.outgoing_edges(state_v.vertex, &mut adj);

        for edge in &adj {
            if edge.target == state_v.vertex {
                continue;
            }

            let edge_weight = adjust_edge_weight(state_v.vertex, edge);
            let state_w = State {
                vertex: edge.target,
                distance: state_v.distance + edge_weight,
            };

            if state_w.distance >= context.distance(state_w.vertex) - epsilon {
                continue;
            }

            if !filter_states(&state_w) {
                continue;
            }

            context.set_distance(state_w.vertex, state_w.distance);
            context.set_parent(state_w.vertex, state_v.vertex);
            queue.push(state_w);
        }
    }
}

/// [propagate_wave] over raw edge weights, without any filtering.
pub fn propagate_wave_plain<G, Visit>(
    graph: &G,
    start: G::Vertex,
    context: &mut Context<G::Vertex, G::Weight>,
    visit_vertex: Visit,
) where
    G: AStarGraph,
    Visit: FnMut(G::Vertex, G::Weight) -> bool,
{
    propagate_wave(
        graph,
        start,
        context,
        visit_vertex,
        |_, edge| edge.weight,
        |_| true,
    )
}
