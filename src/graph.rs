// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::btree_map::{BTreeMap, Entry};

use crate::astar::{AStarGraph, WeightedEdge};
use crate::distance::crow_flies_bound;
use crate::{earth_distance, Edge, Node};

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct NodeEntry {
    pub(crate) node: Node,
    pub(crate) outgoing: Vec<Edge>,

    /// Edges entering this node; [Edge::to] holds the _source_ node.
    pub(crate) ingoing: Vec<Edge>,
}

/// Road network as a set of [Nodes](Node) and directed [Edges](Edge) between them.
///
/// Both outgoing and ingoing edges are kept for every node, which allows
/// searching backwards from the finish and removing nodes without leaving
/// dangling edges behind.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Graph(pub(crate) BTreeMap<i64, NodeEntry>);

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over all [Nodes](Node) in the graph, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.0.values().map(|e| &e.node)
    }

    /// Retrieves a [Node] with the provided id.
    pub fn get_node(&self, id: i64) -> Option<Node> {
        self.0.get(&id).map(|e| e.node)
    }

    /// Creates or updates a [Node] with `node.id`. Returns `false` if the node
    /// was rejected (zero id).
    ///
    /// All outgoing and incoming edges are preserved. Moving a node might violate
    /// the [Edge] cost invariant, and thus break route finding.
    pub fn set_node(&mut self, node: Node) -> bool {
        if node.id == 0 {
            return false;
        }

        match self.0.entry(node.id) {
            Entry::Vacant(e) => {
                e.insert(NodeEntry {
                    node,
                    ..Default::default()
                });
            }
            Entry::Occupied(mut e) => {
                e.get_mut().node = node;
            }
        }
        true
    }

    /// Deletes a [Node] with a given `id`, together with all edges
    /// leaving or entering it. Returns `false` if no such node existed.
    pub fn delete_node(&mut self, id: i64) -> bool {
        let Some(entry) = self.0.remove(&id) else {
            return false;
        };

        for e in &entry.outgoing {
            if let Some(other) = self.0.get_mut(&e.to) {
                other.ingoing.retain(|back| back.to != id);
            }
        }

        for e in &entry.ingoing {
            if let Some(other) = self.0.get_mut(&e.to) {
                other.outgoing.retain(|fwd| fwd.to != id);
            }
        }

        true
    }

    /// Finds the closest [Node] to the given position.
    ///
    /// This function requires computing the distance to every [Node] in the graph,
    /// and is not suitable for large graphs - see [NodeIndex](crate::NodeIndex).
    pub fn find_nearest_node(&self, lat: f32, lon: f32) -> Option<Node> {
        self.iter()
            .map(|nd| (earth_distance(lat, lon, nd.lat, nd.lon), *nd))
            .min_by(|(a_dist, _), (b_dist, _)| a_dist.total_cmp(b_dist))
            .map(|(_, nd)| nd)
    }

    /// Gets all outgoing [Edges](Edge) from a node with a given id.
    pub fn get_edges(&self, from_id: i64) -> &[Edge] {
        self.0
            .get(&from_id)
            .map(|e| e.outgoing.as_slice())
            .unwrap_or_default()
    }

    /// Gets all edges entering a node with a given id, with [Edge::to]
    /// set to the node each edge starts at.
    pub fn get_ingoing_edges(&self, to_id: i64) -> &[Edge] {
        self.0
            .get(&to_id)
            .map(|e| e.ingoing.as_slice())
            .unwrap_or_default()
    }

    /// Gets the cost of an [Edge] from one node to another.
    /// If such an edge doesn't exist, returns [f32::INFINITY].
    pub fn get_edge(&self, from_id: i64, to_id: i64) -> f32 {
        self.get_edges(from_id)
            .iter()
            .find(|e| e.to == to_id)
            .map(|e| e.cost)
            .unwrap_or(f32::INFINITY)
    }

    /// Creates or updates an [Edge] from a node with a given id.
    /// Returns `false` if either endpoint doesn't exist in the graph.
    pub fn set_edge(&mut self, from_id: i64, edge: Edge) -> bool {
        if !self.0.contains_key(&from_id) || !self.0.contains_key(&edge.to) {
            return false;
        }

        if let Some(from) = self.0.get_mut(&from_id) {
            upsert_edge(&mut from.outgoing, edge);
        }
        if let Some(to) = self.0.get_mut(&edge.to) {
            upsert_edge(
                &mut to.ingoing,
                Edge {
                    to: from_id,
                    cost: edge.cost,
                },
            );
        }
        true
    }

    /// Removes an edge from one node to another. Returns `false` if there was no such edge.
    pub fn delete_edge(&mut self, from_id: i64, to_id: i64) -> bool {
        let removed = self
            .0
            .get_mut(&from_id)
            .is_some_and(|from| remove_edge(&mut from.outgoing, to_id));

        if removed {
            if let Some(to) = self.0.get_mut(&to_id) {
                remove_edge(&mut to.ingoing, from_id);
            }
        }

        removed
    }

    /// Returns the sum of edge costs along `path`, or `None` if any consecutive pair
    /// isn't connected.
    pub fn path_cost(&self, path: &[i64]) -> Option<f64> {
        path.windows(2).try_fold(0.0, |acc, pair| {
            let cost = self.get_edge(pair[0], pair[1]);
            cost.is_finite().then(|| acc + cost as f64)
        })
    }

    fn append_edges(
        &self,
        edges: &[Edge],
        out: &mut Vec<WeightedEdge<i64, f64>>,
        mut accept: impl FnMut(&Node) -> bool,
    ) {
        out.extend(edges.iter().filter_map(|e| {
            let target = self.0.get(&e.to)?;
            accept(&target.node).then(|| WeightedEdge::new(e.to, e.cost as f64))
        }));
    }
}

fn upsert_edge(edges: &mut Vec<Edge>, edge: Edge) {
    if let Some(candidate) = edges.iter_mut().find(|e| e.to == edge.to) {
        *candidate = edge;
    } else {
        edges.push(edge);
    }
}

fn remove_edge(edges: &mut Vec<Edge>, to_id: i64) -> bool {
    match edges.iter().position(|e| e.to == to_id) {
        Some(idx) => {
            edges.swap_remove(idx);
            true
        }
        None => false,
    }
}

impl AStarGraph for Graph {
    type Vertex = i64;
    type Weight = f64;

    fn outgoing_edges(&self, vertex: i64, edges: &mut Vec<WeightedEdge<i64, f64>>) {
        self.append_edges(self.get_edges(vertex), edges, |_| true);
    }

    fn ingoing_edges(&self, vertex: i64, edges: &mut Vec<WeightedEdge<i64, f64>>) {
        self.append_edges(self.get_ingoing_edges(vertex), edges, |_| true);
    }

    fn heuristic_cost_estimate(&self, from: i64, to: i64) -> f64 {
        match (self.0.get(&from), self.0.get(&to)) {
            (Some(a), Some(b)) => crow_flies_bound(&a.node, &b.node),
            _ => 0.0,
        }
    }
}

/// View of a [Graph] restricted to the nodes of a single region.
///
/// Edges leaving the region are invisible. Searches over a region graph
/// stay local to it, which is what leaps are expanded with.
#[derive(Debug, Clone, Copy)]
pub struct RegionGraph<'a> {
    graph: &'a Graph,
    region: u32,
}

impl<'a> RegionGraph<'a> {
    pub fn new(graph: &'a Graph, region: u32) -> Self {
        Self { graph, region }
    }

    pub fn region(&self) -> u32 {
        self.region
    }
}

impl AStarGraph for RegionGraph<'_> {
    type Vertex = i64;
    type Weight = f64;

    fn outgoing_edges(&self, vertex: i64, edges: &mut Vec<WeightedEdge<i64, f64>>) {
        let region = self.region;
        self.graph
            .append_edges(self.graph.get_edges(vertex), edges, |n| n.region == region);
    }

    fn ingoing_edges(&self, vertex: i64, edges: &mut Vec<WeightedEdge<i64, f64>>) {
        let region = self.region;
        self.graph
            .append_edges(self.graph.get_ingoing_edges(vertex), edges, |n| n.region == region);
    }

    fn heuristic_cost_estimate(&self, from: i64, to: i64) -> f64 {
        self.graph.heuristic_cost_estimate(from, to)
    }
}
