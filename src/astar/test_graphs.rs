// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, HashMap};

use crate::astar::{AStarGraph, WeightedEdge};

/// Small adjacency-list graph used by the engine tests, with an optional
/// euclidean heuristic over per-vertex coordinates.
#[derive(Debug, Default, Clone)]
pub(crate) struct SimpleGraph {
    outgoing: BTreeMap<u32, Vec<WeightedEdge<u32, f64>>>,
    ingoing: BTreeMap<u32, Vec<WeightedEdge<u32, f64>>>,
    coords: HashMap<u32, (f64, f64)>,
}

impl SimpleGraph {
    pub(crate) fn from_edges(edges: &[(u32, u32, f64)]) -> Self {
        let mut g = Self::default();
        for &(from, to, weight) in edges {
            g.add_edge(from, to, weight);
        }
        g
    }

    pub(crate) fn add_edge(&mut self, from: u32, to: u32, weight: f64) {
        self.outgoing
            .entry(from)
            .or_default()
            .push(WeightedEdge::new(to, weight));
        self.ingoing
            .entry(to)
            .or_default()
            .push(WeightedEdge::new(from, weight));
    }

    pub(crate) fn set_coords(&mut self, vertex: u32, x: f64, y: f64) {
        self.coords.insert(vertex, (x, y));
    }
}

impl AStarGraph for SimpleGraph {
    type Vertex = u32;
    type Weight = f64;

    fn outgoing_edges(&self, vertex: u32, edges: &mut Vec<WeightedEdge<u32, f64>>) {
        if let Some(e) = self.outgoing.get(&vertex) {
            edges.extend_from_slice(e);
        }
    }

    fn ingoing_edges(&self, vertex: u32, edges: &mut Vec<WeightedEdge<u32, f64>>) {
        if let Some(e) = self.ingoing.get(&vertex) {
            edges.extend_from_slice(e);
        }
    }

    fn heuristic_cost_estimate(&self, from: u32, to: u32) -> f64 {
        match (self.coords.get(&from), self.coords.get(&to)) {
            (Some(&(x1, y1)), Some(&(x2, y2))) => (x1 - x2).hypot(y1 - y2),
            _ => 0.0,
        }
    }
}

/// The graph from the classic 5-vertex scenario:
/// (0,1,10) (1,2,5) (2,3,5) (2,4,10) (3,4,3); shortest 0→4 is 0-1-2-3-4 with weight 23.
pub(crate) fn five_vertex_graph() -> SimpleGraph {
    SimpleGraph::from_edges(&[
        (0, 1, 10.0),
        (1, 2, 5.0),
        (2, 3, 5.0),
        (2, 4, 10.0),
        (3, 4, 3.0),
    ])
}
