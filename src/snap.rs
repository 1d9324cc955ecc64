// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{earth_distance, Graph, Node};

#[derive(Debug, Clone, Copy)]
struct KdNode {
    pivot: Node,
    left: Option<u32>,
    right: Option<u32>,
}

/// NodeIndex snaps positions to the nearest [Node] of a [Graph] using
/// a [k-d tree](https://en.wikipedia.org/wiki/K-d_tree) stored in a flat arena.
///
/// [Graph::find_nearest_node] has to look at every node, which quickly dominates
/// the time needed to answer a routing query on large graphs.
///
/// Latitude and longitude are split as if they were euclidean coordinates, which
/// breaks down around the antimeridian and the poles.
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    nodes: Vec<KdNode>,
    root: Option<u32>,
}

impl NodeIndex {
    /// Builds an index over every node of the graph.
    pub fn new(graph: &Graph) -> Self {
        Self::from_iter(graph.iter().copied())
    }

    /// Builds an index over the nodes of a single region.
    pub fn for_region(graph: &Graph, region: u32) -> Self {
        Self::from_iter(graph.iter().filter(|n| n.region == region).copied())
    }

    pub fn from_iter<I: IntoIterator<Item = Node>>(nodes: I) -> Self {
        let mut pending = nodes.into_iter().collect::<Vec<_>>();
        let mut index = Self {
            nodes: Vec::with_capacity(pending.len()),
            root: None,
        };
        index.root = index.build(&mut pending, false);
        index
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn build(&mut self, nodes: &mut [Node], lon_divides: bool) -> Option<u32> {
        if nodes.is_empty() {
            return None;
        }

        if lon_divides {
            nodes.sort_by(|a, b| a.lon.total_cmp(&b.lon));
        } else {
            nodes.sort_by(|a, b| a.lat.total_cmp(&b.lat));
        }

        let median = nodes.len() / 2;
        let idx = self.nodes.len() as u32;
        self.nodes.push(KdNode {
            pivot: nodes[median],
            left: None,
            right: None,
        });

        let (left, pivot_and_right) = nodes.split_at_mut(median);
        let left = self.build(left, !lon_divides);
        let right = self.build(&mut pivot_and_right[1..], !lon_divides);

        let entry = &mut self.nodes[idx as usize];
        entry.left = left;
        entry.right = right;
        Some(idx)
    }

    /// Finds the closest indexed [Node] to the given position.
    /// Returns `None` only if the index is empty.
    pub fn find_nearest_node(&self, lat: f32, lon: f32) -> Option<Node> {
        let mut best: Option<(Node, f32)> = None;
        if let Some(root) = self.root {
            self.search(root, lat, lon, false, &mut best);
        }
        best.map(|(n, _)| n)
    }

    fn search(&self, idx: u32, lat: f32, lon: f32, lon_divides: bool, best: &mut Option<(Node, f32)>) {
        let kd = &self.nodes[idx as usize];
        let dist = earth_distance(lat, lon, kd.pivot.lat, kd.pivot.lon);
        if best.is_none_or(|(_, best_dist)| dist < best_dist) {
            *best = Some((kd.pivot, dist));
        }

        let first_left = if lon_divides {
            lon < kd.pivot.lon
        } else {
            lat < kd.pivot.lat
        };
        let (first, second) = if first_left {
            (kd.left, kd.right)
        } else {
            (kd.right, kd.left)
        };

        if let Some(branch) = first {
            self.search(branch, lat, lon, !lon_divides, best);
        }

        if let Some(branch) = second {
            // The other half may only hold a closer node if the splitting
            // line is closer than the best candidate.
            let (axis_lat, axis_lon) = if lon_divides {
                (lat, kd.pivot.lon)
            } else {
                (kd.pivot.lat, lon)
            };
            let dist_to_axis = earth_distance(lat, lon, axis_lat, axis_lon);
            if best.is_none_or(|(_, best_dist)| dist_to_axis < best_dist) {
                self.search(branch, lat, lon, !lon_divides, best);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes() -> Vec<Node> {
        [
            (1, 0.01, 0.01),
            (2, 0.01, 0.05),
            (3, 0.03, 0.09),
            (4, 0.04, 0.03),
            (5, 0.04, 0.07),
            (6, 0.07, 0.03),
            (7, 0.07, 0.01),
            (8, 0.08, 0.05),
            (9, 0.08, 0.09),
        ]
        .into_iter()
        .map(|(id, lat, lon)| Node {
            id,
            lat,
            lon,
            region: if lon < 0.05 { 1 } else { 2 },
        })
        .collect()
    }

    #[test]
    fn nearest_node() {
        let index = NodeIndex::from_iter(nodes());
        assert_eq!(index.len(), 9);
        assert_eq!(index.find_nearest_node(0.02, 0.02).map(|n| n.id), Some(1));
        assert_eq!(index.find_nearest_node(0.05, 0.03).map(|n| n.id), Some(4));
        assert_eq!(index.find_nearest_node(0.05, 0.08).map(|n| n.id), Some(5));
        assert_eq!(index.find_nearest_node(0.09, 0.06).map(|n| n.id), Some(8));
    }

    #[test]
    fn agrees_with_linear_scan() {
        let mut g = Graph::new();
        for n in nodes() {
            g.set_node(n);
        }
        let index = NodeIndex::new(&g);

        for i in 0..10 {
            for j in 0..10 {
                let (lat, lon) = (i as f32 * 0.01, j as f32 * 0.01);
                let expected = g.find_nearest_node(lat, lon).unwrap();
                let got = index.find_nearest_node(lat, lon).unwrap();
                assert_eq!(
                    earth_distance(lat, lon, expected.lat, expected.lon),
                    earth_distance(lat, lon, got.lat, got.lon),
                );
            }
        }
    }

    #[test]
    fn region_filter() {
        let mut g = Graph::new();
        for n in nodes() {
            g.set_node(n);
        }
        let index = NodeIndex::for_region(&g, 2);
        assert_eq!(index.find_nearest_node(0.02, 0.02).map(|n| n.id), Some(2));
    }

    #[test]
    fn empty() {
        let index = NodeIndex::from_iter(std::iter::empty());
        assert!(index.is_empty());
        assert_eq!(index.find_nearest_node(0.0, 0.0), None);
    }
}
