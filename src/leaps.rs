// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Routing between regions through precomputed transitions.
//!
//! Every node of a [Graph] belongs to a region. Nodes with an edge to or from
//! another region are transitions: _enters_ have an ingoing edge from another region,
//! _exits_ have an outgoing edge into another region. [CrossRegionIndex] stores,
//! for every region, the weight of the shortest in-region path from each enter
//! to each exit - a _leap_.
//!
//! A query runs A* over a [LeapsGraph]: the start, the finish, and all transitions,
//! connected by leaps and real cross-region edges. The resulting coarse path is
//! then expanded back into graph nodes by [process_leaps].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::astar::{
    find_path_bidirectional, propagate_wave_plain, AStarError, AStarGraph, Context, Params,
    Reversed, RoutingResult, Visitor, WeightedEdge,
};
use crate::cache::RoutesCache;
use crate::{Cancellable, Graph, RegionGraph};

type Leap = WeightedEdge<i64, f64>;

#[derive(Debug, Clone, Default, PartialEq)]
struct RegionTransitions {
    enters: BTreeSet<i64>,
    exits: BTreeSet<i64>,
}

/// Transitions and leaps of every region of a [Graph].
///
/// The index is a snapshot: it needs to be rebuilt after the graph changes.
#[derive(Debug, Clone, Default)]
pub struct CrossRegionIndex {
    regions: BTreeMap<u32, RegionTransitions>,

    /// enter → (exit, weight)
    leaps_from: HashMap<i64, Vec<Leap>>,

    /// exit → (enter, weight)
    leaps_into: HashMap<i64, Vec<Leap>>,
}

impl CrossRegionIndex {
    /// Finds all transitions of the graph and computes leaps between them,
    /// running one region-restricted wave per enter.
    pub fn new(graph: &Graph) -> Self {
        let mut index = Self::default();

        for entry in graph.0.values() {
            let region = entry.node.region;
            let crosses = |e: &crate::Edge| {
                graph
                    .get_node(e.to)
                    .is_some_and(|other| other.region != region)
            };

            if entry.ingoing.iter().any(crosses) {
                index.region_mut(region).enters.insert(entry.node.id);
            }
            if entry.outgoing.iter().any(crosses) {
                index.region_mut(region).exits.insert(entry.node.id);
            }
        }

        let mut context = Context::new();
        for (&region, transitions) in &index.regions {
            let region_graph = RegionGraph::new(graph, region);

            for &enter in &transitions.enters {
                propagate_wave_plain(&region_graph, enter, &mut context, |_, _| true);

                for &exit in &transitions.exits {
                    if exit == enter || !context.has_distance(exit) {
                        continue;
                    }

                    let weight = context.distance(exit);
                    index
                        .leaps_from
                        .entry(enter)
                        .or_default()
                        .push(Leap::new(exit, weight));
                    index
                        .leaps_into
                        .entry(exit)
                        .or_default()
                        .push(Leap::new(enter, weight));
                }
            }

            log::trace!(
                "region {}: {} enters, {} exits",
                region,
                transitions.enters.len(),
                transitions.exits.len(),
            );
        }

        index
    }

    fn region_mut(&mut self, region: u32) -> &mut RegionTransitions {
        self.regions.entry(region).or_default()
    }

    /// Returns the number of regions with at least one transition.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn enters(&self, region: u32) -> impl Iterator<Item = i64> + '_ {
        self.regions
            .get(&region)
            .into_iter()
            .flat_map(|t| t.enters.iter().copied())
    }

    pub fn exits(&self, region: u32) -> impl Iterator<Item = i64> + '_ {
        self.regions
            .get(&region)
            .into_iter()
            .flat_map(|t| t.exits.iter().copied())
    }

    pub fn is_enter(&self, region: u32, node: i64) -> bool {
        self.regions
            .get(&region)
            .is_some_and(|t| t.enters.contains(&node))
    }

    pub fn is_exit(&self, region: u32, node: i64) -> bool {
        self.regions
            .get(&region)
            .is_some_and(|t| t.exits.contains(&node))
    }

    /// Returns the leaps starting at the provided enter.
    pub fn leaps_from(&self, enter: i64) -> &[WeightedEdge<i64, f64>] {
        self.leaps_from.get(&enter).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the weight of the leap between an enter and an exit of the same region.
    pub fn leap_weight(&self, enter: i64, exit: i64) -> Option<f64> {
        self.leaps_from(enter)
            .iter()
            .find(|l| l.target == exit)
            .map(|l| l.weight)
    }
}

/// Coarse graph of a single query: the start, the finish and the transitions of
/// a [CrossRegionIndex], joined by leaps and by real cross-region edges.
///
/// The start is connected to the exits of its region (and to the finish, if they share
/// a region) with region-local distances, computed when the query graph is built.
/// Likewise every enter of the finish region that can reach the finish gets an edge into it.
#[derive(Debug, Clone)]
pub struct LeapsGraph<'a> {
    graph: &'a Graph,
    index: &'a CrossRegionIndex,
    start: i64,
    finish: i64,
    extra_out: HashMap<i64, Vec<Leap>>,
    extra_in: HashMap<i64, Vec<Leap>>,
}

impl<'a> LeapsGraph<'a> {
    /// Prepares the query graph. Returns `None` if `start` or `finish` doesn't exist.
    pub fn new(graph: &'a Graph, index: &'a CrossRegionIndex, start: i64, finish: i64) -> Option<Self> {
        let start_region = graph.get_node(start)?.region;
        let finish_region = graph.get_node(finish)?.region;

        let mut g = Self {
            graph,
            index,
            start,
            finish,
            extra_out: HashMap::default(),
            extra_in: HashMap::default(),
        };

        let mut context = Context::new();

        propagate_wave_plain(&RegionGraph::new(graph, start_region), start, &mut context, |_, _| true);
        for exit in index.exits(start_region) {
            if exit != start && context.has_distance(exit) {
                g.add_edge(start, exit, context.distance(exit));
            }
        }
        if start_region == finish_region && start != finish && context.has_distance(finish) {
            g.add_edge(start, finish, context.distance(finish));
        }

        propagate_wave_plain(
            &Reversed(RegionGraph::new(graph, finish_region)),
            finish,
            &mut context,
            |_, _| true,
        );
        for enter in index.enters(finish_region) {
            if enter != finish && context.has_distance(enter) {
                g.add_edge(enter, finish, context.distance(enter));
            }
        }

        log::trace!(
            "leaps graph {} → {}: {} start edges, {} finish edges",
            start,
            finish,
            g.extra_out.get(&start).map_or(0, Vec::len),
            g.extra_in.get(&finish).map_or(0, Vec::len),
        );

        Some(g)
    }

    fn add_edge(&mut self, from: i64, to: i64, weight: f64) {
        self.extra_out.entry(from).or_default().push(Leap::new(to, weight));
        self.extra_in.entry(to).or_default().push(Leap::new(from, weight));
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn finish(&self) -> i64 {
        self.finish
    }

    fn region(&self, node: i64) -> Option<u32> {
        self.graph.get_node(node).map(|n| n.region)
    }
}

impl AStarGraph for LeapsGraph<'_> {
    type Vertex = i64;
    type Weight = f64;

    fn outgoing_edges(&self, vertex: i64, edges: &mut Vec<WeightedEdge<i64, f64>>) {
        let Some(region) = self.region(vertex) else {
            return;
        };

        if self.index.is_enter(region, vertex) {
            edges.extend_from_slice(self.index.leaps_from(vertex));
        }

        if self.index.is_exit(region, vertex) {
            edges.extend(self.graph.get_edges(vertex).iter().filter_map(|e| {
                let to = self.graph.get_node(e.to)?;
                (to.region != region).then(|| WeightedEdge::new(e.to, e.cost as f64))
            }));
        }

        if let Some(extra) = self.extra_out.get(&vertex) {
            edges.extend_from_slice(extra);
        }
    }

    fn ingoing_edges(&self, vertex: i64, edges: &mut Vec<WeightedEdge<i64, f64>>) {
        let Some(region) = self.region(vertex) else {
            return;
        };

        if self.index.is_exit(region, vertex) {
            if let Some(leaps) = self.index.leaps_into.get(&vertex) {
                edges.extend_from_slice(leaps);
            }
        }

        if self.index.is_enter(region, vertex) {
            edges.extend(self.graph.get_ingoing_edges(vertex).iter().filter_map(|e| {
                let from = self.graph.get_node(e.to)?;
                (from.region != region).then(|| WeightedEdge::new(e.to, e.cost as f64))
            }));
        }

        if let Some(extra) = self.extra_in.get(&vertex) {
            edges.extend_from_slice(extra);
        }
    }

    fn heuristic_cost_estimate(&self, from: i64, to: i64) -> f64 {
        self.graph.heuristic_cost_estimate(from, to)
    }
}

/// Finds a coarse route over the [LeapsGraph] of `start` and `finish`.
///
/// Leap weights are sums of edge costs and may drift from the heuristic
/// by a rounding error, so negative reduced weights are not reported.
pub fn find_leaps<C, Vis>(
    leaps_graph: &LeapsGraph<'_>,
    cancellable: &C,
    visitor: Vis,
) -> Result<RoutingResult<i64, f64>, AStarError>
where
    C: Cancellable + ?Sized,
    Vis: Visitor<i64>,
{
    let mut params = Params::new(leaps_graph, leaps_graph.start, leaps_graph.finish, cancellable)
        .with_visitor(visitor)
        .with_bad_reduced_weight(|_, _| false);
    find_path_bidirectional(&mut params)
}

/// Expands a coarse path found over a [LeapsGraph] into a path over graph nodes.
///
/// Consecutive vertices from different regions are joined by their real edge.
/// Consecutive vertices from the same region are joined by a local search, first
/// restricted to that region and then, if that fails, over the whole graph.
/// Local routes are memoised in `cache`, which may be shared between queries on
/// the same, unchanged graph.
pub fn process_leaps<C: Cancellable + ?Sized>(
    graph: &Graph,
    coarse_path: &[i64],
    cache: &mut RoutesCache<i64, f64>,
    cancellable: &C,
) -> Result<RoutingResult<i64, f64>, AStarError> {
    let Some(&first) = coarse_path.first() else {
        return Err(AStarError::NoPath);
    };

    let mut result = RoutingResult::new(vec![first], 0.0);

    for pair in coarse_path.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let (Some(from_node), Some(to_node)) = (graph.get_node(from), graph.get_node(to)) else {
            log::error!("coarse path references a missing node: {} → {}", from, to);
            return Err(AStarError::NoPath);
        };

        if from_node.region != to_node.region {
            let cost = graph.get_edge(from, to);
            if !cost.is_finite() {
                log::error!("coarse path uses a missing cross-region edge {} → {}", from, to);
                return Err(AStarError::NoPath);
            }
            result.path.push(to);
            result.distance += cost as f64;
            continue;
        }

        let local = cache.calc(from, to, |beg, end| {
            log::trace!("expanding leap {} → {} in region {}", beg, end, from_node.region);
            let region_graph = RegionGraph::new(graph, from_node.region);
            let mut params = Params::new(&region_graph, beg, end, cancellable);
            match find_path_bidirectional(&mut params) {
                Err(AStarError::NoPath) => {
                    let mut params = Params::new(graph, beg, end, cancellable);
                    find_path_bidirectional(&mut params)
                }
                r => r,
            }
        })?;

        result.path.extend_from_slice(&local.path[1..]);
        result.distance += local.distance;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astar::{find_path, NoopVisitor};
    use crate::{Edge, NeverCancelled, Node};

    /// Two regions, stacked west to east, each a 3x2 ladder:
    ///
    /// ```text
    /// region 1          region 2
    ///  1 - 2 - 3  ==>  4 - 5 - 6
    ///  |   |   |       |   |   |
    /// 11 -12 -13  <== 14 -15 -16
    /// ```
    ///
    /// All in-region edges are bidirectional, the `==>` and `<==` transitions are one-way.
    fn two_regions() -> Graph {
        let mut g = Graph::new();
        let mut add = |id: i64, lat: f32, lon: f32, region: u32| {
            g.set_node(Node { id, lat, lon, region });
        };
        for (i, id) in (1..=6).enumerate() {
            let region = if id <= 3 { 1 } else { 2 };
            add(id, 0.01, 0.01 * i as f32, region);
            add(id + 10, 0.00, 0.01 * i as f32, region);
        }

        let both = |g: &mut Graph, a: i64, b: i64| {
            g.set_edge(a, Edge { to: b, cost: 2.0 });
            g.set_edge(b, Edge { to: a, cost: 2.0 });
        };
        for (a, b) in [(1, 2), (2, 3), (11, 12), (12, 13), (1, 11), (2, 12), (3, 13)] {
            both(&mut g, a, b);
            both(&mut g, a + 3, b + 3);
        }
        g.set_edge(3, Edge { to: 4, cost: 2.0 });
        g.set_edge(14, Edge { to: 13, cost: 2.0 });
        g
    }

    #[test]
    fn transitions() {
        let g = two_regions();
        let index = CrossRegionIndex::new(&g);
        assert_eq!(index.region_count(), 2);
        assert_eq!(index.exits(1).collect::<Vec<_>>(), vec![3]);
        assert_eq!(index.enters(1).collect::<Vec<_>>(), vec![13]);
        assert_eq!(index.enters(2).collect::<Vec<_>>(), vec![4]);
        assert_eq!(index.exits(2).collect::<Vec<_>>(), vec![14]);
        assert_eq!(index.leap_weight(4, 14), Some(2.0));
        assert_eq!(index.leap_weight(13, 3), Some(2.0));
        assert_eq!(index.leap_weight(3, 13), None);
    }

    #[test]
    fn leaps_route_matches_direct_route() {
        let g = two_regions();
        let index = CrossRegionIndex::new(&g);

        let leaps_graph = LeapsGraph::new(&g, &index, 11, 16).unwrap();
        let coarse = find_leaps(&leaps_graph, &NeverCancelled, NoopVisitor).unwrap();
        assert_eq!(coarse.path, vec![11, 3, 4, 16]);

        let mut cache = RoutesCache::new();
        let full = process_leaps(&g, &coarse.path, &mut cache, &NeverCancelled).unwrap();
        assert_eq!(full.distance, coarse.distance);
        assert_eq!(g.path_cost(&full.path), Some(full.distance));
        assert_eq!(full.path.first(), Some(&11));
        assert_eq!(full.path.last(), Some(&16));

        let mut params = Params::new(&g, 11, 16, &NeverCancelled);
        let direct = find_path(&mut params).unwrap();
        assert_eq!(direct.distance, full.distance);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn same_region_uses_direct_edge() {
        let g = two_regions();
        let index = CrossRegionIndex::new(&g);
        let leaps_graph = LeapsGraph::new(&g, &index, 1, 13).unwrap();
        let coarse = find_leaps(&leaps_graph, &NeverCancelled, NoopVisitor).unwrap();
        assert_eq!(coarse.path, vec![1, 13]);
        assert_eq!(coarse.distance, 6.0);
    }

    #[test]
    fn unreachable_region() {
        let mut g = two_regions();
        g.delete_edge(3, 4);
        let index = CrossRegionIndex::new(&g);
        let leaps_graph = LeapsGraph::new(&g, &index, 1, 6).unwrap();
        assert_eq!(find_leaps(&leaps_graph, &NeverCancelled, NoopVisitor), Err(AStarError::NoPath));
    }

    #[test]
    fn missing_endpoint() {
        let g = two_regions();
        let index = CrossRegionIndex::new(&g);
        assert!(LeapsGraph::new(&g, &index, 1, 99).is_none());
    }

    #[test]
    fn process_leaps_rejects_empty_path() {
        let g = two_regions();
        let mut cache = RoutesCache::new();
        assert_eq!(
            process_leaps(&g, &[], &mut cache, &NeverCancelled),
            Err(AStarError::NoPath),
        );
    }

    #[test]
    fn cancelled_expansion_is_not_cached() {
        let g = two_regions();
        let flag = crate::CancelFlag::new();
        flag.cancel();
        let mut cache = RoutesCache::new();
        assert_eq!(
            process_leaps(&g, &[11, 3, 4, 16], &mut cache, &flag),
            Err(AStarError::Cancelled),
        );
        assert!(cache.is_empty());
    }
}
