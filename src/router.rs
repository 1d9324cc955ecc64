// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Routing queries over a geographic [Graph].

use std::sync::{Mutex, PoisonError};

use crate::astar::{self, AStarError, Params, RoutingResult, Visitor, WeightedEdge};
use crate::cache::RoutesCache;
use crate::leaps::{find_leaps, process_leaps, CrossRegionIndex, LeapsGraph};
use crate::{earth_distance, Cancellable, Graph, Node, NodeIndex};

/// Number of settled vertices between two progress reports.
pub const DEFAULT_VISIT_PERIOD: u32 = 40;

/// Default bound on the length of a detour accepted by [Router::adjust_route], in kilometers.
pub const DEFAULT_ADJUST_LIMIT: f64 = 5.0;

/// How a [Router] gets from one region to another.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeapMode {
    /// Search the whole graph directly.
    NoLeaps,

    /// Search over region transitions and expand the leaps afterwards.
    LeapsOnly,

    /// [LeapMode::NoLeaps] if start and finish share a region, [LeapMode::LeapsOnly] otherwise.
    #[default]
    Auto,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub mode: LeapMode,

    /// Longest detour [Router::adjust_route] explores before giving up.
    pub adjust_limit: f64,

    /// Every `visit_period`-th settled vertex is reported to the progress callback.
    pub visit_period: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mode: LeapMode::default(),
            adjust_limit: DEFAULT_ADJUST_LIMIT,
            visit_period: DEFAULT_VISIT_PERIOD,
        }
    }
}

/// Snapshot of a running search, passed to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// The node which was just settled.
    pub vertex: i64,

    /// The node the search is heading for: the finish for forward waves,
    /// the start for backward waves.
    pub counterpart: i64,

    /// Crow-flies distance between `vertex` and `counterpart`, in kilometers.
    pub remaining: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum RouterError {
    #[error("invalid node reference: {0}")]
    InvalidReference(i64),

    #[error("previous route has no edge {0} → {1}")]
    BrokenRoute(i64, i64),

    #[error(transparent)]
    Search(#[from] AStarError),
}

struct PeriodicVisitor<'a, F> {
    graph: &'a Graph,
    period: u32,
    count: u32,
    progress: F,
}

impl<F: FnMut(Progress)> Visitor<i64> for PeriodicVisitor<'_, F> {
    fn visit(&mut self, vertex: i64, counterpart: i64) {
        self.count = self.count.wrapping_add(1);
        if self.count % self.period != 0 {
            return;
        }

        if let (Some(a), Some(b)) = (self.graph.get_node(vertex), self.graph.get_node(counterpart)) {
            (self.progress)(Progress {
                vertex,
                counterpart,
                remaining: earth_distance(a.lat, a.lon, b.lat, b.lon),
            });
        }
    }
}

/// Router answers routing queries over an immutable [Graph].
///
/// Creating a router indexes the graph for snapping and, unless leaps are disabled,
/// precomputes region transitions. Routes between regions found in leaps mode are
/// expanded with local searches, which are memoised for the lifetime of the router.
#[derive(Debug)]
pub struct Router<'a> {
    graph: &'a Graph,
    options: Options,
    nodes: NodeIndex,
    cross_region: Option<CrossRegionIndex>,
    leaps_cache: Mutex<RoutesCache<i64, f64>>,
}

impl<'a> Router<'a> {
    pub fn new(graph: &'a Graph, options: Options) -> Self {
        let cross_region = match options.mode {
            LeapMode::NoLeaps => None,
            LeapMode::LeapsOnly | LeapMode::Auto => Some(CrossRegionIndex::new(graph)),
        };

        Self {
            graph,
            options,
            nodes: NodeIndex::new(graph),
            cross_region,
            leaps_cache: Mutex::new(RoutesCache::new()),
        }
    }

    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Finds the [Node] closest to the provided position.
    pub fn snap(&self, lat: f32, lon: f32) -> Option<Node> {
        self.nodes.find_nearest_node(lat, lon)
    }

    fn visitor<F: FnMut(Progress)>(&self, progress: F) -> PeriodicVisitor<'a, F> {
        PeriodicVisitor {
            graph: self.graph,
            period: self.options.visit_period.max(1),
            count: 0,
            progress,
        }
    }

    fn node(&self, id: i64) -> Result<Node, RouterError> {
        self.graph.get_node(id).ok_or(RouterError::InvalidReference(id))
    }

    /// Finds the shortest route between two nodes.
    pub fn route<C: Cancellable + ?Sized>(
        &self,
        start: i64,
        finish: i64,
        cancellable: &C,
    ) -> Result<RoutingResult<i64, f64>, RouterError> {
        self.route_with_progress(start, finish, cancellable, |_| {})
    }

    /// Finds the shortest route between two nodes, periodically reporting [Progress].
    pub fn route_with_progress<C, F>(
        &self,
        start: i64,
        finish: i64,
        cancellable: &C,
        progress: F,
    ) -> Result<RoutingResult<i64, f64>, RouterError>
    where
        C: Cancellable + ?Sized,
        F: FnMut(Progress),
    {
        let start_node = self.node(start)?;
        let finish_node = self.node(finish)?;

        let mode = match (self.options.mode, &self.cross_region) {
            (LeapMode::NoLeaps, _) | (_, None) => LeapMode::NoLeaps,
            (LeapMode::LeapsOnly, Some(_)) => LeapMode::LeapsOnly,
            (LeapMode::Auto, Some(_)) if start_node.region == finish_node.region => LeapMode::NoLeaps,
            (LeapMode::Auto, Some(_)) => LeapMode::LeapsOnly,
        };
        log::info!("routing {} → {} in {:?} mode", start, finish, mode);

        let visitor = self.visitor(progress);
        let route = match (mode, &self.cross_region) {
            (LeapMode::LeapsOnly, Some(index)) => {
                let leaps_graph = LeapsGraph::new(self.graph, index, start, finish)
                    .ok_or(RouterError::InvalidReference(start))?;
                let coarse = find_leaps(&leaps_graph, cancellable, visitor)?;

                let mut cache = self.leaps_cache.lock().unwrap_or_else(PoisonError::into_inner);
                process_leaps(self.graph, &coarse.path, &mut cache, cancellable)?
            }
            _ => {
                let mut params = Params::new(self.graph, start, finish, cancellable).with_visitor(visitor);
                astar::find_path_bidirectional(&mut params)?
            }
        };

        log::debug!(
            "route {} → {}: {} nodes, {:.3} km",
            start,
            finish,
            route.path.len(),
            route.distance,
        );
        Ok(route)
    }

    /// Finds the cheapest way from `start` back onto `prev_route` (a list of node ids),
    /// and returns the detour followed by the remainder of the previous route.
    ///
    /// Detours longer than [Options::adjust_limit] are not explored.
    pub fn adjust_route<C: Cancellable + ?Sized>(
        &self,
        start: i64,
        prev_route: &[i64],
        cancellable: &C,
    ) -> Result<RoutingResult<i64, f64>, RouterError> {
        self.node(start)?;
        let Some(&first) = prev_route.first() else {
            return Err(AStarError::NoPath.into());
        };

        let mut edges = Vec::with_capacity(prev_route.len());
        edges.push(WeightedEdge::new(first, 0.0));
        for pair in prev_route.windows(2) {
            let cost = self.graph.get_edge(pair[0], pair[1]);
            if !cost.is_finite() {
                return Err(RouterError::BrokenRoute(pair[0], pair[1]));
            }
            edges.push(WeightedEdge::new(pair[1], cost as f64));
        }

        let limit = self.options.adjust_limit;
        let route = astar::adjust_route(
            self.graph,
            start,
            &edges,
            cancellable,
            self.visitor(|_| {}),
            |length: f64| length <= limit,
        )?;
        Ok(route)
    }

    /// Tries to [adjust](Router::adjust_route) `prev_route` if it leads to `finish`,
    /// falling back to a full [route](Router::route) when the previous route
    /// can't be rejoined within the adjust limit.
    pub fn route_or_adjust<C: Cancellable + ?Sized>(
        &self,
        start: i64,
        finish: i64,
        prev_route: &[i64],
        cancellable: &C,
    ) -> Result<RoutingResult<i64, f64>, RouterError> {
        if prev_route.last() == Some(&finish) {
            match self.adjust_route(start, prev_route, cancellable) {
                Err(RouterError::Search(AStarError::NoPath)) | Err(RouterError::BrokenRoute(_, _)) => {
                    log::debug!("adjusting failed, rebuilding route {} → {}", start, finish);
                }
                r => return r,
            }
        }

        self.route(start, finish, cancellable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CancelFlag, Edge, NeverCancelled};

    /// A 5x5 grid, split into two regions by longitude, with bidirectional edges of cost 2.
    fn grid() -> Graph {
        let mut g = Graph::new();
        let id = |row: i64, col: i64| row * 10 + col + 1;

        for row in 0..5 {
            for col in 0..5 {
                g.set_node(Node {
                    id: id(row, col),
                    lat: 0.01 * row as f32,
                    lon: 0.01 * col as f32,
                    region: if col < 3 { 1 } else { 2 },
                });
            }
        }

        for row in 0..5 {
            for col in 0..5 {
                for (dr, dc) in [(0, 1), (1, 0)] {
                    let (r2, c2) = (row + dr, col + dc);
                    if r2 < 5 && c2 < 5 {
                        g.set_edge(id(row, col), Edge { to: id(r2, c2), cost: 2.0 });
                        g.set_edge(id(r2, c2), Edge { to: id(row, col), cost: 2.0 });
                    }
                }
            }
        }

        g
    }

    fn router(g: &Graph, mode: LeapMode) -> Router<'_> {
        Router::new(g, Options { mode, ..Options::default() })
    }

    #[test]
    fn modes_agree() {
        let g = grid();
        let expected = 16.0;
        for mode in [LeapMode::NoLeaps, LeapMode::LeapsOnly, LeapMode::Auto] {
            let r = router(&g, mode).route(1, 45, &NeverCancelled).unwrap();
            assert_eq!(r.distance, expected, "{:?}", mode);
            assert_eq!(r.path.first(), Some(&1));
            assert_eq!(r.path.last(), Some(&45));
            assert_eq!(g.path_cost(&r.path), Some(expected), "{:?}", mode);
        }
    }

    #[test]
    fn leaps_within_a_region() {
        let g = grid();
        let r = router(&g, LeapMode::LeapsOnly).route(1, 43, &NeverCancelled).unwrap();
        assert_eq!(r.distance, 12.0);
        assert_eq!(g.path_cost(&r.path), Some(12.0));
    }

    #[test]
    fn invalid_reference() {
        let g = grid();
        let r = router(&g, LeapMode::Auto);
        assert_eq!(r.route(1, 99, &NeverCancelled), Err(RouterError::InvalidReference(99)));
        assert_eq!(r.route(0, 1, &NeverCancelled), Err(RouterError::InvalidReference(0)));
    }

    #[test]
    fn cancelled() {
        let g = grid();
        let flag = CancelFlag::new();
        flag.cancel();
        for mode in [LeapMode::NoLeaps, LeapMode::LeapsOnly] {
            assert_eq!(
                router(&g, mode).route(1, 45, &flag),
                Err(RouterError::Search(AStarError::Cancelled)),
            );
        }
    }

    #[test]
    fn progress_is_reported_periodically() {
        let g = grid();
        let r = Router::new(
            &g,
            Options {
                mode: LeapMode::NoLeaps,
                visit_period: 2,
                ..Options::default()
            },
        );
        let mut reports = Vec::new();
        r.route_with_progress(1, 45, &NeverCancelled, |p| reports.push(p)).unwrap();
        assert!(!reports.is_empty());
        assert!(reports.iter().all(|p| p.remaining >= 0.0));
        assert!(reports.iter().all(|p| p.counterpart == 1 || p.counterpart == 45));
    }

    #[test]
    fn snap() {
        let g = grid();
        let r = router(&g, LeapMode::NoLeaps);
        assert_eq!(r.snap(0.021, 0.039).map(|n| n.id), Some(25));
    }

    #[test]
    fn adjust() {
        let g = grid();
        let r = router(&g, LeapMode::NoLeaps);
        let prev = [1, 2, 3, 4, 5];

        // One step south of node 3
        let adjusted = r.adjust_route(13, &prev, &NeverCancelled).unwrap();
        assert_eq!(adjusted.path, vec![13, 3, 4, 5]);
        assert_eq!(adjusted.distance, 6.0);
    }

    #[test]
    fn adjust_errors() {
        let g = grid();
        let r = router(&g, LeapMode::NoLeaps);
        assert_eq!(
            r.adjust_route(13, &[], &NeverCancelled),
            Err(RouterError::Search(AStarError::NoPath)),
        );
        assert_eq!(
            r.adjust_route(13, &[1, 3], &NeverCancelled),
            Err(RouterError::BrokenRoute(1, 3)),
        );
        assert_eq!(
            r.adjust_route(99, &[1, 2], &NeverCancelled),
            Err(RouterError::InvalidReference(99)),
        );
    }

    #[test]
    fn route_or_adjust_falls_back() {
        let g = grid();
        let r = Router::new(
            &g,
            Options {
                mode: LeapMode::NoLeaps,
                adjust_limit: 1.0,
                ..Options::default()
            },
        );
        let prev = [1, 2, 3, 4, 5];

        // Every detour costs at least 2, which is over the limit
        let route = r.route_or_adjust(13, 5, &prev, &NeverCancelled).unwrap();
        assert_eq!(route.distance, 6.0);
        assert_eq!(route.path.last(), Some(&5));
    }
}
