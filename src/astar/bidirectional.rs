// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::astar::wave::reconstruct_path;
use crate::astar::{
    AStarError, AStarGraph, LengthChecker, Params, RoutingResult, Visitor, WeightedEdge,
};
use crate::cancel::PeriodicPoll;
use crate::{max_weight, AStarWeight, Cancellable};

/// Number of settled vertices after which the bidirectional search switches
/// the direction it expands.
pub const QUEUE_SWITCH_PERIOD: u32 = 128;

#[derive(Debug, Clone, Copy)]
struct BiState<V, W> {
    vertex: V,

    /// Doubled reduced distance from the origin of the wave.
    distance: W,

    /// Real distance from the origin of the wave.
    real: W,

    /// Doubled potential of `vertex`.
    potential: W,
}

impl<V, W: PartialOrd> PartialEq for BiState<V, W> {
    fn eq(&self, other: &Self) -> bool {
        self.distance.eq(&other.distance)
    }
}

impl<V, W: PartialOrd> Eq for BiState<V, W> {}

impl<V, W: PartialOrd> PartialOrd for BiState<V, W> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V, W: PartialOrd> Ord for BiState<V, W> {
    fn cmp(&self, other: &Self) -> Ordering {
        // NOTE: Reversed, as Rust's BinaryHeap is a max-heap.
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
    }
}

#[derive(Debug, Clone, Copy)]
struct Label<W> {
    distance: W,
    real: W,
}

/// Everything needed to search from one of the two ends.
/// The search keeps two of those and swaps which one is "current".
struct StepContext<'g, G: AStarGraph> {
    forward: bool,
    start: G::Vertex,
    finish: G::Vertex,
    graph: &'g G,

    queue: BinaryHeap<BiState<G::Vertex, G::Weight>>,
    best: HashMap<G::Vertex, Label<G::Weight>>,
    parents: HashMap<G::Vertex, G::Vertex>,
    best_vertex: G::Vertex,
}

impl<'g, G: AStarGraph> StepContext<'g, G> {
    fn new(forward: bool, start: G::Vertex, finish: G::Vertex, graph: &'g G) -> Self {
        let origin = if forward { start } else { finish };
        let mut ctx = Self {
            forward,
            start,
            finish,
            graph,
            queue: BinaryHeap::default(),
            best: HashMap::default(),
            parents: HashMap::default(),
            best_vertex: origin,
        };

        ctx.best.insert(
            origin,
            Label {
                distance: G::Weight::ZERO,
                real: G::Weight::ZERO,
            },
        );
        ctx.queue.push(BiState {
            vertex: origin,
            distance: G::Weight::ZERO,
            real: G::Weight::ZERO,
            potential: ctx.potential(origin),
        });

        ctx
    }

    /// The vertex this wave is heading to.
    fn target(&self) -> G::Vertex {
        if self.forward {
            self.finish
        } else {
            self.start
        }
    }

    // With π_f(v) = h(v, finish) and π_r(v) = h(v, start), the potentials
    //     p_f(v) = ½·(π_f(v) - π_r(v)) + c_f
    //     p_r(v) = ½·(π_r(v) - π_f(v)) + c_r
    // satisfy p_f(v) + p_r(v) = const, which is what makes the
    // meet-in-the-middle stopping rule correct. Constants cancel out in reduced weights,
    // and all reduced distances are kept doubled, so the ½ is dropped altogether.
    fn potential(&self, v: G::Vertex) -> G::Weight {
        let pi_f = self.graph.heuristic_cost_estimate(v, self.finish);
        let pi_r = self.graph.heuristic_cost_estimate(v, self.start);
        if self.forward {
            pi_f - pi_r
        } else {
            pi_r - pi_f
        }
    }

    fn top_distance(&self) -> G::Weight {
        self.queue
            .peek()
            .and_then(|s| self.best.get(&s.vertex))
            .map(|l| l.distance)
            .unwrap_or(G::Weight::MAX)
    }

    fn is_stale(&self, state: &BiState<G::Vertex, G::Weight>) -> bool {
        self.best
            .get(&state.vertex)
            .is_some_and(|l| state.distance > l.distance)
    }

    fn improves(&self, vertex: G::Vertex, distance: G::Weight, epsilon: G::Weight) -> bool {
        self.best
            .get(&vertex)
            .is_none_or(|l| distance < l.distance - epsilon)
    }

    fn adjacent(
        &self,
        vertex: G::Vertex,
        edges: &mut Vec<WeightedEdge<G::Vertex, G::Weight>>,
    ) {
        edges.clear();
        if self.forward {
            self.graph.outgoing_edges(vertex, edges);
        } else {
            self.graph.ingoing_edges(vertex, edges);
        }
    }
}

/// Combines the paths of both waves (which meet on the edge `cur.best_vertex → nxt.best_vertex`,
/// in the direction of `cur`) into a start-to-finish route.
fn join_waves<G: AStarGraph>(
    cur: &StepContext<'_, G>,
    nxt: &StepContext<'_, G>,
    distance: G::Weight,
) -> RoutingResult<G::Vertex, G::Weight> {
    let mut path = reconstruct_path(&cur.parents, cur.best_vertex);
    let mut tail = reconstruct_path(&nxt.parents, nxt.best_vertex);
    tail.reverse();
    path.extend(tail);

    if !cur.forward {
        path.reverse();
    }

    RoutingResult::new(path, distance)
}

/// Like [find_path_bidirectional], but hands each found route to `emitter`.
///
/// If the emitter returns `true`, the search stops with `Ok(())`. Otherwise
/// the search continues looking for a different route. Routes passed to
/// the emitter are not checked against the final length; when both queues get
/// exhausted after something was found, the last candidate is emitted regardless
/// of the emitter's verdict.
pub fn find_path_bidirectional_ex<G, C, Vis, Len, E>(
    params: &mut Params<'_, G, C, Vis, Len>,
    mut emitter: E,
) -> Result<(), AStarError>
where
    G: AStarGraph,
    C: Cancellable + ?Sized,
    Vis: Visitor<G::Vertex>,
    Len: LengthChecker<G::Weight>,
    E: FnMut(RoutingResult<G::Vertex, G::Weight>) -> bool,
{
    let epsilon = params.epsilon();
    let epsilon2 = epsilon + epsilon;
    let (graph, start, finish) = (params.graph, params.start, params.finish);

    if start == finish {
        let mut poll = PeriodicPoll::new(params.cancellable);
        if poll.is_cancelled() {
            return Err(AStarError::Cancelled);
        }
        emitter(RoutingResult::new(vec![start], G::Weight::ZERO));
        return Ok(());
    }

    let mut forward = StepContext::new(true, start, finish, graph);
    let mut backward = StepContext::new(false, start, finish, graph);

    let mut found_any_path = false;
    let mut best_path_reduced_length = G::Weight::ZERO;
    let mut best_path_real_length = G::Weight::ZERO;

    // To use the same code for both directions, keep references to
    // the "current" and the "next" direction, and swap them to change
    // the end from which the search expands.
    let mut cur = &mut forward;
    let mut nxt = &mut backward;

    let mut adj: Vec<WeightedEdge<G::Vertex, G::Weight>> = Vec::default();
    let mut poll = PeriodicPoll::new(params.cancellable);
    let mut steps: u32 = 0;

    // It's not necessary to keep going once one of the queues is exhausted:
    // if no path was found by then, it never will be.
    while !cur.queue.is_empty() && !nxt.queue.is_empty() {
        steps = steps.wrapping_add(1);

        if poll.is_cancelled() {
            log::debug!("bidirectional {:?} -> {:?}: cancelled", start, finish);
            return Err(AStarError::Cancelled);
        }

        if steps % QUEUE_SWITCH_PERIOD == 0 {
            std::mem::swap(&mut cur, &mut nxt);
        }

        if found_any_path {
            // No path shorter than the sum of both tops can be found anymore.
            // Comparing reduced lengths is sound because the potentials are consistent;
            // real lengths of queue tops with equal reduced lengths may differ.
            let cur_top = cur.top_distance();
            let nxt_top = nxt.top_distance();
            if cur_top + nxt_top >= best_path_reduced_length - epsilon2 {
                if emitter(join_waves(cur, nxt, best_path_real_length)) {
                    log::debug!(
                        "bidirectional {:?} -> {:?}: {} steps, weight {:?}",
                        start,
                        finish,
                        steps,
                        best_path_real_length,
                    );
                    return Ok(());
                }
                found_any_path = false;
            }
        }

        let Some(state_v) = cur.queue.pop() else {
            break;
        };

        if cur.is_stale(&state_v) {
            continue;
        }

        let end_v = cur.target();
        params.visitor.visit(state_v.vertex, end_v);

        cur.adjacent(state_v.vertex, &mut adj);
        let p_v = state_v.potential;

        for edge in &adj {
            let w = edge.target;
            if w == state_v.vertex {
                continue;
            }

            let p_w = cur.potential(w);
            let reduced_weight = edge.weight + edge.weight + p_w - p_v;

            if reduced_weight < G::Weight::ZERO - epsilon2
                && (params.bad_reduced_weight)(reduced_weight, max_weight(p_w, p_v))
            {
                log::error!(
                    "invariant violated: v = {:?}, w = {:?}, doubled reduced weight = {:?}",
                    state_v.vertex,
                    w,
                    reduced_weight,
                );
                debug_assert!(false, "negative reduced weight in bidirectional search");
            }

            let state_w = BiState {
                vertex: w,
                distance: state_v.distance + max_weight(reduced_weight, G::Weight::ZERO),
                real: state_v.real + edge.weight,
                potential: p_w,
            };

            if !params.length_checker.check(state_w.real) {
                continue;
            }

            if !cur.improves(w, state_w.distance, epsilon2) {
                continue;
            }

            cur.best.insert(
                w,
                Label {
                    distance: state_w.distance,
                    real: state_w.real,
                },
            );
            cur.parents.insert(w, state_v.vertex);

            if let Some(&other) = nxt.best.get(&w) {
                // Reduced length of the route through v → w: both halves,
                // measured in their own reduced graphs.
                let cur_path_reduced_length = state_w.distance + other.distance;

                // No epsilon here: it's ok to overshoot slightly.
                if !found_any_path || best_path_reduced_length > cur_path_reduced_length {
                    best_path_reduced_length = cur_path_reduced_length;
                    best_path_real_length = state_w.real + other.real;
                    found_any_path = true;
                    cur.best_vertex = state_v.vertex;
                    nxt.best_vertex = w;
                }
            }

            if w != end_v {
                cur.queue.push(state_w);
            }
        }
    }

    if found_any_path {
        log::debug!(
            "bidirectional {:?} -> {:?}: queues exhausted after {} steps, weight {:?}",
            start,
            finish,
            steps,
            best_path_real_length,
        );
        let _ = emitter(join_waves(cur, nxt, best_path_real_length));
        return Ok(());
    }

    log::debug!(
        "bidirectional {:?} -> {:?}: no path after {} steps",
        start,
        finish,
        steps
    );
    Err(AStarError::NoPath)
}

/// Finds the shortest route from `params.start` to `params.finish` by growing two
/// A* waves (one forward from the start, one backward from the finish over
/// [ingoing edges](AStarGraph::ingoing_edges)) until they meet.
///
/// Outcomes match [find_path](crate::astar::find_path): real route weights
/// are checked by the [LengthChecker] both before queueing vertices and on the final route.
pub fn find_path_bidirectional<G, C, Vis, Len>(
    params: &mut Params<'_, G, C, Vis, Len>,
) -> Result<RoutingResult<G::Vertex, G::Weight>, AStarError>
where
    G: AStarGraph,
    C: Cancellable + ?Sized,
    Vis: Visitor<G::Vertex>,
    Len: LengthChecker<G::Weight>,
{
    let mut best = None;
    find_path_bidirectional_ex(params, |route| {
        // The first emitted route is the best one.
        best = Some(route);
        true
    })?;

    let route = best.ok_or(AStarError::NoPath)?;
    if !params.length_checker.check(route.distance) {
        return Err(AStarError::NoPath);
    }
    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astar::find_path;
    use crate::astar::test_graphs::{five_vertex_graph, SimpleGraph};
    use crate::{CancelFlag, NeverCancelled};

    #[test]
    fn finds_shortest_path() {
        let g = five_vertex_graph();
        let mut params = Params::new(&g, 0, 4, &NeverCancelled);
        let r = find_path_bidirectional(&mut params).unwrap();
        assert_eq!(r.path, vec![0, 1, 2, 3, 4]);
        assert_eq!(r.distance, 23.0);
    }

    #[test]
    fn length_check_rejects_route() {
        let g = five_vertex_graph();
        let mut params =
            Params::new(&g, 0, 4, &NeverCancelled).with_length_checker(|w: f64| w < 23.0);
        assert_eq!(find_path_bidirectional(&mut params), Err(AStarError::NoPath));
    }

    #[test]
    fn unreachable() {
        let g = five_vertex_graph();
        let mut params = Params::new(&g, 3, 1, &NeverCancelled);
        assert_eq!(find_path_bidirectional(&mut params), Err(AStarError::NoPath));
    }

    #[test]
    fn start_is_finish() {
        let g = five_vertex_graph();
        let mut params = Params::new(&g, 1, 1, &NeverCancelled);
        let r = find_path_bidirectional(&mut params).unwrap();
        assert_eq!(r.path, vec![1]);
        assert_eq!(r.distance, 0.0);
    }

    #[test]
    fn single_edge() {
        let g = SimpleGraph::from_edges(&[(7, 8, 2.5)]);
        let mut params = Params::new(&g, 7, 8, &NeverCancelled);
        let r = find_path_bidirectional(&mut params).unwrap();
        assert_eq!(r.path, vec![7, 8]);
        assert_eq!(r.distance, 2.5);
    }

    #[test]
    fn pre_cancelled() {
        let g = five_vertex_graph();
        let flag = CancelFlag::new();
        flag.cancel();
        let mut params = Params::new(&g, 0, 4, &flag);
        assert_eq!(
            find_path_bidirectional(&mut params),
            Err(AStarError::Cancelled)
        );
    }

    /// A long corridor with a parallel slow lane, long enough for several direction switches.
    fn ladder(n: u32) -> SimpleGraph {
        let mut g = SimpleGraph::default();
        for i in 0..n {
            g.add_edge(i, i + 1, 1.0);
            g.add_edge(i + 1, i, 1.0);
            g.add_edge(i, n + 1 + i, 0.5);
            g.add_edge(n + 1 + i, i, 0.5);
            g.add_edge(n + 1 + i, n + 2 + i, 1.5);
            g.set_coords(i, i as f64, 0.0);
            g.set_coords(n + 1 + i, i as f64, 0.5);
        }
        g.add_edge(2 * n + 1, n, 0.5);
        g.set_coords(n, n as f64, 0.0);
        g.set_coords(2 * n + 1, n as f64, 0.5);
        g
    }

    #[test]
    fn agrees_with_unidirectional_on_long_graph() {
        let g = ladder(1000);
        let mut uni = Params::new(&g, 0, 1000, &NeverCancelled);
        let mut bi = Params::new(&g, 0, 1000, &NeverCancelled);
        let a = find_path(&mut uni).unwrap();
        let b = find_path_bidirectional(&mut bi).unwrap();
        assert!((a.distance - 1000.0).abs() < 1e-6);
        assert!((a.distance - b.distance).abs() < 1e-6);
        assert_eq!(b.path.first(), Some(&0));
        assert_eq!(b.path.last(), Some(&1000));
    }

    #[test]
    fn path_is_consistent_with_distance() {
        let g = ladder(300);
        let mut params = Params::new(&g, 300, 0, &NeverCancelled);
        let r = find_path_bidirectional(&mut params).unwrap();
        assert_eq!(r.path, (0..=300).rev().collect::<Vec<_>>());
        assert!((r.distance - 300.0).abs() < 1e-6);
    }

    #[test]
    fn emitter_may_refuse_routes() {
        let g = five_vertex_graph();
        let mut params = Params::new(&g, 0, 4, &NeverCancelled);
        let mut emitted = Vec::new();
        find_path_bidirectional_ex(&mut params, |r| {
            emitted.push(r.distance);
            false
        })
        .unwrap();
        assert!(!emitted.is_empty());
        assert_eq!(emitted[0], 23.0);
    }

    #[test]
    fn integer_weights() {
        struct Grid;
        impl AStarGraph for Grid {
            type Vertex = (i32, i32);
            type Weight = i64;

            fn outgoing_edges(&self, (x, y): (i32, i32), e: &mut Vec<WeightedEdge<(i32, i32), i64>>) {
                for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                    let (nx, ny) = (x + dx, y + dy);
                    if (0..20).contains(&nx) && (0..20).contains(&ny) && !(nx == 10 && ny < 15) {
                        e.push(WeightedEdge::new((nx, ny), 1));
                    }
                }
            }

            fn ingoing_edges(&self, v: (i32, i32), e: &mut Vec<WeightedEdge<(i32, i32), i64>>) {
                self.outgoing_edges(v, e)
            }

            fn heuristic_cost_estimate(&self, a: (i32, i32), b: (i32, i32)) -> i64 {
                ((a.0 - b.0).abs() + (a.1 - b.1).abs()) as i64
            }
        }

        let mut uni = Params::new(&Grid, (0, 0), (19, 0), &NeverCancelled);
        let mut bi = Params::new(&Grid, (0, 0), (19, 0), &NeverCancelled);
        let a = find_path(&mut uni).unwrap();
        let b = find_path_bidirectional(&mut bi).unwrap();
        assert_eq!(a.distance, 19 + 2 * 15);
        assert_eq!(b.distance, a.distance);
        assert_eq!(b.path.len() as i64, b.distance + 1);
    }

    /// Edge 0 → 1 undercutting the euclidean distance between its ends by `by`.
    fn undercut_edge(by: f64) -> SimpleGraph {
        let mut g = SimpleGraph::from_edges(&[(0, 1, 1.0 - by)]);
        g.set_coords(0, 0.0, 0.0);
        g.set_coords(1, 1.0, 0.0);
        g
    }

    #[test]
    fn reduced_weight_within_epsilon_is_clamped() {
        let g = undercut_edge(5e-7);
        let mut params = Params::new(&g, 0, 1, &NeverCancelled);
        let r = find_path_bidirectional(&mut params).unwrap();
        assert_eq!(r.path, vec![0, 1]);
        assert_eq!(r.distance, 1.0 - 5e-7);
    }

    #[test]
    fn silenced_bad_reduced_weight_is_clamped() {
        let g = undercut_edge(0.5);
        let mut params = Params::new(&g, 0, 1, &NeverCancelled).with_bad_reduced_weight(|_, _| false);
        let r = find_path_bidirectional(&mut params).unwrap();
        assert_eq!(r.path, vec![0, 1]);
        // Real lengths are tracked apart from the reduced ones.
        assert_eq!(r.distance, 0.5);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "negative reduced weight")]
    fn bad_reduced_weight_is_reported() {
        let g = undercut_edge(0.5);
        let mut params = Params::new(&g, 0, 1, &NeverCancelled);
        let _ = find_path_bidirectional(&mut params);
    }
}
