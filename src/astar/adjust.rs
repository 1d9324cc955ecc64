// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use crate::astar::{
    propagate_wave, AStarError, AStarGraph, Context, LengthChecker, RoutingResult, Visitor,
    WeightedEdge,
};
use crate::cancel::PeriodicPoll;
use crate::{AStarWeight, Cancellable};

/// Finds the cheapest way from `start` back onto a previously computed route.
///
/// `prev_route` lists the edges of the old route in order; the target of the first
/// edge is the old start (its weight is ignored). Every vertex of the old route
/// is a candidate rejoin point, valued at the distance from `start` plus
/// the remaining weight of the old route from that vertex. The returned route
/// is the detour to the best rejoin vertex, followed by the rest of the old route.
///
/// As there's no single target, the wave explores everything `length_checker`
/// lets through (it is checked against the distance from `start`), which is why the
/// checker is mandatory here. The `visitor` receives each settled vertex with `start`
/// as the counterpart.
///
/// # Panics
///
/// Panics if `prev_route` is empty.
pub fn adjust_route<G, C, Vis, Len>(
    graph: &G,
    start: G::Vertex,
    prev_route: &[WeightedEdge<G::Vertex, G::Weight>],
    cancellable: &C,
    mut visitor: Vis,
    length_checker: Len,
) -> Result<RoutingResult<G::Vertex, G::Weight>, AStarError>
where
    G: AStarGraph,
    C: Cancellable + ?Sized,
    Vis: Visitor<G::Vertex>,
    Len: LengthChecker<G::Weight>,
{
    assert!(!prev_route.is_empty(), "adjust_route requires a non-empty previous route");

    // Index and remaining weight of the old route for each of its vertices.
    // Walking backwards leaves the first occurrence of repeated vertices in the map.
    let mut remaining_distances: BTreeMap<G::Vertex, (usize, G::Weight)> = BTreeMap::default();
    let mut remaining = G::Weight::ZERO;
    for (idx, edge) in prev_route.iter().enumerate().rev() {
        remaining_distances.insert(edge.target, (idx, remaining));
        remaining = remaining + edge.weight;
    }

    let mut context = Context::new();
    let mut poll = PeriodicPoll::new(cancellable);
    let mut cancelled = false;
    let mut best: Option<(G::Vertex, usize, G::Weight)> = None;

    propagate_wave(
        graph,
        start,
        &mut context,
        |vertex, distance| {
            if poll.is_cancelled() {
                cancelled = true;
                return false;
            }

            visitor.visit(vertex, start);

            if let Some(&(idx, remaining)) = remaining_distances.get(&vertex) {
                let full_distance = distance + remaining;
                if best.is_none_or(|(_, _, best_distance)| full_distance < best_distance) {
                    best = Some((vertex, idx, full_distance));
                }
            }

            // A better rejoin vertex may still be found further away.
            true
        },
        |_, edge| edge.weight,
        |state| length_checker.check(state.distance),
    );

    if cancelled {
        return Err(AStarError::Cancelled);
    }

    let Some((return_vertex, rejoin_idx, distance)) = best else {
        log::debug!("adjust {:?}: previous route not reached", start);
        return Err(AStarError::NoPath);
    };

    let mut path = context.reconstruct_path(return_vertex);
    path.extend(prev_route[rejoin_idx + 1..].iter().map(|e| e.target));

    log::debug!(
        "adjust {:?}: rejoined at {:?} (index {} of {}), weight {:?}",
        start,
        return_vertex,
        rejoin_idx,
        prev_route.len(),
        distance,
    );

    Ok(RoutingResult::new(path, distance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astar::test_graphs::SimpleGraph;
    use crate::astar::NoopVisitor;
    use crate::{CancelFlag, NeverCancelled};

    fn prev_route() -> Vec<WeightedEdge<u32, f64>> {
        vec![
            WeightedEdge::new(0, 0.0),
            WeightedEdge::new(1, 1.0),
            WeightedEdge::new(2, 1.0),
            WeightedEdge::new(3, 1.0),
            WeightedEdge::new(4, 1.0),
            WeightedEdge::new(5, 1.0),
        ]
    }

    fn graph(shortcut: Option<f64>) -> SimpleGraph {
        let mut g = SimpleGraph::from_edges(&[
            (0, 1, 1.0),
            (1, 2, 1.0),
            (2, 3, 1.0),
            (3, 4, 1.0),
            (4, 5, 1.0),
            (6, 0, 1.0),
            (6, 1, 1.0),
        ]);
        if let Some(w) = shortcut {
            g.add_edge(6, 2, w);
        }
        g
    }

    #[test]
    fn rejoins_at_best_vertex() {
        let g = graph(Some(1.0));
        let r = adjust_route(
            &g,
            6,
            &prev_route(),
            &NeverCancelled,
            NoopVisitor,
            |w: f64| w <= 1.0,
        )
        .unwrap();
        assert_eq!(r.path, vec![6, 2, 3, 4, 5]);
        assert_eq!(r.distance, 4.0);
    }

    #[test]
    fn without_shortcut_rejoins_earlier() {
        let g = graph(None);
        let r = adjust_route(
            &g,
            6,
            &prev_route(),
            &NeverCancelled,
            NoopVisitor,
            |w: f64| w <= 1.0,
        )
        .unwrap();
        // 6 → 1 rejoins with 1 + 4, 6 → 0 with 1 + 5
        assert_eq!(r.path, vec![6, 1, 2, 3, 4, 5]);
        assert_eq!(r.distance, 5.0);
    }

    #[test]
    fn disconnected_start() {
        let g = SimpleGraph::from_edges(&[
            (0, 1, 1.0),
            (1, 2, 1.0),
            (2, 3, 1.0),
            (3, 4, 1.0),
            (4, 5, 1.0),
        ]);
        let r = adjust_route(
            &g,
            6,
            &prev_route(),
            &NeverCancelled,
            NoopVisitor,
            |w: f64| w <= 1.0,
        );
        assert_eq!(r, Err(AStarError::NoPath));
    }

    #[test]
    fn too_expensive_shortcut() {
        let mut g = SimpleGraph::from_edges(&[
            (0, 1, 1.0),
            (1, 2, 1.0),
            (2, 3, 1.0),
            (3, 4, 1.0),
            (4, 5, 1.0),
        ]);
        g.add_edge(6, 2, 2.0);
        let r = adjust_route(
            &g,
            6,
            &prev_route(),
            &NeverCancelled,
            NoopVisitor,
            |w: f64| w <= 1.0,
        );
        assert_eq!(r, Err(AStarError::NoPath));
    }

    #[test]
    fn start_on_route() {
        let g = graph(Some(1.0));
        let r = adjust_route(
            &g,
            3,
            &prev_route(),
            &NeverCancelled,
            NoopVisitor,
            |w: f64| w <= 10.0,
        )
        .unwrap();
        assert_eq!(r.path, vec![3, 4, 5]);
        assert_eq!(r.distance, 2.0);
    }

    #[test]
    fn cancelled() {
        let g = graph(Some(1.0));
        let flag = CancelFlag::new();
        flag.cancel();
        let r = adjust_route(&g, 6, &prev_route(), &flag, NoopVisitor, |w: f64| w <= 1.0);
        assert_eq!(r, Err(AStarError::Cancelled));
    }

    #[test]
    fn visitor_counterpart_is_start() {
        let g = graph(Some(1.0));
        let mut seen = Vec::new();
        adjust_route(
            &g,
            6,
            &prev_route(),
            &NeverCancelled,
            |v: u32, s: u32| seen.push((v, s)),
            |w: f64| w <= 1.0,
        )
        .unwrap();
        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|&(_, s)| s == 6));
    }

    #[test]
    #[should_panic]
    fn empty_previous_route() {
        let g = graph(Some(1.0));
        let _ = adjust_route(&g, 6, &[], &NeverCancelled, NoopVisitor, |w: f64| w <= 1.0);
    }
}
