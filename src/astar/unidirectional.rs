// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::astar::{
    propagate_wave, AStarError, AStarGraph, Context, LengthChecker, Params, RoutingResult,
    Visitor,
};
use crate::cancel::PeriodicPoll;
use crate::{max_weight, AStarWeight, Cancellable};

// A* is equivalent to Dijkstra's algorithm run on a reweighted graph.
// If an edge (v, w) has length l(v, w), its reduced cost is
// l_r(v, w) = l(v, w) + pi(w) - pi(v), where pi() is any function which
// ensures l_r(v, w) >= 0 for every edge. Here pi() is the heuristic estimate
// of the remaining cost to the finish.
//
// See David Eppstein's "Reweighting a graph for faster shortest paths",
// https://11011110.github.io/blog/2008/04/03/reweighting-graph-for.html.

/// Uses the [A* algorithm](https://en.wikipedia.org/wiki/A*_search_algorithm)
/// to find the shortest route from `params.start` to `params.finish`.
///
/// The search is a [propagate_wave] over reduced edge weights. States whose real
/// length is rejected by the [LengthChecker] are never queued, and the final
/// route weight is checked once more, which may turn a found route into
/// [AStarError::NoPath].
///
/// The [Cancellable] is polled on the first settled vertex, and then on every
/// 128th one.
pub fn find_path<G, C, Vis, Len>(
    params: &mut Params<'_, G, C, Vis, Len>,
) -> Result<RoutingResult<G::Vertex, G::Weight>, AStarError>
where
    G: AStarGraph,
    C: Cancellable + ?Sized,
    Vis: Visitor<G::Vertex>,
    Len: LengthChecker<G::Weight>,
{
    let epsilon = params.epsilon();
    let Params {
        graph,
        start,
        finish,
        cancellable,
        visitor,
        length_checker,
        bad_reduced_weight,
    } = params;
    let (graph, start, finish, bad_reduced_weight) = (*graph, *start, *finish, *bad_reduced_weight);

    let mut context = Context::new();
    let mut poll = PeriodicPoll::new(*cancellable);
    let mut outcome = Err(AStarError::NoPath);
    let mut settled: usize = 0;

    let heuristic_diff = |from: G::Vertex, to: G::Vertex| {
        graph.heuristic_cost_estimate(from, finish) - graph.heuristic_cost_estimate(to, finish)
    };
    let reduced_to_full = |from: G::Vertex, to: G::Vertex, reduced: G::Weight| {
        reduced + heuristic_diff(from, to)
    };

    propagate_wave(
        graph,
        start,
        &mut context,
        |vertex, _| {
            if poll.is_cancelled() {
                outcome = Err(AStarError::Cancelled);
                return false;
            }

            settled += 1;
            visitor.visit(vertex, finish);

            if vertex == finish {
                outcome = Ok(());
                return false;
            }

            true
        },
        |from, edge| {
            let h_from = graph.heuristic_cost_estimate(from, finish);
            let h_to = graph.heuristic_cost_estimate(edge.target, finish);
            let reduced = edge.weight - (h_from - h_to);
            if reduced < G::Weight::ZERO - epsilon
                && bad_reduced_weight(reduced, max_weight(h_from, h_to))
            {
                log::error!(
                    "invariant violated: reduced weight of {:?} -> {:?} is {:?}",
                    from,
                    edge.target,
                    reduced,
                );
                debug_assert!(false, "negative reduced weight in a* search");
            }
            max_weight(reduced, G::Weight::ZERO)
        },
        |state| length_checker.check(reduced_to_full(start, state.vertex, state.distance)),
    );

    log::debug!(
        "a* {:?} -> {:?}: settled {} vertices, outcome {:?}",
        start,
        finish,
        settled,
        outcome,
    );
    outcome?;

    let distance = reduced_to_full(start, finish, context.distance(finish));
    if !length_checker.check(distance) {
        return Err(AStarError::NoPath);
    }

    Ok(RoutingResult::new(context.reconstruct_path(finish), distance))
}
