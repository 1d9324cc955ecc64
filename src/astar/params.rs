// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::astar::AStarGraph;
use crate::{AStarWeight, Cancellable, NeverCancelled};

/// Observer of settled vertices.
///
/// Called once per settled vertex with the vertex and its counterpart: the finish for forward waves,
/// the start for backward waves and for [adjust_route](crate::astar::adjust_route).
/// Visitors are meant for progress reporting and must not influence the search.
pub trait Visitor<V> {
    fn visit(&mut self, vertex: V, counterpart: V);
}

impl<V, F: FnMut(V, V)> Visitor<V> for F {
    #[inline]
    fn visit(&mut self, vertex: V, counterpart: V) {
        self(vertex, counterpart)
    }
}

/// [Visitor] which does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopVisitor;

impl<V> Visitor<V> for NoopVisitor {
    #[inline]
    fn visit(&mut self, _: V, _: V) {}
}

/// Decides whether a (partial) route of a given real length may be explored further.
///
/// Checked before a vertex is admitted to a search queue, and once more on
/// the final route weight.
pub trait LengthChecker<W> {
    fn check(&self, length: W) -> bool;
}

impl<W, F: Fn(W) -> bool> LengthChecker<W> for F {
    #[inline]
    fn check(&self, length: W) -> bool {
        self(length)
    }
}

/// [LengthChecker] accepting every length.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnyLength;

impl<W> LengthChecker<W> for AnyLength {
    #[inline]
    fn check(&self, _: W) -> bool {
        true
    }
}

fn always_bad<W>(_: W, _: W) -> bool {
    true
}

/// Inputs of [find_path](crate::astar::find_path) and
/// [find_path_bidirectional](crate::astar::find_path_bidirectional).
///
/// ```
/// use routewave::astar::{find_path, Params};
/// # use routewave::astar::{AStarGraph, WeightedEdge};
/// # struct Line;
/// # impl AStarGraph for Line {
/// #     type Vertex = u32;
/// #     type Weight = f64;
/// #     fn outgoing_edges(&self, v: u32, e: &mut Vec<WeightedEdge<u32, f64>>) {
/// #         if v < 10 { e.push(WeightedEdge::new(v + 1, 1.0)) }
/// #     }
/// #     fn ingoing_edges(&self, v: u32, e: &mut Vec<WeightedEdge<u32, f64>>) {
/// #         if v > 0 { e.push(WeightedEdge::new(v - 1, 1.0)) }
/// #     }
/// #     fn heuristic_cost_estimate(&self, _: u32, _: u32) -> f64 { 0.0 }
/// # }
///
/// let mut params = Params::new(&Line, 0, 3, &routewave::NeverCancelled)
///     .with_length_checker(|length: f64| length <= 5.0);
/// let route = find_path(&mut params).unwrap();
/// assert_eq!(route.path, vec![0, 1, 2, 3]);
/// ```
pub struct Params<'a, G, C = NeverCancelled, Vis = NoopVisitor, Len = AnyLength>
where
    G: AStarGraph,
    C: Cancellable + ?Sized,
{
    pub(crate) graph: &'a G,
    pub(crate) start: G::Vertex,
    pub(crate) finish: G::Vertex,
    pub(crate) cancellable: &'a C,
    pub(crate) visitor: Vis,
    pub(crate) length_checker: Len,
    pub(crate) bad_reduced_weight: fn(G::Weight, G::Weight) -> bool,
}

impl<'a, G, C> Params<'a, G, C>
where
    G: AStarGraph,
    C: Cancellable + ?Sized,
{
    pub fn new(graph: &'a G, start: G::Vertex, finish: G::Vertex, cancellable: &'a C) -> Self {
        Self {
            graph,
            start,
            finish,
            cancellable,
            visitor: NoopVisitor,
            length_checker: AnyLength,
            bad_reduced_weight: always_bad::<G::Weight>,
        }
    }
}

impl<'a, G, C, Vis, Len> Params<'a, G, C, Vis, Len>
where
    G: AStarGraph,
    C: Cancellable + ?Sized,
    Vis: Visitor<G::Vertex>,
    Len: LengthChecker<G::Weight>,
{
    /// Replaces the [Visitor] called for every settled vertex.
    pub fn with_visitor<V2: Visitor<G::Vertex>>(
        self,
        visitor: V2,
    ) -> Params<'a, G, C, V2, Len> {
        Params {
            graph: self.graph,
            start: self.start,
            finish: self.finish,
            cancellable: self.cancellable,
            visitor,
            length_checker: self.length_checker,
            bad_reduced_weight: self.bad_reduced_weight,
        }
    }

    /// Replaces the [LengthChecker] used to prune the search.
    pub fn with_length_checker<L2: LengthChecker<G::Weight>>(
        self,
        length_checker: L2,
    ) -> Params<'a, G, C, Vis, L2> {
        Params {
            graph: self.graph,
            start: self.start,
            finish: self.finish,
            cancellable: self.cancellable,
            visitor: self.visitor,
            length_checker,
            bad_reduced_weight: self.bad_reduced_weight,
        }
    }

    /// Sets the predicate deciding whether a reduced edge weight below `-epsilon`
    /// is reported as an invariant violation (logged, and a panic in debug builds).
    /// It receives the reduced weight and the larger of the two vertex potentials.
    ///
    /// Graphs whose heuristic is knowingly inconsistent (e.g. estimated transition weights)
    /// can silence the report; the offending weight is clamped to zero either way.
    pub fn with_bad_reduced_weight(mut self, predicate: fn(G::Weight, G::Weight) -> bool) -> Self {
        self.bad_reduced_weight = predicate;
        self
    }

    pub fn graph(&self) -> &'a G {
        self.graph
    }

    pub fn start(&self) -> G::Vertex {
        self.start
    }

    pub fn finish(&self) -> G::Vertex {
        self.finish
    }

    pub(crate) fn epsilon(&self) -> G::Weight {
        let eps = self.graph.weight_epsilon();
        debug_assert!(eps >= G::Weight::ZERO);
        eps
    }
}
