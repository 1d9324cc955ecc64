// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Graph-agnostic shortest path search.
//!
//! Any type implementing [AStarGraph] can be searched with:
//! - [find_path] - unidirectional A*,
//! - [find_path_bidirectional] - two A* waves meeting in the middle,
//! - [adjust_route] - cheapest way back onto a previously computed route,
//! - [propagate_wave] - the underlying Dijkstra loop, customizable with callbacks.

mod adjust;
mod bidirectional;
mod error;
mod graph;
mod params;
mod result;
mod unidirectional;
mod wave;

#[cfg(test)]
pub(crate) mod test_graphs;

pub use adjust::adjust_route;
pub use bidirectional::{find_path_bidirectional, find_path_bidirectional_ex, QUEUE_SWITCH_PERIOD};
pub use error::AStarError;
pub use graph::{AStarGraph, Reversed, WeightedEdge};
pub use params::{AnyLength, LengthChecker, NoopVisitor, Params, Visitor};
pub use result::RoutingResult;
pub use unidirectional::find_path;
pub use wave::{propagate_wave, propagate_wave_plain, Context, State};
