// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Unsuccessful outcomes of [find_path](crate::astar::find_path),
/// [find_path_bidirectional](crate::astar::find_path_bidirectional) and
/// [adjust_route](crate::astar::adjust_route).
///
/// Neither is exceptional: both are ordinary results of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum AStarError {
    /// The search space was exhausted without reaching the goal,
    /// or the only routes found were rejected by the length checker.
    #[error("no path")]
    NoPath,

    /// The [Cancellable](crate::Cancellable) passed to the search was observed as cancelled.
    /// Any partial state of the search is discarded.
    #[error("search cancelled")]
    Cancelled,
}
