// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::AStarWeight;

/// A route found by one of the searches: the visited vertices in source-to-target order
/// and the total (real, not reduced) weight of the route.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingResult<V, W> {
    pub path: Vec<V>,
    pub distance: W,
}

impl<V, W: AStarWeight> RoutingResult<V, W> {
    pub fn new(path: Vec<V>, distance: W) -> Self {
        Self { path, distance }
    }

    pub fn clear(&mut self) {
        self.path.clear();
        self.distance = W::ZERO;
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

impl<V, W: AStarWeight> Default for RoutingResult<V, W> {
    fn default() -> Self {
        Self {
            path: Vec::default(),
            distance: W::ZERO,
        }
    }
}
