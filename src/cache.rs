// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Memoisation of sub-route computations.

use std::collections::HashMap;
use std::hash::Hash;

use crate::astar::{AStarError, RoutingResult};

/// Table of computed routes, keyed by `(beg, end)`.
///
/// Only successful computations are stored, so a cancelled or failed
/// computation is retried the next time the same pair is requested.
#[derive(Debug, Clone)]
pub struct RoutesCache<V, W> {
    routes: HashMap<(V, V), RoutingResult<V, W>>,
}

impl<V: Copy + Eq + Hash, W: Clone> RoutesCache<V, W> {
    pub fn new() -> Self {
        Self {
            routes: HashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn clear(&mut self) {
        self.routes.clear();
    }

    pub fn get(&self, beg: V, end: V) -> Option<&RoutingResult<V, W>> {
        self.routes.get(&(beg, end))
    }

    /// Returns the route from `beg` to `end`, calling `compute` only if it isn't cached yet.
    pub fn calc<F>(&mut self, beg: V, end: V, compute: F) -> Result<&RoutingResult<V, W>, AStarError>
    where
        F: FnOnce(V, V) -> Result<RoutingResult<V, W>, AStarError>,
    {
        use std::collections::hash_map::Entry;

        match self.routes.entry((beg, end)) {
            Entry::Occupied(e) => {
                log::trace!("routes cache hit");
                Ok(e.into_mut())
            }
            Entry::Vacant(e) => {
                let route = compute(beg, end)?;
                Ok(e.insert(route))
            }
        }
    }
}

impl<V: Copy + Eq + Hash, W: Clone> Default for RoutesCache<V, W> {
    fn default() -> Self {
        Self::new()
    }
}
