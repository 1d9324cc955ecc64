// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::Node;

/// Mean radius of Earth, in kilometers.
/// Source: https://en.wikipedia.org/wiki/Earth_radius#Arithmetic_mean_radius
const EARTH_RADIUS: f64 = 6371.0088;

/// Great-circle distance in kilometers between two positions given in radians,
/// using the [haversine formula](https://en.wikipedia.org/wiki/Haversine_formula).
fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let sin_dlat_half = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon_half = ((lon2 - lon1) * 0.5).sin();
    let h = sin_dlat_half * sin_dlat_half + lat1.cos() * lat2.cos() * sin_dlon_half * sin_dlon_half;

    // Rounding may push h slightly above 1 for antipodal points
    2.0 * EARTH_RADIUS * h.sqrt().min(1.0).asin()
}

/// Calculates the great-circle distance between two lat-lon positions on Earth, in kilometers.
pub fn earth_distance(lat1: f32, lon1: f32, lat2: f32, lon2: f32) -> f32 {
    haversine(
        (lat1 as f64).to_radians(),
        (lon1 as f64).to_radians(),
        (lat2 as f64).to_radians(),
        (lon2 as f64).to_radians(),
    ) as f32
}

/// Crow-flies distance between two [Nodes](Node), in kilometers, at full precision.
pub fn node_distance(a: &Node, b: &Node) -> f64 {
    haversine(
        (a.lat as f64).to_radians(),
        (a.lon as f64).to_radians(),
        (b.lat as f64).to_radians(),
        (b.lon as f64).to_radians(),
    )
}

/// Relative amount taken off crow-flies distances before they are used as a heuristic.
/// Must exceed the relative rounding error of f32 (2^-24), as [Edge](crate::Edge) costs
/// priced with [earth_distance] may round to just below the f64 distance.
const HEURISTIC_SLACK: f64 = 1e-6;

/// Lower bound on the cost of any [Edge](crate::Edge) between two nodes,
/// used as the A* heuristic of [Graph](crate::Graph).
pub(crate) fn crow_flies_bound(a: &Node, b: &Node) -> f64 {
    node_distance(a, b) * (1.0 - HEURISTIC_SLACK)
}
