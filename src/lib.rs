// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Cancellable A* path finding over weighted directed graphs.
//!
//! The [astar] module is graph-agnostic: anything implementing [astar::AStarGraph]
//! can be searched with unidirectional or bidirectional A*, and a previously computed
//! route can be adjusted after a deviation. Every search polls a [Cancellable]
//! and may end with [astar::AStarError::Cancelled].
//!
//! On top of that, [Graph] provides a geographic road network split into regions,
//! and [Router] routes over it either directly, or by "leaping" between regions
//! through precomputed transitions and expanding the leaps afterwards.
//!
//! # Example
//!
//! ```no_run
//! let mut g = routewave::Graph::new();
//! routewave::graph_file::add_from_file(
//!     &mut g,
//!     routewave::graph_file::FileFormat::Unknown,
//!     "path/to/network.txt.gz",
//! ).expect("failed to load the graph");
//!
//! let router = routewave::Router::new(&g, routewave::router::Options::default());
//! let start = router.snap(43.7384, 7.4246).unwrap();
//! let finish = router.snap(43.7478, 7.4323).unwrap();
//! let route = router
//!     .route(start.id, finish.id, &routewave::NeverCancelled)
//!     .expect("failed to find route");
//!
//! println!("Route: {:?}", route.path);
//! ```

pub mod astar;
pub mod c;
pub mod cache;
mod cancel;
mod distance;
mod graph;
pub mod graph_file;
pub mod leaps;
pub mod router;
mod snap;
mod weight;

pub use cancel::{CancelFlag, Cancellable, Deadline, NeverCancelled};
pub use distance::{earth_distance, node_distance};
pub use graph::{Graph, RegionGraph};
pub use router::Router;
pub use snap::NodeIndex;
pub use weight::{max_weight, AStarWeight};

/// Represents an element of the [Graph].
///
/// Nodes with `id == 0` are disallowed, as zero IDs are used by the C bindings
/// to signify absence of nodes.
///
/// `region` partitions the graph; an edge between nodes of different regions
/// is a transition, which [leaps] are built from.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Node {
    pub id: i64,
    pub lat: f32,
    pub lon: f32,
    pub region: u32,
}

impl Node {
    pub const ZERO: Self = Self {
        id: 0,
        lat: 0.0,
        lon: 0.0,
        region: 0,
    };
}

/// Represents an outgoing (one-way) connection from a specific [Node].
///
/// `cost` must not be smaller than the crow-flies distance between the two nodes,
/// in kilometers, as that distance is the A* heuristic. Costs priced with
/// [earth_distance] are fine, even when rounded down to the nearest `f32`.
///
/// `to` must exist in the [Graph]: [Graph::set_edge] rejects edges to unknown nodes,
/// and [Graph::delete_node] removes the edges of a deleted node.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Edge {
    pub to: i64,
    pub cost: f32,
}
