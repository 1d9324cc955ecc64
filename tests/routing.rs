// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use routewave::astar::{find_path, find_path_bidirectional, AStarError, Params};
use routewave::graph_file::{self, FileFormat};
use routewave::router::{LeapMode, Options, RouterError};
use routewave::{CancelFlag, Deadline, Graph, NeverCancelled, Router};

/// Three regions along a road, west to east, with a bypass in the middle region:
///
/// ```text
///  region 1       region 2          region 3
///  1 -- 2 ====== 3 -- 4 -- 5 ====== 6 -- 7
///                 \       /
///                  8 --- 9
/// ```
///
/// Costs are left for the loader to fill in, except for the bypass.
const NETWORK: &str = "\
node 1 52.000 21.000 1
node 2 52.000 21.010 1
node 3 52.000 21.020 2
node 4 52.000 21.030 2
node 5 52.000 21.040 2
node 6 52.000 21.050 3
node 7 52.000 21.060 3
node 8 51.995 21.025 2
node 9 51.995 21.035 2

# main road, both ways
edge 1 2
edge 2 1
edge 2 3
edge 3 2
edge 3 4
edge 4 3
edge 4 5
edge 5 4
edge 5 6
edge 6 5
edge 6 7
edge 7 6

# bypass, one way
edge 3 8 1.0
edge 8 9 1.0
edge 9 5 1.0
";

fn network() -> Graph {
    let mut g = Graph::new();
    graph_file::add_from_buffer(&mut g, FileFormat::Unknown, NETWORK.as_bytes()).unwrap();
    g
}

#[test]
fn loaded_costs_are_crow_flies() {
    let g = network();
    assert_eq!(g.len(), 9);

    let (a, b) = (g.get_node(1).unwrap(), g.get_node(2).unwrap());
    let cost = g.get_edge(1, 2);
    let crow_flies = routewave::earth_distance(a.lat, a.lon, b.lat, b.lon);
    assert!((cost - crow_flies).abs() < 1e-3, "{} vs {}", cost, crow_flies);
    assert_eq!(g.get_edge(8, 9), 1.0);
}

#[test]
fn all_algorithms_agree() {
    let g = network();

    let uni = find_path(&mut Params::new(&g, 1, 7, &NeverCancelled)).unwrap();
    let bidi = find_path_bidirectional(&mut Params::new(&g, 1, 7, &NeverCancelled)).unwrap();
    assert_eq!(uni.path, vec![1, 2, 3, 4, 5, 6, 7]);
    assert!((uni.distance - bidi.distance).abs() < 1e-6);

    for mode in [LeapMode::NoLeaps, LeapMode::LeapsOnly, LeapMode::Auto] {
        let router = Router::new(&g, Options { mode, ..Options::default() });
        let r = router.route(1, 7, &NeverCancelled).unwrap();
        assert!((r.distance - uni.distance).abs() < 1e-4, "{:?}: {}", mode, r.distance);
        assert_eq!(r.path, uni.path, "{:?}", mode);
    }
}

#[test]
fn one_way_bypass() {
    let g = network();
    let router = Router::new(&g, Options::default());

    // The main road is shorter, so the bypass is only used when the road is gone
    let mut without_road = g.clone();
    without_road.delete_edge(3, 4);
    let router_without_road = Router::new(&without_road, Options::default());

    let r = router.route(2, 6, &NeverCancelled).unwrap();
    assert_eq!(r.path, vec![2, 3, 4, 5, 6]);

    let r = router_without_road.route(2, 6, &NeverCancelled).unwrap();
    assert_eq!(r.path, vec![2, 3, 8, 9, 5, 6]);

    // And never backwards
    let r = router_without_road.route(6, 2, &NeverCancelled).unwrap();
    assert_eq!(r.path, vec![6, 5, 4, 3, 2]);
}

#[test]
fn snapping() {
    let g = network();
    let router = Router::new(&g, Options::default());
    assert_eq!(router.snap(51.994, 21.036).map(|n| n.id), Some(9));
    assert_eq!(router.snap(52.001, 21.001).map(|n| n.id), Some(1));
}

#[test]
fn adjusting_after_a_deviation() {
    let g = network();
    let router = Router::new(&g, Options::default());
    let prev = router.route(1, 7, &NeverCancelled).unwrap();

    // Took the bypass by mistake
    let adjusted = router.adjust_route(8, &prev.path, &NeverCancelled).unwrap();
    assert_eq!(adjusted.path, vec![8, 9, 5, 6, 7]);

    let expected = 2.0 + (g.get_edge(5, 6) + g.get_edge(6, 7)) as f64;
    assert!((adjusted.distance - expected).abs() < 1e-6);

    let rerouted = router.route_or_adjust(8, 7, &prev.path, &NeverCancelled).unwrap();
    assert_eq!(rerouted.path, adjusted.path);
}

#[test]
fn disconnected_finish() {
    let mut g = network();
    g.delete_edge(5, 6);
    g.delete_edge(9, 5);
    g.delete_edge(4, 5);

    for mode in [LeapMode::NoLeaps, LeapMode::LeapsOnly] {
        let router = Router::new(&g, Options { mode, ..Options::default() });
        assert_eq!(
            router.route(1, 7, &NeverCancelled),
            Err(RouterError::Search(AStarError::NoPath)),
            "{:?}",
            mode,
        );
    }
}

#[test]
fn cancellation() {
    let g = network();
    let router = Router::new(&g, Options::default());

    let flag = CancelFlag::new();
    flag.cancel();
    assert_eq!(router.route(1, 7, &flag), Err(RouterError::Search(AStarError::Cancelled)));

    flag.reset();
    assert!(router.route(1, 7, &flag).is_ok());

    let expired = Deadline::after(std::time::Duration::ZERO);
    assert_eq!(router.route(1, 7, &expired), Err(RouterError::Search(AStarError::Cancelled)));
}
