// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::*;

use std::collections::btree_map;
use std::ffi::{c_char, CStr, OsStr};
use std::mem::{forget, ManuallyDrop};
use std::os::unix::ffi::OsStrExt;
use std::ptr::{null, null_mut};
use std::slice;

use crate::astar::{AStarError, Params, RoutingResult};
use crate::router::{LeapMode, Options, RouterError};

/// Opaque iterator over the [Nodes](Node) of a [Graph].
pub struct CNodeIterator<'a>(btree_map::Values<'a, i64, graph::NodeEntry>);

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_new() -> *mut Graph {
    Box::into_raw(Box::<Graph>::default())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_delete(ptr: *mut Graph) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr));
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_get_nodes(
    graph: *const Graph,
    iterator_ptr: *mut *mut CNodeIterator<'_>,
) -> usize {
    if let Some(graph) = graph.as_ref() {
        if !iterator_ptr.is_null() {
            *iterator_ptr = Box::into_raw(Box::new(CNodeIterator(graph.0.values())));
        }

        graph.len()
    } else {
        if !iterator_ptr.is_null() {
            *iterator_ptr = null_mut();
        }

        0
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_iterator_next(iterator: *mut CNodeIterator<'_>) -> Node {
    iterator
        .as_mut()
        .and_then(|it| it.0.next())
        .map(|entry| entry.node)
        .unwrap_or(Node::ZERO)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_iterator_delete(iterator: *mut CNodeIterator<'_>) {
    if !iterator.is_null() {
        drop(Box::from_raw(iterator));
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_get_node(graph: *const Graph, id: i64) -> Node {
    graph
        .as_ref()
        .and_then(|g| g.get_node(id))
        .unwrap_or(Node::ZERO)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_set_node(graph: *mut Graph, node: Node) -> bool {
    graph.as_mut().is_some_and(|g| g.set_node(node))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_delete_node(graph: *mut Graph, id: i64) -> bool {
    graph.as_mut().is_some_and(|g| g.delete_node(id))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_find_nearest_node(
    graph: *const Graph,
    lat: f32,
    lon: f32,
) -> Node {
    graph
        .as_ref()
        .and_then(|g| g.find_nearest_node(lat, lon))
        .unwrap_or(Node::ZERO)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_get_edges(
    graph: *const Graph,
    from_id: i64,
    out_edges: *mut *const Edge,
) -> usize {
    let edges = graph.as_ref().map(|g| g.get_edges(from_id)).unwrap_or_default();
    if !out_edges.is_null() {
        *out_edges = if graph.is_null() {
            null()
        } else {
            edges.as_ptr()
        };
    }
    edges.len()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_get_edge(
    graph: *const Graph,
    from_id: i64,
    to_id: i64,
) -> f32 {
    graph
        .as_ref()
        .map(|g| g.get_edge(from_id, to_id))
        .unwrap_or(f32::INFINITY)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_set_edge(
    graph: *mut Graph,
    from_id: i64,
    edge: Edge,
) -> bool {
    graph.as_mut().is_some_and(|g| g.set_edge(from_id, edge))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_delete_edge(
    graph: *mut Graph,
    from_id: i64,
    to_id: i64,
) -> bool {
    graph.as_mut().is_some_and(|g| g.delete_edge(from_id, to_id))
}

#[derive(Copy, Clone)]
#[repr(C)]
pub enum CFileFormat {
    Unknown = 0,
    Text = 1,
    TextGz = 2,
    TextBz2 = 3,
}

impl From<CFileFormat> for graph_file::FileFormat {
    fn from(value: CFileFormat) -> Self {
        match value {
            CFileFormat::Unknown => graph_file::FileFormat::Unknown,
            CFileFormat::Text => graph_file::FileFormat::Text,
            CFileFormat::TextGz => graph_file::FileFormat::TextGz,
            CFileFormat::TextBz2 => graph_file::FileFormat::TextBz2,
        }
    }
}

/// Loads a graph file into the graph. Errors are logged, and reported by returning `false`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_add_from_file(
    graph: *mut Graph,
    format: CFileFormat,
    c_filename: *const c_char,
) -> bool {
    let Some(graph) = graph.as_mut() else {
        return false;
    };
    if c_filename.is_null() {
        return false;
    }

    let filename = OsStr::from_bytes(CStr::from_ptr(c_filename).to_bytes());
    match graph_file::add_from_file(graph, format.into(), filename) {
        Ok(()) => true,
        Err(e) => {
            log::error!("{}: {}", filename.to_string_lossy(), e);
            false
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_add_from_memory(
    graph: *mut Graph,
    format: CFileFormat,
    content: *const u8,
    content_len: usize,
) -> bool {
    let Some(graph) = graph.as_mut() else {
        return false;
    };
    if content.is_null() {
        return false;
    }

    let content = slice::from_raw_parts(content, content_len);
    match graph_file::add_from_buffer(graph, format.into(), content) {
        Ok(()) => true,
        Err(e) => {
            log::error!("graph from memory: {}", e);
            false
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub enum CRouteResultType {
    Ok = 0,
    InvalidReference = 1,
    NoPath = 2,
    Cancelled = 3,
}

#[repr(C)]
pub struct CRouteResultOk {
    pub nodes: *mut i64,
    pub len: u32,
    pub capacity: u32,
    pub distance: f64,
}

#[derive(Clone, Copy)]
#[repr(C)]
pub struct CRouteResultInvalidReference {
    pub invalid_node_id: i64,
}

#[repr(C)]
pub union CRouteResultInner {
    pub ok: ManuallyDrop<CRouteResultOk>,
    pub invalid_reference: CRouteResultInvalidReference,
    pub empty: (),
}

#[repr(C)]
pub struct CRouteResult {
    pub inner: CRouteResultInner,
    pub type_: CRouteResultType,
}

impl CRouteResult {
    fn ok(route: RoutingResult<i64, f64>) -> Self {
        let mut nodes = route.path;
        let ptr = nodes.as_mut_ptr();
        let len = nodes.len().try_into().expect("route length overflow");
        let capacity = nodes
            .capacity()
            .try_into()
            .expect("route capacity overflow");
        forget(nodes);

        CRouteResult {
            inner: CRouteResultInner {
                ok: ManuallyDrop::new(CRouteResultOk {
                    nodes: ptr,
                    len,
                    capacity,
                    distance: route.distance,
                }),
            },
            type_: CRouteResultType::Ok,
        }
    }

    fn invalid_reference(invalid_node_id: i64) -> Self {
        CRouteResult {
            inner: CRouteResultInner {
                invalid_reference: CRouteResultInvalidReference { invalid_node_id },
            },
            type_: CRouteResultType::InvalidReference,
        }
    }

    fn empty(type_: CRouteResultType) -> Self {
        CRouteResult {
            inner: CRouteResultInner { empty: () },
            type_,
        }
    }
}

impl From<Result<RoutingResult<i64, f64>, RouterError>> for CRouteResult {
    fn from(value: Result<RoutingResult<i64, f64>, RouterError>) -> Self {
        match value {
            Ok(route) => CRouteResult::ok(route),
            Err(RouterError::InvalidReference(id)) => CRouteResult::invalid_reference(id),
            Err(RouterError::BrokenRoute(_, to)) => CRouteResult::invalid_reference(to),
            Err(RouterError::Search(AStarError::NoPath)) => CRouteResult::empty(CRouteResultType::NoPath),
            Err(RouterError::Search(AStarError::Cancelled)) => {
                CRouteResult::empty(CRouteResultType::Cancelled)
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub enum CAlgorithm {
    AStar = 0,
    Bidirectional = 1,
}

unsafe fn as_cancellable<'a>(flag: *const CancelFlag) -> &'a dyn Cancellable {
    match flag.as_ref() {
        Some(flag) => flag,
        None => &NeverCancelled,
    }
}

/// Finds the shortest route over the whole graph. `cancel_flag` may be NULL.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_graph_find_route(
    graph: *const Graph,
    from_id: i64,
    to_id: i64,
    algorithm: CAlgorithm,
    cancel_flag: *const CancelFlag,
) -> CRouteResult {
    let Some(graph) = graph.as_ref() else {
        return CRouteResult::invalid_reference(0);
    };

    for id in [from_id, to_id] {
        if graph.get_node(id).is_none() {
            return CRouteResult::invalid_reference(id);
        }
    }

    let mut params = Params::new(graph, from_id, to_id, as_cancellable(cancel_flag));
    let result = match algorithm {
        CAlgorithm::AStar => astar::find_path(&mut params),
        CAlgorithm::Bidirectional => astar::find_path_bidirectional(&mut params),
    };
    result.map_err(RouterError::from).into()
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub enum CLeapMode {
    NoLeaps = 0,
    LeapsOnly = 1,
    Auto = 2,
}

impl From<CLeapMode> for LeapMode {
    fn from(value: CLeapMode) -> Self {
        match value {
            CLeapMode::NoLeaps => LeapMode::NoLeaps,
            CLeapMode::LeapsOnly => LeapMode::LeapsOnly,
            CLeapMode::Auto => LeapMode::Auto,
        }
    }
}

/// Creates a [Router] over the graph. The graph must outlive the router
/// and must not be modified while the router exists.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_router_new(
    graph: *const Graph,
    mode: CLeapMode,
    adjust_limit: f64,
) -> *mut Router<'static> {
    let Some(graph) = graph.as_ref() else {
        return null_mut();
    };

    let options = Options {
        mode: mode.into(),
        adjust_limit,
        ..Options::default()
    };
    Box::into_raw(Box::new(Router::new(graph, options)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_router_delete(ptr: *mut Router<'static>) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr));
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_router_find_nearest_node(
    router: *const Router<'static>,
    lat: f32,
    lon: f32,
) -> Node {
    router
        .as_ref()
        .and_then(|r| r.snap(lat, lon))
        .unwrap_or(Node::ZERO)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_router_find_route(
    router: *const Router<'static>,
    from_id: i64,
    to_id: i64,
    cancel_flag: *const CancelFlag,
) -> CRouteResult {
    match router.as_ref() {
        Some(router) => router.route(from_id, to_id, as_cancellable(cancel_flag)).into(),
        None => CRouteResult::invalid_reference(0),
    }
}

/// Adjusts a previous route (`prev_nodes`, `prev_len` node ids) after a deviation to `start_id`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_router_adjust_route(
    router: *const Router<'static>,
    start_id: i64,
    prev_nodes: *const i64,
    prev_len: usize,
    cancel_flag: *const CancelFlag,
) -> CRouteResult {
    let Some(router) = router.as_ref() else {
        return CRouteResult::invalid_reference(0);
    };

    let prev_route: &[i64] = if prev_nodes.is_null() {
        &[]
    } else {
        slice::from_raw_parts(prev_nodes, prev_len)
    };
    router
        .adjust_route(start_id, prev_route, as_cancellable(cancel_flag))
        .into()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_route_result_delete(result: CRouteResult) {
    match result.type_ {
        CRouteResultType::Ok => {
            let ok = ManuallyDrop::into_inner(result.inner.ok);
            if !ok.nodes.is_null() {
                drop(Vec::from_raw_parts(
                    ok.nodes,
                    ok.len as usize,
                    ok.capacity as usize,
                ));
            }
        }

        CRouteResultType::InvalidReference | CRouteResultType::NoPath | CRouteResultType::Cancelled => {
            // Nothing to free
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_cancel_flag_new() -> *mut CancelFlag {
    Box::into_raw(Box::new(CancelFlag::new()))
}

/// Raises the flag. Safe to call from any thread while a search polls the flag.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_cancel_flag_cancel(flag: *const CancelFlag) {
    if let Some(flag) = flag.as_ref() {
        flag.cancel();
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_cancel_flag_reset(flag: *const CancelFlag) {
    if let Some(flag) = flag.as_ref() {
        flag.reset();
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_cancel_flag_is_cancelled(flag: *const CancelFlag) -> bool {
    flag.as_ref().is_some_and(|f| f.is_cancelled())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_cancel_flag_delete(ptr: *mut CancelFlag) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr));
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_node_index_new(graph: *const Graph) -> *mut NodeIndex {
    match graph.as_ref() {
        Some(graph) => Box::into_raw(Box::new(NodeIndex::new(graph))),
        None => null_mut(),
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_node_index_delete(ptr: *mut NodeIndex) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr));
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_node_index_find_nearest_node(
    index: *const NodeIndex,
    lat: f32,
    lon: f32,
) -> Node {
    index
        .as_ref()
        .and_then(|idx| idx.find_nearest_node(lat, lon))
        .unwrap_or(Node::ZERO)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn routewave_earth_distance(lat1: f32, lon1: f32, lat2: f32, lon2: f32) -> f32 {
    earth_distance(lat1, lon1, lat2, lon2)
}
