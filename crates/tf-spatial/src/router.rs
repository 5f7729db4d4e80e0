//! Routing trait and default Dijkstra implementation.
//!
//! # Pluggability
//!
//! The trip-flow engine calls routing via the [`Router`] trait, so
//! applications can swap in other searches (A*, contraction hierarchies)
//! without touching the engine.  The default [`DijkstraRouter`] is
//! sufficient for city-scale networks.
//!
//! # Determinism
//!
//! Routes are ranked by `(total cost, hop count, segment-id sequence)`.
//! The first two are compared as integers; the third lexicographically on
//! segment id strings.  All three are preserved under extension by a
//! common arc, so the search can settle each node on its final label and
//! identical inputs always produce identical routes regardless of arc
//! numbering or thread interleaving.
//!
//! # Reentrancy
//!
//! All search state (distances, hop counts, predecessor arcs, heap) is
//! local to one call.  The graph is only read, so one router and one graph
//! can serve any number of concurrent queries without locking.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use tf_core::{EdgeId, GeoPoint, NodeId, SegmentId, SegmentIdx};

use crate::network::NetworkGraph;
use crate::{SpatialError, SpatialResult};

/// Deadline is checked on the first settled node and every N after.
const DEADLINE_CHECK_INTERVAL: u32 = 256;

// ── Route ─────────────────────────────────────────────────────────────────────

/// The result of a routing query: the ordered arcs and the segments they
/// traverse, plus the total weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Arcs to traverse in order, from source to destination.
    pub edges: Vec<EdgeId>,
    /// Segment of each arc, same order and length as `edges`.
    pub segments: Vec<SegmentIdx>,
    /// Sum of segment weights along the route.
    pub total_weight: f64,
}

impl Route {
    /// The zero-length route for a source that is also the target.
    pub fn trivial() -> Self {
        Self { edges: vec![], segments: vec![], total_weight: 0.0 }
    }

    /// `true` if the source and destination are the same node.
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn hop_count(&self) -> usize {
        self.edges.len()
    }

    /// Resolve the segment indices to their external ids.
    pub fn segment_ids(&self, network: &NetworkGraph) -> Vec<SegmentId> {
        self.segments
            .iter()
            .map(|&s| network.segment_id(s).clone())
            .collect()
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable routing engine.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` so one instance can be shared by
/// every worker in the engine's pool.
pub trait Router: Send + Sync {
    /// Compute a route between two nodes.
    ///
    /// `from == to` yields [`Route::trivial`], not an error.
    fn route(&self, network: &NetworkGraph, from: NodeId, to: NodeId) -> SpatialResult<Route>;

    /// Snap both coordinates to the network and route between the nodes.
    ///
    /// # Errors
    ///
    /// - [`SpatialError::UnreachablePoint`] if either coordinate cannot be
    ///   snapped.
    /// - [`SpatialError::NoRoute`] if the nodes are in different components.
    /// - [`SpatialError::DeadlineExceeded`] if the search ran out of time.
    fn shortest_path(
        &self,
        network: &NetworkGraph,
        from:    GeoPoint,
        to:      GeoPoint,
    ) -> SpatialResult<Route> {
        let source = network.snap(from)?;
        let target = network.snap(to)?;
        self.route(network, source, target)
    }
}

// ── DijkstraRouter ────────────────────────────────────────────────────────────

/// Dijkstra's algorithm over the CSR graph using `edge_cost`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DijkstraRouter {
    deadline: Option<Duration>,
}

impl DijkstraRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort any single search that runs longer than `deadline`.
    pub fn with_deadline(deadline: Option<Duration>) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

impl Router for DijkstraRouter {
    fn route(&self, network: &NetworkGraph, from: NodeId, to: NodeId) -> SpatialResult<Route> {
        dijkstra(network, from, to, self.deadline)
    }
}

// ── Dijkstra internals ────────────────────────────────────────────────────────

fn dijkstra(
    network:  &NetworkGraph,
    from:     NodeId,
    to:       NodeId,
    deadline: Option<Duration>,
) -> SpatialResult<Route> {
    let n = network.node_count();
    for node in [from, to] {
        if node.index() >= n {
            return Err(SpatialError::NodeNotFound(node));
        }
    }
    if from == to {
        return Ok(Route::trivial());
    }

    let started = Instant::now();

    // Label of v = (dist[v], hops[v]) plus the segment sequence implied by
    // walking prev_edge back to the source.
    let mut dist      = vec![u64::MAX; n];
    let mut hops      = vec![u32::MAX; n];
    let mut prev_edge = vec![EdgeId::INVALID; n];
    let mut settled   = vec![false; n];

    dist[from.index()] = 0;
    hops[from.index()] = 0;

    // Min-heap on (cost, hops, node).  Keys are monotone along any route,
    // so every predecessor on a node's best route is settled before it.
    let mut heap: BinaryHeap<Reverse<(u64, u32, NodeId)>> = BinaryHeap::new();
    heap.push(Reverse((0, 0, from)));
    let mut settled_count: u32 = 0;

    while let Some(Reverse((cost, h, node))) = heap.pop() {
        let i = node.index();
        if settled[i] || (cost, h) != (dist[i], hops[i]) {
            continue;
        }
        settled[i] = true;

        if node == to {
            return Ok(reconstruct(network, &prev_edge, to));
        }

        if let Some(limit) = deadline {
            if settled_count % DEADLINE_CHECK_INTERVAL == 0 {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Err(SpatialError::DeadlineExceeded { from, to, elapsed });
                }
            }
        }
        settled_count = settled_count.wrapping_add(1);

        for edge in network.out_edges(node) {
            let next = network.edge_to[edge.index()];
            let j = next.index();
            if settled[j] {
                continue;
            }
            let new_cost = cost.saturating_add(network.edge_cost[edge.index()]);
            let new_hops = h + 1;

            match (new_cost, new_hops).cmp(&(dist[j], hops[j])) {
                Ordering::Less => {
                    dist[j] = new_cost;
                    hops[j] = new_hops;
                    prev_edge[j] = edge;
                    heap.push(Reverse((new_cost, new_hops, next)));
                }
                Ordering::Equal => {
                    if candidate_is_smaller(network, &prev_edge, edge, next) {
                        prev_edge[j] = edge;
                    }
                }
                Ordering::Greater => {}
            }
        }
    }

    Err(SpatialError::NoRoute { from, to })
}

/// Segment sequence from the source to `node`, following `prev_edge`.
fn segments_to(network: &NetworkGraph, prev_edge: &[EdgeId], node: NodeId) -> Vec<SegmentIdx> {
    let mut out = Vec::new();
    let mut cur = node;
    loop {
        let e = prev_edge[cur.index()];
        if e == EdgeId::INVALID {
            break;
        }
        out.push(network.edge_segment[e.index()]);
        cur = network.edge_from[e.index()];
    }
    out.reverse();
    out
}

/// On an exact `(cost, hops)` tie at `next`, is the route through `edge`
/// lexicographically smaller than the one currently recorded?
///
/// Both sequences have the same length, so plain element-wise comparison
/// is the lexicographic order.  Ties are rare on real data; materialising
/// both sequences here keeps the hot path free of per-node path storage.
fn candidate_is_smaller(
    network:   &NetworkGraph,
    prev_edge: &[EdgeId],
    edge:      EdgeId,
    next:      NodeId,
) -> bool {
    let current = prev_edge[next.index()];
    if current == EdgeId::INVALID {
        return true;
    }

    let mut candidate = segments_to(network, prev_edge, network.edge_from[edge.index()]);
    candidate.push(network.edge_segment[edge.index()]);
    let mut incumbent = segments_to(network, prev_edge, network.edge_from[current.index()]);
    incumbent.push(network.edge_segment[current.index()]);

    let ids = &network.segment_ids;
    candidate
        .iter()
        .map(|s| &ids[s.index()])
        .cmp(incumbent.iter().map(|s| &ids[s.index()]))
        == Ordering::Less
}

fn reconstruct(network: &NetworkGraph, prev_edge: &[EdgeId], to: NodeId) -> Route {
    let mut edges = Vec::new();
    let mut cur = to;
    loop {
        let e = prev_edge[cur.index()];
        if e == EdgeId::INVALID {
            break;
        }
        edges.push(e);
        cur = network.edge_from[e.index()];
    }
    edges.reverse();

    let segments: Vec<SegmentIdx> = edges.iter().map(|e| network.edge_segment[e.index()]).collect();
    let total_weight = segments.iter().map(|s| network.segment_weight[s.index()]).sum();
    Route { edges, segments, total_weight }
}
