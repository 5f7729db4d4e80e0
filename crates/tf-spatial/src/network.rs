//! Network graph representation and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing arcs.
//! Given a `NodeId n`, its outgoing arcs occupy the slice:
//!
//! ```text
//! edge_from[ node_out_start[n] .. node_out_start[n+1] ]
//! ```
//!
//! All arc arrays (`edge_from`, `edge_to`, `edge_segment`, `edge_cost`) are
//! sorted by source node and indexed by `EdgeId`.  Each arc points back at
//! the segment it was derived from through `edge_segment`; per-segment data
//! (`segment_ids`, `segment_weight`, `segment_geometry`) is indexed by
//! `SegmentIdx` in insertion order.
//!
//! # Costs
//!
//! Weights are `f64` on the way in but the search runs on integer costs
//! (`weight * cost_scale`, rounded).  Integer sums are associative, so two
//! routes of equal length compare as exactly equal and the tie-break rules
//! in [`router`](crate::router) apply reliably.
//!
//! The scale is picked per network when it is built: the smallest positive
//! weight maps to at least [`MIN_COST_UNITS`] units, as long as the sum of
//! every weight still fits in [`MAX_TOTAL_COST`].  Weights therefore keep
//! six significant digits relative to the lightest segment, whatever unit
//! they are expressed in.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps each node's unit vector on the sphere to its
//! `NodeId`.  Straight-line (chord) distance between unit vectors grows
//! strictly with great-circle distance, so the tree's nearest-neighbour
//! order is ground-distance order at every latitude.  The builder uses one
//! to merge nearby segment endpoints; the finished graph keeps one to snap
//! station coordinates to nodes.

use std::collections::HashSet;
use std::sync::Arc;

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use tf_core::{
    EdgeId, FlowConfig, GeoPoint, NodeId, SegmentId, SegmentIdx, SegmentRecord, polyline_length_m,
};

use crate::{SpatialError, SpatialResult};

/// Integer cost units given to the lightest positive segment weight.
pub const MIN_COST_UNITS: f64 = 1_000_000.0;

/// Ceiling on the scaled sum of all weights (2^53, the last integer an
/// `f64` holds exactly).  Bounds every route cost well inside `u64`.
pub const MAX_TOTAL_COST: f64 = 9_007_199_254_740_992.0;

/// Leading R-tree hits re-ranked by haversine metres, so nodes at the same
/// distance resolve to the lower `NodeId`.
const SNAP_CANDIDATES: usize = 8;

// ── R-tree node entry ─────────────────────────────────────────────────────────

/// Position on the unit sphere (earth-centred, x toward lon 0).
fn unit_vector(pos: GeoPoint) -> [f64; 3] {
    let (lat, lon) = (pos.lat.to_radians(), pos.lon.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

#[derive(Clone, Debug)]
struct NodeEntry {
    point: [f64; 3],
    pos:   GeoPoint,
    id:    NodeId,
}

impl NodeEntry {
    fn new(pos: GeoPoint, id: NodeId) -> Self {
        Self { point: unit_vector(pos), pos, id }
    }
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 3]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    /// Squared chord length on the unit sphere.
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        self.point
            .iter()
            .zip(point)
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

/// Haversine-nearest node to `pos`.  Ties go to the lower `NodeId`.
fn nearest_node(tree: &RTree<NodeEntry>, pos: GeoPoint) -> Option<(NodeId, f64)> {
    tree.nearest_neighbor_iter(&unit_vector(pos))
        .take(SNAP_CANDIDATES)
        .map(|e| (e.id, pos.distance_m(e.pos)))
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
}

// ── NetworkGraph ──────────────────────────────────────────────────────────────

/// Directed segment graph in CSR format plus a spatial index for snapping.
///
/// Immutable once built, so a single instance can be shared by reference
/// across any number of worker threads.  Do not construct directly; use
/// [`NetworkGraphBuilder`].
#[derive(Debug)]
pub struct NetworkGraph {
    // ── Node data ─────────────────────────────────────────────────────────
    /// Geographic position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<GeoPoint>,

    // ── CSR arc adjacency ─────────────────────────────────────────────────
    /// CSR row pointer.  Length = `node_count + 1`.
    pub node_out_start: Vec<u32>,

    /// Source node of each arc.  Needed to walk `prev_edge` back to the
    /// source during route reconstruction.
    pub edge_from: Vec<NodeId>,

    /// Destination node of each arc.
    pub edge_to: Vec<NodeId>,

    /// Segment each arc traverses.
    pub edge_segment: Vec<SegmentIdx>,

    /// Integer search cost of each arc (`weight * cost_scale`).
    pub edge_cost: Vec<u64>,

    // ── Segment data (indexed by SegmentIdx) ──────────────────────────────
    /// Stable external id of each segment.  Shared with accumulators so they
    /// can report by id without copying the table.
    pub segment_ids: Arc<[SegmentId]>,

    /// Traversal weight of each segment (explicit or geometric length).
    pub segment_weight: Vec<f64>,

    /// Original polyline of each segment, kept for result sinks.
    pub segment_geometry: Vec<Vec<GeoPoint>>,

    // ── Spatial index ─────────────────────────────────────────────────────
    snap_radius_m: f64,
    spatial_idx: RTree<NodeEntry>,

    cost_scale: f64,
}

impl NetworkGraph {
    /// Construct an empty network.  Every snap against it fails with
    /// [`SpatialError::UnreachablePoint`].
    pub fn empty() -> Self {
        NetworkGraphBuilder::new().build()
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segment_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    pub fn snap_radius_m(&self) -> f64 {
        self.snap_radius_m
    }

    /// Integer cost units per unit of weight for this network.
    pub fn cost_scale(&self) -> f64 {
        self.cost_scale
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over the `EdgeId`s of all outgoing arcs from `node`.
    ///
    /// This is a contiguous index range; no heap allocation.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    /// Out-degree of `node` (number of outgoing arcs).
    #[inline]
    pub fn out_degree(&self, node: NodeId) -> usize {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        end - start
    }

    // ── Segment lookups ───────────────────────────────────────────────────

    #[inline]
    pub fn segment_id(&self, idx: SegmentIdx) -> &SegmentId {
        &self.segment_ids[idx.index()]
    }

    /// Linear lookup of a segment by external id.  Intended for tests and
    /// checkpoint restore, not hot paths.
    pub fn find_segment(&self, id: &str) -> Option<SegmentIdx> {
        self.segment_ids
            .iter()
            .position(|s| s.as_str() == id)
            .map(|i| SegmentIdx(i as u32))
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Snap `pos` to the nearest node within the configured snap radius.
    ///
    /// # Errors
    ///
    /// [`SpatialError::UnreachablePoint`] if `pos` is not a valid coordinate,
    /// the network is empty, or the nearest node is farther than the radius.
    pub fn snap(&self, pos: GeoPoint) -> SpatialResult<NodeId> {
        let unreachable = || SpatialError::UnreachablePoint {
            point:    pos,
            radius_m: self.snap_radius_m,
        };
        if !pos.is_valid() {
            return Err(unreachable());
        }
        match nearest_node(&self.spatial_idx, pos) {
            Some((id, dist_m)) if dist_m <= self.snap_radius_m => Ok(id),
            _ => Err(unreachable()),
        }
    }
}

// ── NetworkGraphBuilder ───────────────────────────────────────────────────────

/// Construct a [`NetworkGraph`] from segment records, then call
/// [`build`](Self::build).
///
/// Segment endpoints within `snap_tolerance_m` of an existing node are merged
/// into it; this is what connects segments digitised separately into one
/// routable graph.  Interior polyline vertices never become nodes.
///
/// # Example
///
/// ```
/// use tf_core::{GeoPoint, SegmentRecord};
/// use tf_spatial::NetworkGraphBuilder;
///
/// let a = GeoPoint::new(45.500, -73.570);
/// let b = GeoPoint::new(45.501, -73.570);
/// let c = GeoPoint::new(45.502, -73.570);
///
/// let mut builder = NetworkGraphBuilder::new().snap_tolerance_m(0.5);
/// builder.add_segment(SegmentRecord::new("AB", vec![a, b])).unwrap();
/// builder.add_segment(SegmentRecord::new("BC", vec![b, c])).unwrap();
/// let net = builder.build();
/// assert_eq!(net.node_count(), 3);
/// assert_eq!(net.edge_count(), 4); // two arcs per two-way segment
/// ```
pub struct NetworkGraphBuilder {
    snap_tolerance_m: f64,
    snap_radius_m:    f64,
    nodes:            Vec<GeoPoint>,
    node_idx:         RTree<NodeEntry>,
    segments:         Vec<SegmentData>,
    seen_ids:         HashSet<SegmentId>,
    raw_edges:        Vec<RawEdge>,
}

struct SegmentData {
    id:       SegmentId,
    weight:   f64,
    geometry: Vec<GeoPoint>,
}

struct RawEdge {
    from:    NodeId,
    to:      NodeId,
    segment: SegmentIdx,
}

impl NetworkGraphBuilder {
    pub fn new() -> Self {
        Self {
            snap_tolerance_m: 1.0,
            snap_radius_m:    250.0,
            nodes:            Vec::new(),
            node_idx:         RTree::new(),
            segments:         Vec::new(),
            seen_ids:         HashSet::new(),
            raw_edges:        Vec::new(),
        }
    }

    /// Builder with tolerance and radius taken from `config`.
    pub fn with_config(config: &FlowConfig) -> Self {
        Self::new()
            .snap_tolerance_m(config.snap_tolerance_m)
            .snap_radius_m(config.snap_radius_m)
    }

    /// Endpoints closer than this many metres share a node.  `0.0` merges
    /// only exactly coincident endpoints.
    pub fn snap_tolerance_m(mut self, metres: f64) -> Self {
        self.snap_tolerance_m = metres.max(0.0);
        self
    }

    /// Maximum distance between a snapped coordinate and its node.
    pub fn snap_radius_m(mut self, metres: f64) -> Self {
        self.snap_radius_m = metres;
        self
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn segment_count(&self) -> usize { self.segments.len() }

    /// Add one segment, validating its id, geometry, and weight.
    ///
    /// # Errors
    ///
    /// Structural errors abort construction: [`SpatialError::DuplicateSegmentId`],
    /// [`SpatialError::InvalidGeometry`] (fewer than two vertices or an
    /// out-of-range coordinate), [`SpatialError::InvalidSegmentWeight`]
    /// (negative or non-finite).
    pub fn add_segment(&mut self, record: SegmentRecord) -> SpatialResult<SegmentIdx> {
        let SegmentRecord { segment_id, polyline, weight, oneway } = record;

        if self.seen_ids.contains(&segment_id) {
            return Err(SpatialError::DuplicateSegmentId(segment_id));
        }
        if polyline.len() < 2 {
            return Err(SpatialError::InvalidGeometry {
                segment: segment_id,
                reason:  "fewer than two vertices",
            });
        }
        if polyline.iter().any(|p| !p.is_valid()) {
            return Err(SpatialError::InvalidGeometry {
                segment: segment_id,
                reason:  "coordinate out of range",
            });
        }
        let weight = weight.unwrap_or_else(|| polyline_length_m(&polyline));
        if !weight.is_finite() || weight < 0.0 {
            return Err(SpatialError::InvalidSegmentWeight { segment: segment_id, weight });
        }

        let idx  = SegmentIdx(self.segments.len() as u32);
        let from = self.intern_node(polyline[0]);
        let to   = self.intern_node(polyline[polyline.len() - 1]);

        if from == to {
            // A loop can never shorten a route; keep it for reporting only.
            log::debug!("segment {segment_id} starts and ends at {from}; no arcs added");
        } else {
            self.raw_edges.push(RawEdge { from, to, segment: idx });
            if !oneway {
                self.raw_edges.push(RawEdge { from: to, to: from, segment: idx });
            }
        }

        self.seen_ids.insert(segment_id.clone());
        self.segments.push(SegmentData { id: segment_id, weight, geometry: polyline });
        Ok(idx)
    }

    /// Add every record, stopping at the first structural error.
    pub fn extend<I>(&mut self, records: I) -> SpatialResult<()>
    where
        I: IntoIterator<Item = SegmentRecord>,
    {
        for record in records {
            self.add_segment(record)?;
        }
        Ok(())
    }

    /// Reuse the nearest existing node within tolerance, or create one.
    fn intern_node(&mut self, pos: GeoPoint) -> NodeId {
        if let Some((id, dist_m)) = nearest_node(&self.node_idx, pos) {
            if dist_m <= self.snap_tolerance_m {
                return id;
            }
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        self.node_idx.insert(NodeEntry::new(pos, id));
        id
    }

    /// Consume the builder and produce a [`NetworkGraph`].
    ///
    /// Time complexity: O(E log E) for the arc sort + O(N log N) for the
    /// R-tree bulk load, where N = nodes, E = arcs.
    pub fn build(self) -> NetworkGraph {
        let node_count = self.nodes.len();
        let edge_count = self.raw_edges.len();
        let cost_scale = cost_scale_for(self.segments.iter().map(|s| s.weight));

        // Stable sort keeps insertion order within a node's arc list, so
        // arc numbering is reproducible for identical input.
        let mut raw = self.raw_edges;
        raw.sort_by_key(|e| e.from.0);

        let edge_from:    Vec<NodeId>     = raw.iter().map(|e| e.from).collect();
        let edge_to:      Vec<NodeId>     = raw.iter().map(|e| e.to).collect();
        let edge_segment: Vec<SegmentIdx> = raw.iter().map(|e| e.segment).collect();
        let edge_cost:    Vec<u64>        = raw
            .iter()
            .map(|e| (self.segments[e.segment.index()].weight * cost_scale).round() as u64)
            .collect();

        let mut node_out_start = vec![0u32; node_count + 1];
        for e in &raw {
            node_out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, edge_count);

        // Bulk-load a fresh tree; the incremental one used for merging is
        // less well balanced.
        let entries: Vec<NodeEntry> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &pos)| NodeEntry::new(pos, NodeId(i as u32)))
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        let mut segment_ids      = Vec::with_capacity(self.segments.len());
        let mut segment_weight   = Vec::with_capacity(self.segments.len());
        let mut segment_geometry = Vec::with_capacity(self.segments.len());
        for s in self.segments {
            segment_ids.push(s.id);
            segment_weight.push(s.weight);
            segment_geometry.push(s.geometry);
        }

        NetworkGraph {
            node_pos: self.nodes,
            node_out_start,
            edge_from,
            edge_to,
            edge_segment,
            edge_cost,
            segment_ids: segment_ids.into(),
            segment_weight,
            segment_geometry,
            snap_radius_m: self.snap_radius_m,
            spatial_idx,
            cost_scale,
        }
    }
}

/// Cost units per unit of weight for a network with these segment weights.
fn cost_scale_for(weights: impl Iterator<Item = f64>) -> f64 {
    let (min_positive, total) = weights.fold((f64::INFINITY, 0.0), |(min, sum), w| {
        (if w > 0.0 { min.min(w) } else { min }, sum + w)
    });
    if !min_positive.is_finite() {
        // Every weight is zero; any scale gives the same costs.
        return 1.0;
    }
    let wanted = MIN_COST_UNITS / min_positive;
    let ceiling = MAX_TOTAL_COST / total;
    if wanted > ceiling {
        log::warn!(
            "lightest weight {:.3e} against a total of {:.3e}: it keeps only {:.0} cost units",
            min_positive,
            total,
            min_positive * ceiling,
        );
        ceiling
    } else {
        wanted
    }
}

impl Default for NetworkGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
