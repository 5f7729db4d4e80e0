//! Spatial-subsystem error type.

use std::time::Duration;

use thiserror::Error;

use tf_core::{GeoPoint, NodeId, SegmentId};

/// Errors produced by `tf-spatial`.
///
/// The first three are structural and raised by the graph builder; the rest
/// are per-query outcomes returned by snapping and routing.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("segment {segment} has invalid weight {weight}: weights must be finite and non-negative")]
    InvalidSegmentWeight { segment: SegmentId, weight: f64 },

    #[error("segment id {0} appears more than once")]
    DuplicateSegmentId(SegmentId),

    #[error("segment {segment} has invalid geometry: {reason}")]
    InvalidGeometry { segment: SegmentId, reason: &'static str },

    #[error("no network node within {radius_m} m of {point}")]
    UnreachablePoint { point: GeoPoint, radius_m: f64 },

    #[error("no route from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },

    #[error("search from {from} to {to} exceeded its deadline after {elapsed:?}")]
    DeadlineExceeded { from: NodeId, to: NodeId, elapsed: Duration },

    #[error("node {0} not found in network")]
    NodeNotFound(NodeId),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
