use thiserror::Error;

use tf_core::{CoreError, SegmentId, StationId};
use tf_spatial::SpatialError;

/// Run-level errors.  Per-trip failures never surface here; they are
/// recorded as trip statuses instead.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("station id {0} appears more than once")]
    DuplicateStationId(StationId),

    #[error("checkpoint refers to segment {0}, which is not in the network")]
    UnknownSegment(SegmentId),

    #[error("worker pool could not be started: {0}")]
    WorkerPool(String),

    #[error("trip source failed: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("network error: {0}")]
    Spatial(#[from] SpatialError),
}

pub type FlowResult<T> = Result<T, FlowError>;
