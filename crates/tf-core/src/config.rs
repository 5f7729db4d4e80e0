//! Run configuration.

use std::time::Duration;

use crate::{CoreError, CoreResult};

/// Top-level configuration for building the network and running the engine.
///
/// Typically loaded from a JSON file by the application crate (enable the
/// `serde` feature) and passed to the graph builder and engine builder.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FlowConfig {
    /// Cap on the number of still-pending trips processed in one run.
    /// `None` processes all of them.
    pub max_trips: Option<usize>,

    /// Trips per batch.  One batch is one task on the worker pool.
    pub batch_size: usize,

    /// Worker count.  `1` runs batches sequentially on the calling thread.
    pub concurrency: usize,

    /// Segment endpoints closer than this (metres) merge into one node.
    pub snap_tolerance_m: f64,

    /// Maximum distance (metres) from a station to its snapped network node.
    pub snap_radius_m: f64,

    /// Per-query search budget in milliseconds.  `None` disables the check.
    pub search_deadline_ms: Option<u64>,

    /// Emit a progress log line every N resolved trips.
    pub progress_interval: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            max_trips:          None,
            batch_size:         100,
            concurrency:        1,
            snap_tolerance_m:   1.0,
            snap_radius_m:      250.0,
            search_deadline_ms: None,
            progress_interval:  100,
        }
    }
}

impl FlowConfig {
    /// Check every field, reporting the first invalid one.
    pub fn validate(&self) -> CoreResult<()> {
        if self.batch_size == 0 {
            return Err(CoreError::Config("batch_size must be at least 1".into()));
        }
        if self.concurrency == 0 {
            return Err(CoreError::Config("concurrency must be at least 1".into()));
        }
        if !(self.snap_tolerance_m.is_finite() && self.snap_tolerance_m >= 0.0) {
            return Err(CoreError::Config(format!(
                "snap_tolerance_m must be a non-negative number, got {}",
                self.snap_tolerance_m
            )));
        }
        if !(self.snap_radius_m.is_finite() && self.snap_radius_m > 0.0) {
            return Err(CoreError::Config(format!(
                "snap_radius_m must be a positive number, got {}",
                self.snap_radius_m
            )));
        }
        if self.progress_interval == 0 {
            return Err(CoreError::Config("progress_interval must be at least 1".into()));
        }
        Ok(())
    }

    #[inline]
    pub fn search_deadline(&self) -> Option<Duration> {
        self.search_deadline_ms.map(Duration::from_millis)
    }
}
