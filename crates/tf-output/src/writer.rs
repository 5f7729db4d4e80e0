//! The `ResultSink` trait implemented by all backend writers.

use tf_core::{TripId, TripStatus};
use tf_flow::{Checkpoint, SegmentCounter};

use crate::{OutputResult, TripPathRow};

/// Destination for run results: segment counts, trip statuses, and the
/// per-trip paths streamed while the run is in progress.
///
/// `write_counts` and `write_statuses` replace whatever the sink held
/// before; `write_paths` appends.
pub trait ResultSink {
    fn write_counts(&mut self, counts: &SegmentCounter) -> OutputResult<()>;

    fn write_statuses(&mut self, statuses: &[(TripId, TripStatus)]) -> OutputResult<()>;

    fn write_paths(&mut self, rows: &[TripPathRow]) -> OutputResult<()>;

    /// Save counts and statuses as one unit.  Backends that support
    /// transactions override this to make the pair atomic.
    fn write_checkpoint(&mut self, checkpoint: &Checkpoint) -> OutputResult<()> {
        self.write_statuses(&checkpoint.statuses)?;
        self.write_counts(&checkpoint.counts)
    }

    /// Push buffered rows to storage.  Safe to call more than once.
    fn flush(&mut self) -> OutputResult<()>;
}

impl<W: ResultSink + ?Sized> ResultSink for &mut W {
    fn write_counts(&mut self, counts: &SegmentCounter) -> OutputResult<()> {
        (**self).write_counts(counts)
    }

    fn write_statuses(&mut self, statuses: &[(TripId, TripStatus)]) -> OutputResult<()> {
        (**self).write_statuses(statuses)
    }

    fn write_paths(&mut self, rows: &[TripPathRow]) -> OutputResult<()> {
        (**self).write_paths(rows)
    }

    fn write_checkpoint(&mut self, checkpoint: &Checkpoint) -> OutputResult<()> {
        (**self).write_checkpoint(checkpoint)
    }

    fn flush(&mut self) -> OutputResult<()> {
        (**self).flush()
    }
}
