//! Per-trip outcomes, per-batch reports, and the run summary.

use std::fmt;
use std::time::Duration;

use tf_core::{SegmentId, Trip, TripStatus, format_duration};

/// Why a trip was left pending for a later run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeferReason {
    /// The path search hit its per-query deadline.
    DeadlineExceeded,
    /// The router returned an unexpected error.
    SearchError,
    /// The worker panicked while processing the trip.
    WorkerPanic,
}

/// What happened to one trip in this run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Reached a terminal status in this run.
    Resolved(TripStatus),
    /// Left `Unprocessed`; safe to retry.
    Deferred(DeferReason),
    /// Already terminal when its turn came (duplicate trip id).
    Skipped,
}

/// The route a succeeded trip took.
#[derive(Clone, Debug, PartialEq)]
pub struct PathSummary {
    pub segments:     Vec<SegmentId>,
    pub total_weight: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TripOutcome {
    pub trip:        Trip,
    pub disposition: Disposition,
    /// Present only for trips resolved as `Succeeded`.
    pub path:        Option<PathSummary>,
}

// ── BatchReport ───────────────────────────────────────────────────────────────

/// Result of one batch, handed to the observer as soon as it completes.
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    /// 1-based, in input order.
    pub batch_num:              usize,
    pub trips:                  usize,
    pub succeeded:              usize,
    pub failed_no_path:         usize,
    pub failed_missing_station: usize,
    pub deferred:               usize,
    pub skipped:                usize,
    pub elapsed:                Duration,
    pub outcomes:               Vec<TripOutcome>,
}

impl BatchReport {
    pub(crate) fn new(batch_num: usize) -> Self {
        Self { batch_num, ..Self::default() }
    }

    pub(crate) fn record(&mut self, outcome: TripOutcome) {
        self.trips += 1;
        match outcome.disposition {
            Disposition::Resolved(TripStatus::Succeeded)            => self.succeeded += 1,
            Disposition::Resolved(TripStatus::FailedNoPath)         => self.failed_no_path += 1,
            Disposition::Resolved(TripStatus::FailedMissingStation) => self.failed_missing_station += 1,
            Disposition::Resolved(TripStatus::Unprocessed)
            | Disposition::Deferred(_)                               => self.deferred += 1,
            Disposition::Skipped                                     => self.skipped += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Trips that reached a terminal status in this batch.
    pub fn resolved(&self) -> usize {
        self.succeeded + self.failed_no_path + self.failed_missing_station
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

/// Summary of one [`TripFlowEngine::run`](crate::TripFlowEngine::run).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    /// Records in the trip source.
    pub source_trips:           usize,
    /// Records the source could not decode.
    pub rejected_records:       usize,
    /// Trips skipped up front because an earlier run resolved them.
    pub already_resolved:       usize,
    /// Later records repeating a trip id already scheduled in this run.
    pub duplicate_records:      usize,
    /// Pending trips selected for this run (after `max_trips`).
    pub scheduled:              usize,
    pub batches:                usize,
    pub batches_run:            usize,

    pub succeeded:              usize,
    pub failed_no_path:         usize,
    pub failed_missing_station: usize,
    pub deferred:               usize,
    pub skipped:                usize,
    /// Scheduled trips whose batch never started (cancellation).
    pub not_started:            usize,
    pub cancelled:              bool,

    pub elapsed:                Duration,
    /// Time spent inside batches, summed over workers.
    pub processing_time:        Duration,

    /// Cumulative across runs: segments with a non-zero count.
    pub segments_used:          usize,
    /// Cumulative across runs: highest count on any segment.
    pub max_segment_count:      u64,
}

impl Report {
    pub(crate) fn absorb(&mut self, batch: &BatchReport) {
        self.batches_run            += 1;
        self.succeeded              += batch.succeeded;
        self.failed_no_path         += batch.failed_no_path;
        self.failed_missing_station += batch.failed_missing_station;
        self.deferred               += batch.deferred;
        self.skipped                += batch.skipped;
        self.processing_time        += batch.elapsed;
    }

    /// Trips that reached a terminal status in this run.
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed_no_path + self.failed_missing_station
    }

    /// Succeeded trips as a percentage of scheduled trips.
    pub fn success_rate(&self) -> f64 {
        if self.scheduled == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.scheduled as f64 * 100.0
    }

    /// Mean worker time per processed trip.
    pub fn avg_time_per_trip(&self) -> Duration {
        match u32::try_from(self.processed()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.processing_time / n,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Execution summary")?;
        writeln!(f, "  Trips in source        : {}", self.source_trips)?;
        writeln!(f, "  Already resolved       : {}", self.already_resolved)?;
        if self.rejected_records + self.duplicate_records > 0 {
            writeln!(
                f,
                "  Ignored records        : {} malformed, {} duplicate",
                self.rejected_records, self.duplicate_records,
            )?;
        }
        writeln!(f, "  Scheduled this run     : {} in {} batches", self.scheduled, self.batches)?;
        writeln!(f, "  Succeeded              : {}", self.succeeded)?;
        writeln!(f, "  Failed (no path)       : {}", self.failed_no_path)?;
        writeln!(f, "  Failed (station)       : {}", self.failed_missing_station)?;
        writeln!(f, "  Deferred               : {}", self.deferred)?;
        if self.cancelled {
            writeln!(f, "  Cancelled, not started : {}", self.not_started)?;
        }
        writeln!(f, "  Success rate           : {:.1}%", self.success_rate())?;
        writeln!(f, "  Avg time per trip      : {:.3} ms", self.avg_time_per_trip().as_secs_f64() * 1_000.0)?;
        writeln!(f, "  Network segments used  : {}", self.segments_used)?;
        writeln!(f, "  Max trips on a segment : {}", self.max_segment_count)?;
        write!(f, "  Total execution time   : {}", format_duration(self.elapsed))
    }
}
