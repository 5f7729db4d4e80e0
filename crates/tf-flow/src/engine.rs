//! The `TripFlowEngine` and its batch loop.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::time::Instant;

use rustc_hash::FxHashSet;

use tf_core::{FlowConfig, Trip, TripId, TripStatus};
use tf_spatial::{NetworkGraph, Router, SpatialError};

use crate::{
    BatchReport, CancelToken, Checkpoint, DeferReason, Disposition, FlowError, FlowObserver,
    FlowResult, PathSummary, Report, SegmentAccumulator, SegmentCounter, StationIndex,
    TripOutcome, TripSource, TripStatusTable,
};

/// Shortest-path flow aggregation over one network.
///
/// `TripFlowEngine<R>` owns the read-only inputs (network, stations, router)
/// and the two pieces of shared mutable state (segment accumulator, trip
/// status table).  Each call to [`run`](Self::run):
///
/// 1. **Select**: read the trip source, keep trips that are still pending,
///    drop repeated trip ids, apply `max_trips`.
/// 2. **Batch**: split the selection into `batch_size` chunks in input order.
/// 3. **Process**: run batches sequentially (`concurrency == 1`) or on a
///    pool of `concurrency` workers.  Per trip:
///    - a station id missing from the index → `FailedMissingStation`;
///    - a station that cannot be snapped → `FailedMissingStation`;
///    - no route → `FailedNoPath`;
///    - a route → increment its segments, then `Succeeded`;
///    - deadline, router error, or panic → left pending.
/// 4. **Report**: every batch is handed to the observer as it completes; the
///    run ends with a [`Report`].
///
/// Create via [`TripFlowEngineBuilder`][crate::TripFlowEngineBuilder].
pub struct TripFlowEngine<R: Router> {
    pub(crate) config:      FlowConfig,
    pub(crate) network:     NetworkGraph,
    pub(crate) stations:    StationIndex,
    pub(crate) router:      R,
    pub(crate) accumulator: SegmentAccumulator,
    pub(crate) status:      TripStatusTable,
    pub(crate) cancel:      CancelToken,
}

impl<R: Router> TripFlowEngine<R> {
    // ── Public API ────────────────────────────────────────────────────────

    /// Process every pending trip in `source`.
    ///
    /// Per-trip failures are recorded as statuses and never returned as
    /// errors.  Only a source that cannot be opened or a worker pool that
    /// cannot be started ends the run early.
    pub fn run<S, O>(&mut self, source: &S, observer: &mut O) -> FlowResult<Report>
    where
        S: TripSource + ?Sized,
        O: FlowObserver,
    {
        let started = Instant::now();

        let mut report = Report {
            source_trips: source
                .trip_count()
                .map_err(|e| FlowError::Source(Box::new(e)))?,
            ..Report::default()
        };

        let pending = self.select_pending(source, &mut report)?;
        report.scheduled = pending.len();

        let batches: Vec<Vec<Trip>> = pending
            .chunks(self.config.batch_size)
            .map(<[Trip]>::to_vec)
            .collect();
        report.batches = batches.len();

        log::info!(
            "{} trips in source, {} already resolved, {} scheduled in {} batches",
            report.source_trips,
            report.already_resolved,
            report.scheduled,
            report.batches,
        );
        observer.on_run_start(report.scheduled, report.batches);

        if self.config.concurrency <= 1 || batches.len() <= 1 {
            self.run_sequential(batches, observer, &mut report);
        } else {
            self.run_parallel(batches, observer, &mut report)?;
        }

        let attempted = report.processed() + report.deferred + report.skipped;
        report.not_started = report.scheduled.saturating_sub(attempted);
        report.cancelled = self.cancel.take();
        let (used, max) = self.accumulator.usage();
        report.segments_used = used;
        report.max_segment_count = max;
        report.elapsed = started.elapsed();

        if report.cancelled {
            log::info!("run cancelled; {} scheduled trips left pending", report.not_started);
        }
        observer.on_run_end(&report);
        Ok(report)
    }

    /// Clear every segment count and every trip status.
    pub fn reset(&mut self) {
        self.accumulator.reset();
        self.status.reset();
        log::info!("segment counts and trip statuses cleared");
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn network(&self) -> &NetworkGraph {
        &self.network
    }

    pub fn stations(&self) -> &StationIndex {
        &self.stations
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn accumulator(&self) -> &SegmentAccumulator {
        &self.accumulator
    }

    pub fn status(&self) -> &TripStatusTable {
        &self.status
    }

    /// A handle that stops the current run from another thread.  Batches
    /// already running finish; the rest are not started.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Current segment counts.
    pub fn snapshot(&self) -> SegmentCounter {
        self.accumulator.snapshot()
    }

    /// Current counts and statuses, consistent with each other.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(self.status.snapshot(), self.accumulator.snapshot())
    }

    /// Hand the final state to the caller.
    pub fn into_checkpoint(self) -> Checkpoint {
        self.checkpoint()
    }

    // ── Selection ─────────────────────────────────────────────────────────

    fn select_pending<S>(&self, source: &S, report: &mut Report) -> FlowResult<Vec<Trip>>
    where
        S: TripSource + ?Sized,
    {
        let limit = self.config.max_trips.unwrap_or(usize::MAX);
        let mut seen: FxHashSet<TripId> = FxHashSet::default();
        let mut pending = Vec::new();

        let trips = source.trips().map_err(|e| FlowError::Source(Box::new(e)))?;
        for (i, record) in trips.enumerate() {
            let trip = match record {
                Ok(trip) => trip,
                Err(e) => {
                    log::warn!("skipping trip record {}: {e}", i + 1);
                    report.rejected_records += 1;
                    continue;
                }
            };
            if !self.status.is_pending(&trip.trip_id) {
                report.already_resolved += 1;
                continue;
            }
            if !seen.insert(trip.trip_id.clone()) {
                log::warn!("trip {} appears more than once; keeping the first record", trip.trip_id);
                report.duplicate_records += 1;
                continue;
            }
            if pending.len() < limit {
                pending.push(trip);
            }
        }
        Ok(pending)
    }

    // ── Dispatch ──────────────────────────────────────────────────────────

    fn run_sequential<O: FlowObserver>(
        &self,
        batches:  Vec<Vec<Trip>>,
        observer: &mut O,
        report:   &mut Report,
    ) {
        for (i, batch) in batches.iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            let done = self.process_batch(i + 1, batch);
            self.batch_finished(done, observer, report);
        }
    }

    /// Batches run on a dedicated pool while the calling thread drains
    /// finished batch reports and feeds them to the observer.
    fn run_parallel<O: FlowObserver>(
        &self,
        batches:  Vec<Vec<Trip>>,
        observer: &mut O,
        report:   &mut Report,
    ) -> FlowResult<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency)
            .thread_name(|i| format!("tf-worker-{i}"))
            .build()
            .map_err(|e| FlowError::WorkerPool(e.to_string()))?;

        let (tx, rx) = mpsc::channel::<BatchReport>();

        std::thread::scope(|s| {
            let dispatcher = s.spawn(move || {
                pool.scope(|scope| {
                    for (i, batch) in batches.into_iter().enumerate() {
                        let tx = tx.clone();
                        scope.spawn(move |_| {
                            if self.cancel.is_cancelled() {
                                return;
                            }
                            let done = self.process_batch(i + 1, &batch);
                            // The receiver outlives every sender.
                            let _ = tx.send(done);
                        });
                    }
                });
            });

            for done in rx {
                self.batch_finished(done, observer, report);
            }

            dispatcher
                .join()
                .map_err(|_| FlowError::WorkerPool("batch dispatcher panicked".into()))
        })
    }

    fn batch_finished<O: FlowObserver>(&self, done: BatchReport, observer: &mut O, report: &mut Report) {
        report.absorb(&done);
        if observer.on_batch_end(&done).is_break() {
            log::info!("observer stopped the run after batch {}", done.batch_num);
            self.cancel.cancel();
        }
    }

    // ── Per-trip processing ───────────────────────────────────────────────

    fn process_batch(&self, batch_num: usize, batch: &[Trip]) -> BatchReport {
        let started = Instant::now();
        let mut done = BatchReport::new(batch_num);
        for trip in batch {
            done.record(self.process_trip(trip));
        }
        done.elapsed = started.elapsed();
        log::debug!(
            "batch {batch_num}: {} succeeded, {} failed, {} deferred",
            done.succeeded,
            done.failed_no_path + done.failed_missing_station,
            done.deferred,
        );
        done
    }

    fn process_trip(&self, trip: &Trip) -> TripOutcome {
        if !self.status.is_pending(&trip.trip_id) {
            return outcome(trip, Disposition::Skipped, None);
        }
        match panic::catch_unwind(AssertUnwindSafe(|| self.resolve(trip))) {
            Ok(result) => result,
            Err(payload) => {
                log::error!(
                    "trip {}: worker panicked ({}); leaving it pending",
                    trip.trip_id,
                    panic_message(payload.as_ref()),
                );
                outcome(trip, Disposition::Deferred(DeferReason::WorkerPanic), None)
            }
        }
    }

    fn resolve(&self, trip: &Trip) -> TripOutcome {
        let start = self.stations.lookup(trip.start_station_id.as_str());
        let end = self.stations.lookup(trip.end_station_id.as_str());
        let (Some(start), Some(end)) = (start, end) else {
            log::debug!(
                "trip {}: unknown station {}",
                trip.trip_id,
                if start.is_none() { &trip.start_station_id } else { &trip.end_station_id },
            );
            return self.finish(trip, TripStatus::FailedMissingStation, None);
        };

        match self.router.shortest_path(&self.network, start.location, end.location) {
            Ok(route) => {
                // A `false` here means the counts already hold this trip
                // from an earlier attempt; only the status is missing.
                self.accumulator.increment_all(&trip.trip_id, &route.segments);
                let path = PathSummary {
                    segments:     route.segment_ids(&self.network),
                    total_weight: route.total_weight,
                };
                self.finish(trip, TripStatus::Succeeded, Some(path))
            }
            Err(e @ SpatialError::UnreachablePoint { .. }) => {
                log::debug!("trip {}: {e}", trip.trip_id);
                self.finish(trip, TripStatus::FailedMissingStation, None)
            }
            Err(e @ SpatialError::NoRoute { .. }) => {
                log::debug!("trip {}: {e}", trip.trip_id);
                self.finish(trip, TripStatus::FailedNoPath, None)
            }
            Err(e @ SpatialError::DeadlineExceeded { .. }) => {
                log::warn!("trip {}: {e}; leaving it pending", trip.trip_id);
                outcome(trip, Disposition::Deferred(DeferReason::DeadlineExceeded), None)
            }
            Err(e) => {
                log::warn!("trip {}: search failed: {e}; leaving it pending", trip.trip_id);
                outcome(trip, Disposition::Deferred(DeferReason::SearchError), None)
            }
        }
    }

    fn finish(&self, trip: &Trip, status: TripStatus, path: Option<PathSummary>) -> TripOutcome {
        if self.status.mark(&trip.trip_id, status) {
            outcome(trip, Disposition::Resolved(status), path)
        } else {
            outcome(trip, Disposition::Skipped, None)
        }
    }
}

fn outcome(trip: &Trip, disposition: Disposition, path: Option<PathSummary>) -> TripOutcome {
    TripOutcome { trip: trip.clone(), disposition, path }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
