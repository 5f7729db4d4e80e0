//! Run observer trait for progress reporting and data collection.

use std::ops::ControlFlow;

use tf_core::format_duration;

use crate::{BatchReport, Report};

/// Callbacks invoked by [`TripFlowEngine::run`][crate::TripFlowEngine::run].
///
/// All callbacks run on the thread that called `run`, one at a time, even
/// when batches execute on the worker pool.  Every method has a default
/// no-op implementation.
///
/// # Example: stop after the first failing batch
///
/// ```rust,ignore
/// struct StopOnFailure;
///
/// impl FlowObserver for StopOnFailure {
///     fn on_batch_end(&mut self, batch: &BatchReport) -> ControlFlow<()> {
///         if batch.failed_no_path > 0 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
///     }
/// }
/// ```
pub trait FlowObserver {
    /// Called once the pending trips are selected and batched.
    fn on_run_start(&mut self, _scheduled: usize, _batches: usize) {}

    /// Called as each batch completes, in completion order.
    ///
    /// Returning `ControlFlow::Break` cancels the run: batches that have
    /// not started yet are not dispatched.
    fn on_batch_end(&mut self, _batch: &BatchReport) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called once with the final report.
    fn on_run_end(&mut self, _report: &Report) {}
}

/// A [`FlowObserver`] that does nothing.
pub struct NoopObserver;

impl FlowObserver for NoopObserver {}

impl<O: FlowObserver + ?Sized> FlowObserver for &mut O {
    fn on_run_start(&mut self, scheduled: usize, batches: usize) {
        (**self).on_run_start(scheduled, batches);
    }

    fn on_batch_end(&mut self, batch: &BatchReport) -> ControlFlow<()> {
        (**self).on_batch_end(batch)
    }

    fn on_run_end(&mut self, report: &Report) {
        (**self).on_run_end(report);
    }
}

/// Fan out to two observers.  Either one breaking cancels the run.
impl<A: FlowObserver, B: FlowObserver> FlowObserver for (A, B) {
    fn on_run_start(&mut self, scheduled: usize, batches: usize) {
        self.0.on_run_start(scheduled, batches);
        self.1.on_run_start(scheduled, batches);
    }

    fn on_batch_end(&mut self, batch: &BatchReport) -> ControlFlow<()> {
        let a = self.0.on_batch_end(batch);
        let b = self.1.on_batch_end(batch);
        if a.is_break() || b.is_break() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn on_run_end(&mut self, report: &Report) {
        self.0.on_run_end(report);
        self.1.on_run_end(report);
    }
}

// ── ProgressLogger ────────────────────────────────────────────────────────────

/// Logs batch completions at `debug` and a progress line at `info` every
/// `interval` resolved trips.
pub struct ProgressLogger {
    interval:  usize,
    resolved:  usize,
    next_mark: usize,
    scheduled: usize,
}

impl ProgressLogger {
    pub fn new(interval: usize) -> Self {
        let interval = interval.max(1);
        Self { interval, resolved: 0, next_mark: interval, scheduled: 0 }
    }

    pub fn resolved(&self) -> usize {
        self.resolved
    }
}

impl FlowObserver for ProgressLogger {
    fn on_run_start(&mut self, scheduled: usize, batches: usize) {
        self.scheduled = scheduled;
        self.resolved = 0;
        self.next_mark = self.interval;
        log::info!("processing {scheduled} pending trips in {batches} batches");
    }

    fn on_batch_end(&mut self, batch: &BatchReport) -> ControlFlow<()> {
        log::debug!(
            "batch {} completed: {} of {} trips resolved in {}",
            batch.batch_num,
            batch.resolved(),
            batch.trips,
            format_duration(batch.elapsed),
        );
        self.resolved += batch.resolved();
        if self.resolved >= self.next_mark {
            log::info!("processed {} / {} trips", self.resolved, self.scheduled);
            while self.next_mark <= self.resolved {
                self.next_mark += self.interval;
            }
        }
        ControlFlow::Continue(())
    }

    fn on_run_end(&mut self, report: &Report) {
        log::info!(
            "run finished: {} succeeded, {} failed, {} deferred in {}",
            report.succeeded,
            report.failed_no_path + report.failed_missing_station,
            report.deferred,
            format_duration(report.elapsed),
        );
    }
}
