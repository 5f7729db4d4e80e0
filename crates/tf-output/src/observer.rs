//! `PathRecorder<W>` — bridges `FlowObserver` to a `ResultSink`.

use std::ops::ControlFlow;

use tf_flow::{BatchReport, FlowObserver, Report};

use crate::row::TripPathRow;
use crate::writer::ResultSink;
use crate::{OutputError, OutputResult};

/// A [`FlowObserver`] that streams the path of every succeeded trip to a
/// [`ResultSink`] as each batch completes, and flushes the sink when the
/// run ends.
///
/// Observer methods cannot return errors, so write errors are stored; check
/// them with [`take_error`][Self::take_error] after the run.  By default the
/// run continues after a failed write (counts and statuses are unaffected);
/// [`stop_on_error`][Self::stop_on_error] cancels it instead.
pub struct PathRecorder<W: ResultSink> {
    writer:        W,
    rows_written:  usize,
    stop_on_error: bool,
    last_error:    Option<OutputError>,
}

impl<W: ResultSink> PathRecorder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, rows_written: 0, stop_on_error: false, last_error: None }
    }

    /// Break out of the run on the first write error.
    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    /// Take the stored write error (if any) after `engine.run()` returns.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Unwrap the inner writer, e.g. to save a checkpoint after the run.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                log::error!("failed to write trip paths: {e}");
                // Keep only the first error.
                if self.last_error.is_none() {
                    self.last_error = Some(e);
                }
                false
            }
        }
    }
}

impl<W: ResultSink> FlowObserver for PathRecorder<W> {
    fn on_batch_end(&mut self, batch: &BatchReport) -> ControlFlow<()> {
        let rows: Vec<TripPathRow> = batch
            .outcomes
            .iter()
            .filter_map(TripPathRow::from_outcome)
            .collect();
        if rows.is_empty() {
            return ControlFlow::Continue(());
        }

        let result = self.writer.write_paths(&rows);
        if self.store_err(result) {
            self.rows_written += rows.len();
        } else if self.stop_on_error {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    fn on_run_end(&mut self, _report: &Report) {
        let result = self.writer.flush();
        self.store_err(result);
    }
}
