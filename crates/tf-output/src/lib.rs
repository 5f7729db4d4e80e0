//! `tf-output` — input loaders and result writers for trip-flow runs.
//!
//! Two result backends are provided:
//!
//! | Feature   | Backend | Files created                                                 |
//! |-----------|---------|---------------------------------------------------------------|
//! | *(none)*  | CSV     | `segment_counts.csv`, `trip_status.csv`, `trip_paths.csv`     |
//! | `sqlite`  | SQLite  | `trip_flow.db`                                                |
//!
//! Both implement [`ResultSink`].  [`PathRecorder`] implements
//! `tf_flow::FlowObserver` and streams per-trip paths to a sink while the
//! run is in progress; the final counts and statuses are saved afterwards
//! with [`ResultSink::write_checkpoint`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use tf_output::{CsvTripSource, CsvWriter, PathRecorder, ResultSink, load_checkpoint_csv};
//!
//! let checkpoint = load_checkpoint_csv(out_dir)?;
//! let mut engine = TripFlowEngineBuilder::dijkstra(config, network, stations)
//!     .resume(checkpoint)
//!     .build()?;
//!
//! let mut obs = PathRecorder::new(CsvWriter::new(out_dir)?);
//! let report = engine.run(&CsvTripSource::new("trips.csv"), &mut obs)?;
//! if let Some(e) = obs.take_error() { eprintln!("output error: {e}"); }
//!
//! let mut writer = obs.into_writer();
//! writer.write_checkpoint(&engine.checkpoint())?;
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod source;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use self::csv::{CsvWriter, load_checkpoint_csv};
pub use error::{OutputError, OutputResult};
pub use observer::PathRecorder;
pub use row::{SegmentCountRow, TripPathRow, TripStatusRow};
pub use source::{
    CsvTripSource, load_network_csv, load_segments_csv, load_segments_reader, load_station_index,
    load_stations_csv, load_stations_reader, load_trips_reader,
};
pub use writer::ResultSink;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteWriter;
