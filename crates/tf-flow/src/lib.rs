//! `tf-flow` — trip-flow aggregation engine.
//!
//! # Per-run pipeline
//!
//! ```text
//! trip source ─▶ pending filter ─▶ batches ─▶ worker pool
//!                                              │ per trip:
//!                                              │   StationIndex::lookup
//!                                              │   Router::shortest_path
//!                                              │   SegmentAccumulator::increment_all
//!                                              │   TripStatusTable::mark
//!                                              ▼
//!                         FlowObserver::on_batch_end (calling thread)
//!                                              ▼
//!                                           Report
//! ```
//!
//! The network, stations, and router are shared read-only.  The accumulator
//! and status table are the only mutable shared state; both are internally
//! synchronised.  Terminal statuses are sticky, so repeating a run over the
//! same trips processes nothing new.
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use tf_flow::{NoopObserver, StationIndex, TripFlowEngineBuilder};
//!
//! let stations = StationIndex::build(stations)?;
//! let mut engine = TripFlowEngineBuilder::dijkstra(config, network, stations).build()?;
//! let report = engine.run(&trips, &mut NoopObserver)?;
//! println!("{report}");
//! ```
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | `Serialize`/`Deserialize` on `Checkpoint` and `SegmentCounter` |

pub mod accumulator;
pub mod builder;
pub mod cancel;
pub mod checkpoint;
pub mod engine;
pub mod error;
pub mod observer;
pub mod report;
pub mod source;
pub mod station;
pub mod status;


pub use accumulator::{SegmentAccumulator, SegmentCounter};
pub use builder::TripFlowEngineBuilder;
pub use cancel::CancelToken;
pub use checkpoint::Checkpoint;
pub use engine::TripFlowEngine;
pub use error::{FlowError, FlowResult};
pub use observer::{FlowObserver, NoopObserver, ProgressLogger};
pub use report::{BatchReport, DeferReason, Disposition, PathSummary, Report, TripOutcome};
pub use source::TripSource;
pub use station::StationIndex;
pub use status::{StatusCounts, TripStatusTable};
