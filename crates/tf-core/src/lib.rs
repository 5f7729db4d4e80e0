//! `tf-core` — foundational types for the trip-flow aggregation workspace.
//!
//! This crate is a dependency of every other `tf-*` crate.  It has no `tf-*`
//! dependencies and one external one (`thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module     | Contents                                                   |
//! |------------|------------------------------------------------------------|
//! | [`ids`]    | `NodeId`, `EdgeId`, `SegmentIdx`, `SegmentId`, `StationId`, `TripId` |
//! | [`geo`]    | `GeoPoint`, haversine distance, polyline length            |
//! | [`model`]  | `Station`, `Trip`, `SegmentRecord`, `TripStatus`           |
//! | [`config`] | `FlowConfig`                                               |
//! | [`time`]   | `format_duration`                                          |
//! | [`error`]  | `CoreError`, `CoreResult`                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod model;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::FlowConfig;
pub use error::{CoreError, CoreResult};
pub use geo::{GeoPoint, polyline_length_m};
pub use ids::{EdgeId, NodeId, SegmentId, SegmentIdx, StationId, TripId};
pub use model::{SegmentRecord, Station, Trip, TripStatus};
pub use time::format_duration;
