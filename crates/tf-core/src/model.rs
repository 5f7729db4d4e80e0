//! Input records and per-trip status.
//!
//! These are the shapes the external collaborators (trip source, station
//! source, network source) hand to the engine.  All are immutable once built.

use std::fmt;
use std::str::FromStr;

use crate::{CoreError, GeoPoint, SegmentId, StationId, TripId};

/// A docking station.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Station {
    pub id:       StationId,
    pub location: GeoPoint,
}

impl Station {
    pub fn new(id: impl Into<StationId>, location: GeoPoint) -> Self {
        Self { id: id.into(), location }
    }
}

/// One point-to-point trip between two stations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trip {
    pub trip_id:          TripId,
    pub start_station_id: StationId,
    pub end_station_id:   StationId,
}

impl Trip {
    pub fn new(
        trip_id: impl Into<TripId>,
        start:   impl Into<StationId>,
        end:     impl Into<StationId>,
    ) -> Self {
        Self {
            trip_id:          trip_id.into(),
            start_station_id: start.into(),
            end_station_id:   end.into(),
        }
    }
}

/// One raw network segment as delivered by the network source.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentRecord {
    pub segment_id: SegmentId,
    /// Ordered vertices; the first and last become graph nodes.
    pub polyline:   Vec<GeoPoint>,
    /// Explicit traversal cost.  `None` means "use the geometric length in
    /// metres".
    pub weight:     Option<f64>,
    /// Only the first → last direction is traversable.
    pub oneway:     bool,
}

impl SegmentRecord {
    /// A two-way segment weighted by its geometric length.
    pub fn new(segment_id: impl Into<SegmentId>, polyline: Vec<GeoPoint>) -> Self {
        Self { segment_id: segment_id.into(), polyline, weight: None, oneway: false }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn oneway(mut self) -> Self {
        self.oneway = true;
        self
    }
}

// ── TripStatus ────────────────────────────────────────────────────────────────

/// Processing state of a trip across runs.
///
/// Everything except `Unprocessed` is terminal: once a trip reaches a
/// terminal state it is never processed again.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TripStatus {
    #[default]
    Unprocessed,
    Succeeded,
    FailedNoPath,
    FailedMissingStation,
}

impl TripStatus {
    pub const ALL: [TripStatus; 4] = [
        TripStatus::Unprocessed,
        TripStatus::Succeeded,
        TripStatus::FailedNoPath,
        TripStatus::FailedMissingStation,
    ];

    #[inline]
    pub fn is_terminal(self) -> bool {
        !matches!(self, TripStatus::Unprocessed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TripStatus::Unprocessed          => "unprocessed",
            TripStatus::Succeeded            => "succeeded",
            TripStatus::FailedNoPath         => "failed_no_path",
            TripStatus::FailedMissingStation => "failed_missing_station",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TripStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s.trim())
            .ok_or_else(|| CoreError::Parse(format!("unknown trip status {s:?}")))
    }
}
