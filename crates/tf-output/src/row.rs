//! Plain data row types read and written by the CSV and SQLite backends.

use serde::{Deserialize, Serialize};

use tf_core::{SegmentId, StationId, TripId, TripStatus};
use tf_flow::{Disposition, TripOutcome};

/// Separator between segment ids in [`TripPathRow::segments`].
pub const SEGMENT_SEPARATOR: char = ';';

/// One row of `segment_counts.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCountRow {
    pub segment_id: SegmentId,
    pub trip_count: u64,
}

/// One row of `trip_status.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripStatusRow {
    pub trip_id: TripId,
    pub status:  TripStatus,
}

/// The route of one succeeded trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPathRow {
    pub trip_id:          TripId,
    pub start_station_id: StationId,
    pub end_station_id:   StationId,
    pub segment_count:    usize,
    pub total_weight:     f64,
    /// Segment ids in travel order, joined with [`SEGMENT_SEPARATOR`].
    pub segments:         String,
}

impl TripPathRow {
    /// `None` unless the outcome is a newly succeeded trip.
    pub fn from_outcome(outcome: &TripOutcome) -> Option<Self> {
        let Disposition::Resolved(TripStatus::Succeeded) = outcome.disposition else {
            return None;
        };
        let path = outcome.path.as_ref()?;
        let mut segments = String::new();
        for (i, id) in path.segments.iter().enumerate() {
            if i > 0 {
                segments.push(SEGMENT_SEPARATOR);
            }
            segments.push_str(id.as_str());
        }
        Some(Self {
            trip_id:          outcome.trip.trip_id.clone(),
            start_station_id: outcome.trip.start_station_id.clone(),
            end_station_id:   outcome.trip.end_station_id.clone(),
            segment_count:    path.segments.len(),
            total_weight:     path.total_weight,
            segments,
        })
    }

    pub fn segment_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.segments.split(SEGMENT_SEPARATOR).filter(|s| !s.is_empty())
    }
}
