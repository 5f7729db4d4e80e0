//! Persistable run state.

use tf_core::{TripId, TripStatus};

use crate::{SegmentCounter, StatusCounts};

/// Trip statuses and segment counts captured together.
///
/// Counts only ever include contributions from trips recorded here as
/// `Succeeded`, so restoring both halves from the same checkpoint resumes
/// without double counting.  Sinks must persist the two halves together.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Checkpoint {
    /// Sorted by trip id.
    pub statuses: Vec<(TripId, TripStatus)>,
    pub counts:   SegmentCounter,
}

impl Checkpoint {
    pub fn new(statuses: Vec<(TripId, TripStatus)>, counts: SegmentCounter) -> Self {
        Self { statuses, counts }
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty() && self.counts.is_empty()
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for &(_, status) in &self.statuses {
            counts.add(status);
        }
        counts
    }

    /// Trips whose contributions are included in `counts`.
    pub fn succeeded_trips(&self) -> impl Iterator<Item = &TripId> + '_ {
        self.statuses
            .iter()
            .filter(|(_, st)| *st == TripStatus::Succeeded)
            .map(|(id, _)| id)
    }
}
