//! Per-trip processing state across runs.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;

use tf_core::{TripId, TripStatus};

/// Tally of trips by status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub unprocessed:            usize,
    pub succeeded:              usize,
    pub failed_no_path:         usize,
    pub failed_missing_station: usize,
}

impl StatusCounts {
    pub fn terminal(&self) -> usize {
        self.succeeded + self.failed_no_path + self.failed_missing_station
    }

    pub(crate) fn add(&mut self, status: TripStatus) {
        match status {
            TripStatus::Unprocessed          => self.unprocessed += 1,
            TripStatus::Succeeded            => self.succeeded += 1,
            TripStatus::FailedNoPath         => self.failed_no_path += 1,
            TripStatus::FailedMissingStation => self.failed_missing_station += 1,
        }
    }
}

/// `TripId → TripStatus`, with sticky terminal states.
///
/// Trips never seen are implicitly `Unprocessed`.  The first terminal
/// status written for a trip wins; later writes are ignored, so racing
/// duplicate submissions of one trip cannot flip its outcome.
#[derive(Debug, Default)]
pub struct TripStatusTable {
    inner: Mutex<FxHashMap<TripId, TripStatus>>,
}

impl TripStatusTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from saved `(trip, status)` pairs, applying the same
    /// first-terminal-wins rule as [`mark`](Self::mark).
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (TripId, TripStatus)>,
    {
        let table = Self::new();
        for (trip, status) in entries {
            table.mark(&trip, status);
        }
        table
    }

    /// Record `status` for `trip`.
    ///
    /// Returns `true` if this call changed the stored status.  A trip that
    /// already holds a terminal status is left untouched and `false` is
    /// returned.
    pub fn mark(&self, trip: &TripId, status: TripStatus) -> bool {
        let mut map = self.lock();
        match map.get(trip) {
            Some(&current) if current.is_terminal() || current == status => false,
            _ => {
                map.insert(trip.clone(), status);
                true
            }
        }
    }

    pub fn status(&self, trip: &TripId) -> TripStatus {
        self.lock().get(trip).copied().unwrap_or_default()
    }

    /// `true` if `trip` is absent or `Unprocessed`.
    pub fn is_pending(&self, trip: &TripId) -> bool {
        !self.status(trip).is_terminal()
    }

    /// Number of trips with a recorded status.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for &status in self.lock().values() {
            counts.add(status);
        }
        counts
    }

    /// All recorded entries, sorted by trip id.
    pub fn snapshot(&self) -> Vec<(TripId, TripStatus)> {
        let mut entries: Vec<_> = self
            .lock()
            .iter()
            .map(|(id, &st)| (id.clone(), st))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Trips currently marked `Succeeded`.
    pub fn succeeded(&self) -> Vec<TripId> {
        self.lock()
            .iter()
            .filter(|&(_, &st)| st == TripStatus::Succeeded)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Forget every status; all trips become pending again.
    pub fn reset(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<TripId, TripStatus>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
