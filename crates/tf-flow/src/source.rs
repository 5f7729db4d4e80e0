//! The trip-source collaborator contract.

use std::convert::Infallible;

use tf_core::Trip;

/// A finite, restartable sequence of trips.
///
/// Every call to [`trips`](Self::trips) starts again from the first record,
/// so one source can feed several incremental runs.  Item-level errors are
/// malformed records: the engine logs and skips them.  Errors from opening
/// the sequence abort the run.
pub trait TripSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Total number of records, for progress reporting.
    fn trip_count(&self) -> Result<usize, Self::Error>;

    /// Start a fresh pass over the records.
    #[allow(clippy::type_complexity)]
    fn trips(&self) -> Result<Box<dyn Iterator<Item = Result<Trip, Self::Error>> + '_>, Self::Error>;
}

impl TripSource for [Trip] {
    type Error = Infallible;

    fn trip_count(&self) -> Result<usize, Infallible> {
        Ok(self.len())
    }

    fn trips(&self) -> Result<Box<dyn Iterator<Item = Result<Trip, Infallible>> + '_>, Infallible> {
        Ok(Box::new(self.iter().cloned().map(Ok)))
    }
}

impl TripSource for Vec<Trip> {
    type Error = Infallible;

    fn trip_count(&self) -> Result<usize, Infallible> {
        self.as_slice().trip_count()
    }

    fn trips(&self) -> Result<Box<dyn Iterator<Item = Result<Trip, Infallible>> + '_>, Infallible> {
        self.as_slice().trips()
    }
}
