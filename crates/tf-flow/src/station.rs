//! Immutable station lookup.

use rustc_hash::FxHashMap;

use tf_core::{Station, StationId};

use crate::{FlowError, FlowResult};

/// `StationId → Station` map, built once and shared read-only by workers.
#[derive(Debug, Default)]
pub struct StationIndex {
    stations: FxHashMap<StationId, Station>,
}

impl StationIndex {
    /// Index `stations`.
    ///
    /// # Errors
    ///
    /// [`FlowError::DuplicateStationId`] on the first repeated id.  Silently
    /// keeping either record would route trips from an arbitrary location.
    pub fn build<I>(stations: I) -> FlowResult<Self>
    where
        I: IntoIterator<Item = Station>,
    {
        let iter = stations.into_iter();
        let mut map = FxHashMap::with_capacity_and_hasher(iter.size_hint().0, Default::default());
        for station in iter {
            if map.contains_key(&station.id) {
                return Err(FlowError::DuplicateStationId(station.id));
            }
            map.insert(station.id.clone(), station);
        }
        Ok(Self { stations: map })
    }

    #[inline]
    pub fn lookup(&self, id: &str) -> Option<&Station> {
        self.stations.get(id)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Station> + '_ {
        self.stations.values()
    }
}
