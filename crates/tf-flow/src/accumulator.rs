//! Shared per-segment trip counters.
//!
//! # Exactly-once contributions
//!
//! Every increment is keyed by the contributing trip.  The accumulator keeps
//! the set of trips it has applied, and the check-and-increment happens in
//! one critical section, so:
//!
//! - concurrent `increment_all` calls never lose updates;
//! - a trip's contribution is applied at most once, even if the engine
//!   retries a trip that was incremented but not yet marked `Succeeded`;
//! - a `snapshot` taken concurrently sees either all or none of a trip's
//!   increments.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustc_hash::{FxHashMap, FxHashSet};

use tf_core::{SegmentId, SegmentIdx, TripId};
use tf_spatial::NetworkGraph;

use crate::{FlowError, FlowResult};

// ── SegmentCounter ────────────────────────────────────────────────────────────

/// A point-in-time copy of the accumulator: `segment_id → count`, holding
/// only segments with a non-zero count.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentCounter {
    counts: BTreeMap<SegmentId, u64>,
}

impl SegmentCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for `id`; zero for unused or unknown segments.
    pub fn get(&self, id: &str) -> u64 {
        self.counts.get(id).copied().unwrap_or(0)
    }

    /// Number of segments with a non-zero count.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum over all segments.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn max_count(&self) -> u64 {
        self.counts.values().copied().max().unwrap_or(0)
    }

    /// Entries in ascending segment-id order.
    pub fn iter(&self) -> btree_map::Iter<'_, SegmentId, u64> {
        self.counts.iter()
    }

    pub fn into_inner(self) -> BTreeMap<SegmentId, u64> {
        self.counts
    }
}

impl FromIterator<(SegmentId, u64)> for SegmentCounter {
    /// Collect entries, summing repeated ids and dropping zero counts.
    fn from_iter<I: IntoIterator<Item = (SegmentId, u64)>>(iter: I) -> Self {
        let mut counts = BTreeMap::new();
        for (id, n) in iter {
            if n > 0 {
                *counts.entry(id).or_insert(0) += n;
            }
        }
        Self { counts }
    }
}

impl<'a> IntoIterator for &'a SegmentCounter {
    type Item = (&'a SegmentId, &'a u64);
    type IntoIter = btree_map::Iter<'a, SegmentId, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.iter()
    }
}

// ── SegmentAccumulator ────────────────────────────────────────────────────────

struct AccumulatorState {
    /// Indexed by `SegmentIdx`.
    counts:  Vec<u64>,
    applied: FxHashSet<TripId>,
}

/// Mutex-protected per-segment counters for one network.
pub struct SegmentAccumulator {
    segment_ids: Arc<[SegmentId]>,
    state:       Mutex<AccumulatorState>,
}

impl SegmentAccumulator {
    /// All-zero counters for every segment of `network`.
    pub fn new(network: &NetworkGraph) -> Self {
        Self {
            segment_ids: Arc::clone(&network.segment_ids),
            state: Mutex::new(AccumulatorState {
                counts:  vec![0; network.segment_count()],
                applied: FxHashSet::default(),
            }),
        }
    }

    /// Rebuild an accumulator from a saved snapshot.
    ///
    /// `applied` lists the trips whose contributions are already included
    /// in `counter`; they will not be applied again.
    ///
    /// # Errors
    ///
    /// [`FlowError::UnknownSegment`] if `counter` names a segment that is
    /// not in `network` (the checkpoint belongs to a different network).
    pub fn restore<I>(network: &NetworkGraph, counter: &SegmentCounter, applied: I) -> FlowResult<Self>
    where
        I: IntoIterator<Item = TripId>,
    {
        let index: FxHashMap<&str, usize> = network
            .segment_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let acc = Self::new(network);
        {
            let mut state = acc.lock();
            for (id, &n) in counter {
                let i = *index
                    .get(id.as_str())
                    .ok_or_else(|| FlowError::UnknownSegment(id.clone()))?;
                state.counts[i] = n;
            }
            state.applied.extend(applied);
        }
        Ok(acc)
    }

    /// Count one traversal of every segment in `segments` on behalf of
    /// `trip`.  Repeated indices within one call count once.
    ///
    /// Returns `false` (and changes nothing) if `trip` was already applied.
    pub fn increment_all(&self, trip: &TripId, segments: &[SegmentIdx]) -> bool {
        let mut unique = segments.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let mut state = self.lock();
        if !state.applied.insert(trip.clone()) {
            return false;
        }
        for s in unique {
            match state.counts.get_mut(s.index()) {
                Some(c) => *c += 1,
                None => log::warn!("trip {trip}: segment {s} is outside this network"),
            }
        }
        true
    }

    /// `true` if `trip` has already contributed.
    pub fn is_applied(&self, trip: &TripId) -> bool {
        self.lock().applied.contains(trip)
    }

    /// Current count for one segment.
    pub fn count(&self, segment: SegmentIdx) -> u64 {
        self.lock().counts.get(segment.index()).copied().unwrap_or(0)
    }

    /// Consistent copy of all non-zero counters.
    pub fn snapshot(&self) -> SegmentCounter {
        let state = self.lock();
        state
            .counts
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n > 0)
            .map(|(i, &n)| (self.segment_ids[i].clone(), n))
            .collect()
    }

    /// `(segments with a non-zero count, highest count)`.
    pub fn usage(&self) -> (usize, u64) {
        let state = self.lock();
        let used = state.counts.iter().filter(|&&n| n > 0).count();
        let max = state.counts.iter().copied().max().unwrap_or(0);
        (used, max)
    }

    /// Number of trips that have contributed.
    pub fn applied_trips(&self) -> usize {
        self.lock().applied.len()
    }

    /// Zero every counter and forget every applied trip.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.counts.fill(0);
        state.applied.clear();
    }

    /// A panicking holder cannot leave a half-applied trip behind (the
    /// increment loop does not panic), so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, AccumulatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
