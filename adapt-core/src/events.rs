//! Event aggregation and the history-by-history variance estimator.
//!
//! Hits are grouped by event id and summed into one energy total per
//! event (history). The variance of the deposited energy is then estimated
//! from those totals, not from individual hits, so that multiple
//! interactions within one history are not counted as independent samples.

use crate::hit::HitRecord;
use crate::{Error, Result};
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Total deposited energy of one event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventEnergy {
    /// Event id.
    pub event_id: i64,
    /// Sum of hit energies for this event.
    pub energy: f64,
}

/// Per-event energy totals in ascending event-id order.
///
/// Only events with at least one hit are present.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventTotals {
    events: Vec<EventEnergy>,
}

impl EventTotals {
    /// Groups hits by event id and sums their energies.
    #[must_use]
    pub fn aggregate(hits: &[HitRecord]) -> Self {
        let mut sums: BTreeMap<i64, f64> = BTreeMap::new();
        for hit in hits {
            *sums.entry(hit.event_id).or_insert(0.0) += hit.energy;
        }
        let events = sums
            .into_iter()
            .map(|(event_id, energy)| EventEnergy { event_id, energy })
            .collect();
        Self { events }
    }

    /// Number of distinct events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no event deposited energy.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates over the per-event totals.
    pub fn iter(&self) -> impl Iterator<Item = &EventEnergy> {
        self.events.iter()
    }

    /// Total energy of `event_id`, if it deposited any.
    #[must_use]
    pub fn get(&self, event_id: i64) -> Option<f64> {
        self.events
            .binary_search_by_key(&event_id, |e| e.event_id)
            .ok()
            .map(|i| self.events[i].energy)
    }

    /// Mean energy per event with deposits, or `None` when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_energy(&self) -> Option<f64> {
        if self.events.is_empty() {
            return None;
        }
        Some(self.events.iter().map(|e| e.energy).sum::<f64>() / self.events.len() as f64)
    }

    /// History-by-history standard deviation of the mean deposited energy.
    ///
    /// `sigma = sqrt((S2/D - (S1/D)^2) / (D - 1))` where `S1`, `S2` are the
    /// sums of per-event energies and squared energies and `D` is the
    /// detected-event count taken from the spectrum, so that the estimator
    /// shares its event universe with the efficiency.
    ///
    /// # Errors
    /// Returns [`Error::InsufficientSamples`] if `detected_events <= 1`, and
    /// [`Error::InconsistentEventCount`] if the estimate comes out negative
    /// (fewer detected events than events with deposits).
    #[allow(clippy::cast_precision_loss)]
    pub fn history_sigma(&self, detected_events: u64) -> Result<f64> {
        if detected_events <= 1 {
            return Err(Error::InsufficientSamples {
                detected: detected_events,
            });
        }
        let d = detected_events as f64;
        let (s1, s2) = self
            .events
            .iter()
            .fold((0.0, 0.0), |(s1, s2), e| (s1 + e.energy, s2 + e.energy * e.energy));
        let mean_sq = s2 / d;
        let sq_mean = (s1 / d).powi(2);
        let variance = (mean_sq - sq_mean) / (d - 1.0);
        if variance >= 0.0 {
            return Ok(variance.sqrt());
        }
        // With D at least the number of events the exact value is >= 0, so a
        // negative result is rounding on identical totals.
        if usize::try_from(detected_events).map_or(true, |count| count >= self.events.len()) {
            log::debug!("clamping variance {variance:e} to zero");
            return Ok(0.0);
        }
        Err(Error::InconsistentEventCount {
            detected: detected_events,
            events: self.events.len(),
        })
    }

    /// Computes mean and sigma together.
    #[must_use]
    pub fn statistics(&self, detected_events: u64) -> EventStatistics {
        EventStatistics {
            unique_events: self.events.len(),
            detected_events,
            mean_energy: self.mean_energy(),
            sigma: self.history_sigma(detected_events),
        }
    }
}

impl FromIterator<HitRecord> for EventTotals {
    fn from_iter<I: IntoIterator<Item = HitRecord>>(iter: I) -> Self {
        let hits: Vec<HitRecord> = iter.into_iter().collect();
        Self::aggregate(&hits)
    }
}

/// Summary statistics of the per-event energy totals.
#[derive(Debug, Clone, PartialEq)]
pub struct EventStatistics {
    /// Number of distinct events with deposits.
    pub unique_events: usize,
    /// Detected-event count used by the estimator.
    pub detected_events: u64,
    /// Mean energy per event with deposits.
    pub mean_energy: Option<f64>,
    /// History-by-history sigma, or the reason it is unavailable.
    pub sigma: Result<f64>,
}
