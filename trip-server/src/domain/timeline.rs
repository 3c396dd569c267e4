//! A trip's derived timeline.

use chrono::NaiveDateTime;

use super::phase::{Phase, PhaseKind, derive_phases};
use super::progress::{TripProgress, progress_at};
use super::time::parse_trip_date;
use super::trip::{Trip, TripId};

/// Parsed instants and phases for one version of a trip.
///
/// A timeline is derived once per trip edit and then shared read-only with
/// every consumer (the ticking clock, HTTP responses). It is rebuilt, never
/// patched, when the trip changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    trip_id: TripId,
    departure: NaiveDateTime,
    arrival: NaiveDateTime,
    phases: Vec<Phase>,
    departure_fallback: bool,
}

impl Timeline {
    /// Derive the timeline for `trip`. `now` only matters if the trip's dates
    /// are unparseable and the fallback instant is used.
    pub fn build(trip: &Trip, now: NaiveDateTime) -> Self {
        let departure = trip.departure_instant(now);
        let arrival = trip.arrival_instant(now);
        Self {
            trip_id: trip.id.clone(),
            departure,
            arrival,
            phases: derive_phases(trip, departure, arrival),
            departure_fallback: parse_trip_date(&trip.departure_date).is_none(),
        }
    }

    pub fn trip_id(&self) -> &TripId {
        &self.trip_id
    }

    pub fn departure(&self) -> NaiveDateTime {
        self.departure
    }

    pub fn arrival(&self) -> NaiveDateTime {
        self.arrival
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// True when the departure date was unreadable and the fallback instant
    /// stands in for it.
    pub fn uses_fallback_departure(&self) -> bool {
        self.departure_fallback
    }

    /// The departure phase: the one whose time is the departure instant.
    ///
    /// Phase lists vary in length by mode, so this is the only safe way to
    /// locate it.
    pub fn departure_phase(&self) -> Option<(usize, &Phase)> {
        self.phases
            .iter()
            .enumerate()
            .find(|(_, p)| p.id == PhaseKind::Departure && p.time == self.departure)
    }

    /// Progress snapshot at `now`.
    pub fn progress_at(&self, now: NaiveDateTime) -> TripProgress {
        progress_at(&self.phases, now)
    }
}
