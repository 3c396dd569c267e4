//! Trip progress against the wall clock.
//!
//! `TripProgress` is a pure projection of a phase list and the current
//! instant. It has no lifecycle of its own and is recomputed on every tick.

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use super::phase::Phase;

const MILLIS_PER_SECOND: i64 = 1_000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// Overall state of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TripStatus {
    Upcoming,
    InProgress,
    Completed,
}

impl TripStatus {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            TripStatus::Upcoming => "Upcoming",
            TripStatus::InProgress => "In progress",
            TripStatus::Completed => "Completed",
        }
    }
}

/// Time remaining until the next phase, split into whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    /// Decompose a millisecond duration. Negative durations count as zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use trip_server::domain::Countdown;
    ///
    /// let c = Countdown::from_millis(90_061_999);
    /// assert_eq!((c.days, c.hours, c.minutes, c.seconds), (1, 1, 1, 1));
    /// ```
    pub fn from_millis(millis: i64) -> Self {
        let millis = millis.max(0);
        Self {
            days: millis / MILLIS_PER_DAY,
            hours: (millis / MILLIS_PER_HOUR) % 24,
            minutes: (millis / MILLIS_PER_MINUTE) % 60,
            seconds: (millis / MILLIS_PER_SECOND) % 60,
        }
    }

    /// Countdown from `now` until `target`.
    pub fn until(target: NaiveDateTime, now: NaiveDateTime) -> Self {
        Self::from_millis(target.signed_duration_since(now).num_milliseconds())
    }

    /// Total whole seconds represented.
    pub fn total_seconds(&self) -> i64 {
        ((self.days * 24 + self.hours) * 60 + self.minutes) * 60 + self.seconds
    }

    /// Compact display such as `2d 03:15:09` or `03:15:09`.
    pub fn display(&self) -> String {
        let clock = format!("{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds);
        if self.days > 0 {
            format!("{}d {}", self.days, clock)
        } else {
            clock
        }
    }
}

/// Snapshot of a trip's progress at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripProgress {
    /// Greatest phase index whose time has been reached; `None` before the
    /// first phase. Serialized as `-1` in that case.
    #[serde(rename = "currentPhaseIndex", serialize_with = "serialize_phase_index")]
    pub current_phase: Option<usize>,
    pub status: TripStatus,
    /// 0-100
    pub percent: u8,
    #[serde(rename = "countdownToNext")]
    pub countdown: Option<Countdown>,
}

impl TripProgress {
    /// The current phase index with `-1` meaning "not started".
    pub fn current_phase_index(&self) -> i64 {
        self.current_phase.map_or(-1, |i| i as i64)
    }
}

fn serialize_phase_index<S: Serializer>(index: &Option<usize>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(index.map_or(-1, |i| i as i64))
}

/// Compute progress through `phases` at `now`.
///
/// - The current phase is the greatest index whose time is at or before
///   `now`.
/// - Status is upcoming before any phase, completed at the last one, and in
///   progress otherwise.
/// - Percent interpolates linearly between the first and last phase times.
/// - The countdown targets the phase after the current one, if any.
pub fn progress_at(phases: &[Phase], now: NaiveDateTime) -> TripProgress {
    let current = phases.iter().rposition(|p| p.time <= now);

    let status = match current {
        None => TripStatus::Upcoming,
        Some(i) if i + 1 == phases.len() => TripStatus::Completed,
        Some(_) => TripStatus::InProgress,
    };

    let next = current.map_or(0, |i| i + 1);
    let countdown = phases.get(next).map(|p| Countdown::until(p.time, now));

    TripProgress {
        current_phase: current,
        status,
        percent: percent_complete(phases, now),
        countdown,
    }
}

fn percent_complete(phases: &[Phase], now: NaiveDateTime) -> u8 {
    let (Some(first), Some(last)) = (phases.first(), phases.last()) else {
        return 0;
    };
    if now < first.time {
        return 0;
    }
    if now > last.time {
        return 100;
    }

    let span = last.time.signed_duration_since(first.time).num_milliseconds();
    if span <= 0 {
        return 100;
    }
    let elapsed = now.signed_duration_since(first.time).num_milliseconds();
    let percent = (elapsed as f64 / span as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TripId, Trip, derive_phases};
    use chrono::{Duration, NaiveDate};

    fn at(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, d)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    /// Flight 14:30 -> 17:00 on the 15th; phases from 11:30 to 17:00.
    fn phases() -> Vec<Phase> {
        let trip = Trip::flight(TripId::parse("f").unwrap(), "A", "B", "03/15/2026", "14:30");
        derive_phases(&trip, at(15, 14, 30, 0), at(15, 17, 0, 0))
    }

    #[test]
    fn countdown_decomposition() {
        assert_eq!(Countdown::from_millis(0), Countdown::default());
        assert_eq!(Countdown::from_millis(-5_000), Countdown::default());

        let c = Countdown::from_millis(999);
        assert_eq!(c.seconds, 0);

        let c = Countdown::from_millis(3 * MILLIS_PER_DAY + 23 * MILLIS_PER_HOUR + 59 * MILLIS_PER_MINUTE + 59_999);
        assert_eq!((c.days, c.hours, c.minutes, c.seconds), (3, 23, 59, 59));

        let c = Countdown::from_millis(MILLIS_PER_DAY);
        assert_eq!((c.days, c.hours, c.minutes, c.seconds), (1, 0, 0, 0));
    }

    #[test]
    fn countdown_display() {
        assert_eq!(Countdown::from_millis(61_000).display(), "00:01:01");
        assert_eq!(
            Countdown::from_millis(2 * MILLIS_PER_DAY + 5 * MILLIS_PER_HOUR).display(),
            "2d 05:00:00"
        );
    }

    #[test]
    fn before_first_phase_is_upcoming() {
        let progress = progress_at(&phases(), at(15, 9, 0, 0));

        assert_eq!(progress.current_phase, None);
        assert_eq!(progress.current_phase_index(), -1);
        assert_eq!(progress.status, TripStatus::Upcoming);
        assert_eq!(progress.percent, 0);
        // Counting down to "Leave Home" at 11:30
        let c = progress.countdown.unwrap();
        assert_eq!((c.days, c.hours, c.minutes, c.seconds), (0, 2, 30, 0));
    }

    #[test]
    fn between_phases_is_in_progress() {
        // Security is at 13:00, boarding at 14:00
        let progress = progress_at(&phases(), at(15, 13, 20, 15));

        assert_eq!(progress.current_phase, Some(2));
        assert_eq!(progress.status, TripStatus::InProgress);
        let c = progress.countdown.unwrap();
        assert_eq!((c.days, c.hours, c.minutes, c.seconds), (0, 0, 39, 45));
    }

    #[test]
    fn phase_is_current_from_its_exact_time() {
        let progress = progress_at(&phases(), at(15, 14, 30, 0));
        assert_eq!(progress.current_phase, Some(4));
    }

    #[test]
    fn percent_interpolates_between_first_and_last() {
        // 11:30 -> 17:00 is 330 minutes; 14:15 is 165 minutes in
        assert_eq!(progress_at(&phases(), at(15, 14, 15, 0)).percent, 50);
        assert_eq!(progress_at(&phases(), at(15, 11, 30, 0)).percent, 0);
        assert_eq!(progress_at(&phases(), at(15, 17, 0, 0)).percent, 100);
    }

    #[test]
    fn after_last_phase_is_completed() {
        let progress = progress_at(&phases(), at(16, 0, 0, 0));

        assert_eq!(progress.current_phase, Some(6));
        assert_eq!(progress.status, TripStatus::Completed);
        assert_eq!(progress.percent, 100);
        assert_eq!(progress.countdown, None);
    }

    #[test]
    fn empty_phase_list() {
        let progress = progress_at(&[], at(15, 12, 0, 0));
        assert_eq!(progress.status, TripStatus::Upcoming);
        assert_eq!(progress.percent, 0);
        assert_eq!(progress.countdown, None);
    }

    #[test]
    fn serializes_with_record_field_names() {
        let json = serde_json::to_value(progress_at(&phases(), at(15, 9, 0, 0))).unwrap();
        assert_eq!(json["currentPhaseIndex"], -1);
        assert_eq!(json["status"], "upcoming");
        assert_eq!(json["percent"], 0);
        assert_eq!(json["countdownToNext"]["hours"], 2);

        let json = serde_json::to_value(progress_at(&phases(), at(16, 0, 0, 0))).unwrap();
        assert_eq!(json["currentPhaseIndex"], 6);
        assert_eq!(json["status"], "completed");
        assert!(json["countdownToNext"].is_null());
    }

    #[test]
    fn countdown_never_negative_with_unordered_phases() {
        let mut unordered = phases();
        // Arrival earlier than departure
        let departure = unordered[4].time;
        unordered[6].time = departure - Duration::hours(1);
        unordered[5].time = departure - Duration::minutes(30);

        let progress = progress_at(&unordered, departure);
        assert_eq!(progress.current_phase, Some(6));
        assert_eq!(progress.status, TripStatus::Completed);
        assert_eq!(progress.countdown, None);
    }
}
