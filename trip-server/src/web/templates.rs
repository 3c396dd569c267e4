//! Askama templates for the web frontend.

use askama::Template;

use crate::domain::{Timeline, Trip, TripProgress};

/// Display format for phase times, e.g. "Sat 1 Jun 10:00".
const PHASE_TIME_FORMAT: &str = "%a %-d %b %H:%M";

/// Timeline page for one trip.
#[derive(Template)]
#[template(path = "timeline.html")]
pub struct TimelineTemplate {
    pub trip_id: String,
    pub route: String,
    pub service: String,
    pub status: String,
    pub percent: u8,
    pub countdown: String,
    pub phases: Vec<PhaseView>,
    pub stream_url: String,
}

impl TimelineTemplate {
    pub fn new(trip: &Trip, timeline: &Timeline, progress: &TripProgress) -> Self {
        let phases = timeline
            .phases()
            .iter()
            .enumerate()
            .map(|(i, phase)| PhaseView {
                icon: phase.icon.to_string(),
                title: phase.title.to_string(),
                time: phase.time.format(PHASE_TIME_FORMAT).to_string(),
                detail: phase.detail.clone(),
                state: PhaseState::of(i, progress.current_phase).css_class(),
            })
            .collect();

        Self {
            trip_id: trip.id.to_string(),
            route: format!("{} → {}", trip.origin, trip.destination),
            service: trip.service_label(),
            status: progress.status.label().to_string(),
            percent: progress.percent,
            countdown: progress
                .countdown
                .map(|c| c.display())
                .unwrap_or_default(),
            phases,
            stream_url: format!("/trips/{}/progress/stream", trip.id),
        }
    }
}

/// Where a phase sits relative to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseState {
    Done,
    Current,
    Upcoming,
}

impl PhaseState {
    fn of(index: usize, current: Option<usize>) -> Self {
        match current {
            Some(c) if index < c => PhaseState::Done,
            Some(c) if index == c => PhaseState::Current,
            _ => PhaseState::Upcoming,
        }
    }

    fn css_class(self) -> &'static str {
        match self {
            PhaseState::Done => "done",
            PhaseState::Current => "current",
            PhaseState::Upcoming => "upcoming",
        }
    }
}

/// Phase view model for templates.
#[derive(Debug, Clone)]
pub struct PhaseView {
    pub icon: String,
    pub title: String,
    pub time: String,
    pub detail: String,
    /// `done`, `current` or `upcoming`
    pub state: &'static str,
}
