//! Data transfer objects for web responses.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::{Phase, Timeline, TripId, TripProgress};
use crate::notify::NotificationHandle;
use crate::reminders::ReminderSpec;

/// Stored trip ids.
#[derive(Debug, Serialize)]
pub struct TripListResponse {
    pub trips: Vec<TripId>,
}

/// A trip's phases and where the traveller is among them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineResponse {
    pub trip_id: TripId,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    /// Whether the departure date could not be parsed and was guessed
    pub departure_fallback: bool,
    pub phases: Vec<Phase>,
    pub progress: TripProgress,
}

impl TimelineResponse {
    pub fn new(timeline: &Timeline, progress: TripProgress) -> Self {
        Self {
            trip_id: timeline.trip_id().clone(),
            departure: timeline.departure(),
            arrival: timeline.arrival(),
            departure_fallback: timeline.uses_fallback_departure(),
            phases: timeline.phases().to_vec(),
            progress,
        }
    }
}

/// Reminders that would be scheduled for a trip right now.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemindersResponse {
    pub trip_id: TripId,
    pub reminders: Vec<ReminderSpec>,
}

/// A reminder registered with the notification host.
#[derive(Debug, Serialize)]
pub struct ScheduledReminder {
    pub handle: NotificationHandle,
    #[serde(flatten)]
    pub reminder: ReminderSpec,
}

/// Result of saving a trip.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTripResponse {
    pub trip_id: TripId,
    pub scheduled: Vec<ScheduledReminder>,
    /// Set when reminders could not be scheduled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
