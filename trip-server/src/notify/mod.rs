//! Notification scheduling.
//!
//! The only part of the engine that performs I/O on behalf of reminders:
//! permission checks, registration and revocation with a notification host,
//! and persistence of the handles that were registered for each trip.

mod error;
mod host;
mod scheduler;
mod webhook;

pub use error::{HostError, ScheduleError};
pub use host::{
    HostBackend, NotificationHandle, NotificationHost, NotificationRequest, RecordingHost,
};
pub use scheduler::{NotificationScheduler, ScheduledNotificationSet, TripGuard};
pub use webhook::{WebhookConfig, WebhookHost};
