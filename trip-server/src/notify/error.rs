//! Notification error types.

use crate::store::StoreError;

use super::host::NotificationHandle;

/// Errors from a notification host.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The host has no notification with this handle
    #[error("notification {0} not found")]
    NotFound(NotificationHandle),

    /// The user has not granted permission to show notifications
    #[error("notification permission denied")]
    PermissionDenied,

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The host refused the request
    #[error("host rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Errors from scheduling or cancelling a trip's reminders.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// The host refused permission, nothing was scheduled
    #[error("notification permission denied")]
    PermissionDenied,

    /// Registering or revoking a notification failed
    #[error("notification host error: {0}")]
    Host(#[source] HostError),

    /// Reading or writing the scheduled set failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<HostError> for ScheduleError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::PermissionDenied => ScheduleError::PermissionDenied,
            other => ScheduleError::Host(other),
        }
    }
}
