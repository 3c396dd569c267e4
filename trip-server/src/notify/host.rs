//! Notification hosts.
//!
//! A host is whatever actually shows the notification to the traveller at
//! the trigger time: a push gateway, a desktop daemon, or (in tests and the
//! default server setup) an in-process recorder.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::reminders::{ReminderKey, ReminderSpec};

use super::error::HostError;
use super::webhook::WebhookHost;

/// Revoked handles a `RecordingHost` remembers; older ones are forgotten.
const REVOKED_HISTORY: usize = 256;

/// Opaque id the host assigned to a registered notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationHandle(String);

impl NotificationHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the host is asked to show, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub key: ReminderKey,
    pub title: String,
    pub body: String,
    pub trigger_at: NaiveDateTime,
}

impl From<&ReminderSpec> for NotificationRequest {
    fn from(spec: &ReminderSpec) -> Self {
        Self {
            key: spec.key.clone(),
            title: spec.title.clone(),
            body: spec.body.clone(),
            trigger_at: spec.trigger_at,
        }
    }
}

/// A backend able to show scheduled notifications.
pub trait NotificationHost: Send + Sync {
    /// Whether the host may show notifications at all.
    fn check_permission(&self) -> impl Future<Output = Result<bool, HostError>> + Send;

    /// Register a notification to fire at `request.trigger_at`.
    fn register(
        &self,
        request: &NotificationRequest,
    ) -> impl Future<Output = Result<NotificationHandle, HostError>> + Send;

    /// Withdraw a previously registered notification.
    ///
    /// Returns [`HostError::NotFound`] if the host no longer knows the
    /// handle, e.g. because it already fired.
    fn revoke(
        &self,
        handle: &NotificationHandle,
    ) -> impl Future<Output = Result<(), HostError>> + Send;
}

impl<H: NotificationHost> NotificationHost for Arc<H> {
    fn check_permission(&self) -> impl Future<Output = Result<bool, HostError>> + Send {
        (**self).check_permission()
    }

    fn register(
        &self,
        request: &NotificationRequest,
    ) -> impl Future<Output = Result<NotificationHandle, HostError>> + Send {
        (**self).register(request)
    }

    fn revoke(
        &self,
        handle: &NotificationHandle,
    ) -> impl Future<Output = Result<(), HostError>> + Send {
        (**self).revoke(handle)
    }
}

#[derive(Debug, Default)]
struct Recorded {
    next_id: u64,
    pending: BTreeMap<NotificationHandle, NotificationRequest>,
    permission_denied: bool,
    /// Registrations left before every further one fails
    registrations_left: Option<usize>,
    /// Most recent revocations, oldest first
    revoked: VecDeque<NotificationHandle>,
}

/// In-process host that keeps pending notifications in memory.
///
/// Clones share state, so a test can keep one clone to inspect what the
/// scheduler registered through another.
///
/// Handles are `<reminder key>#<sequence>`. The key names the trip, so a
/// handle persisted by an earlier process can never revoke another trip's
/// reminder after the sequence restarts.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    state: Arc<Mutex<Recorded>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make permission checks fail (or succeed again).
    pub fn deny_permission(&self, denied: bool) {
        self.lock().permission_denied = denied;
    }

    /// Let `n` more registrations succeed, then reject the rest.
    pub fn fail_registrations_after(&self, n: usize) {
        self.lock().registrations_left = Some(n);
    }

    /// Pending notifications in handle order.
    pub fn pending(&self) -> Vec<(NotificationHandle, NotificationRequest)> {
        self.lock()
            .pending
            .iter()
            .map(|(h, r)| (h.clone(), r.clone()))
            .collect()
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// The most recently revoked handles, in order.
    pub fn revoked(&self) -> Vec<NotificationHandle> {
        self.lock().revoked.iter().cloned().collect()
    }

    /// Remove and return every pending notification due at or before `now`,
    /// ordered by trigger time.
    pub fn fire_due(&self, now: NaiveDateTime) -> Vec<NotificationRequest> {
        let mut state = self.lock();
        let due: Vec<NotificationHandle> = state
            .pending
            .iter()
            .filter(|(_, r)| r.trigger_at <= now)
            .map(|(h, _)| h.clone())
            .collect();

        let mut fired: Vec<NotificationRequest> = due
            .iter()
            .filter_map(|h| state.pending.remove(h))
            .collect();
        fired.sort_by_key(|r| r.trigger_at);

        for request in &fired {
            info!(key = %request.key, title = %request.title, "{}", request.body);
        }
        fired
    }
}

impl NotificationHost for RecordingHost {
    async fn check_permission(&self) -> Result<bool, HostError> {
        Ok(!self.lock().permission_denied)
    }

    async fn register(&self, request: &NotificationRequest) -> Result<NotificationHandle, HostError> {
        let mut state = self.lock();
        if state.permission_denied {
            return Err(HostError::PermissionDenied);
        }
        if let Some(left) = state.registrations_left.as_mut() {
            if *left == 0 {
                return Err(HostError::Rejected {
                    status: 503,
                    message: format!("registration of {} refused", request.key),
                });
            }
            *left -= 1;
        }

        state.next_id += 1;
        let handle = NotificationHandle::new(format!("{}#{}", request.key, state.next_id));
        state.pending.insert(handle.clone(), request.clone());
        debug!(%handle, key = %request.key, trigger_at = %request.trigger_at, "recorded notification");
        Ok(handle)
    }

    async fn revoke(&self, handle: &NotificationHandle) -> Result<(), HostError> {
        let mut state = self.lock();
        if state.pending.remove(handle).is_none() {
            return Err(HostError::NotFound(handle.clone()));
        }
        if state.revoked.len() == REVOKED_HISTORY {
            state.revoked.pop_front();
        }
        state.revoked.push_back(handle.clone());
        Ok(())
    }
}

/// The host chosen at start-up.
#[derive(Debug, Clone)]
pub enum HostBackend {
    Recording(RecordingHost),
    Webhook(WebhookHost),
}

impl NotificationHost for HostBackend {
    async fn check_permission(&self) -> Result<bool, HostError> {
        match self {
            HostBackend::Recording(host) => host.check_permission().await,
            HostBackend::Webhook(host) => host.check_permission().await,
        }
    }

    async fn register(&self, request: &NotificationRequest) -> Result<NotificationHandle, HostError> {
        match self {
            HostBackend::Recording(host) => host.register(request).await,
            HostBackend::Webhook(host) => host.register(request).await,
        }
    }

    async fn revoke(&self, handle: &NotificationHandle) -> Result<(), HostError> {
        match self {
            HostBackend::Recording(host) => host.revoke(handle).await,
            HostBackend::Webhook(host) => host.revoke(handle).await,
        }
    }
}
