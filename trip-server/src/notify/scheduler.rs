//! Reminder scheduling against a notification host.
//!
//! The scheduler owns the mapping from a trip to the host handles of its
//! pending reminders. Every schedule first cancels the trip's previous set,
//! so editing a trip never leaves orphaned reminders behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::domain::TripId;
use crate::reminders::ReminderSpec;
use crate::store::Repository;

use super::error::{HostError, ScheduleError};
use super::host::{NotificationHandle, NotificationHost, NotificationRequest};

/// Host handles of the reminders currently scheduled for one trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledNotificationSet {
    pub trip_id: TripId,
    pub handles: Vec<NotificationHandle>,
}

/// Exclusive hold on one trip's reminders, released on drop.
pub struct TripGuard {
    trip_id: TripId,
    _guard: OwnedMutexGuard<()>,
}

impl TripGuard {
    pub fn trip_id(&self) -> &TripId {
        &self.trip_id
    }
}

/// Registers and revokes a trip's reminders, one trip at a time.
///
/// Calls for the same trip are serialized; calls for different trips run
/// concurrently.
pub struct NotificationScheduler<H, R> {
    host: H,
    store: R,
    locks: Mutex<HashMap<TripId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<H, R> NotificationScheduler<H, R>
where
    H: NotificationHost,
    R: Repository<ScheduledNotificationSet>,
{
    pub fn new(host: H, store: R) -> Self {
        Self {
            host,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Lock guarding one trip. Entries nobody holds are pruned on the way.
    fn trip_lock(&self, trip_id: &TripId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(trip_id.clone()).or_default())
    }

    /// Wait for exclusive access to one trip's reminders.
    ///
    /// Callers that must keep other state in step with the scheduled set
    /// (the stored trip record, say) hold the guard across both updates.
    pub async fn lock_trip(&self, trip_id: &TripId) -> TripGuard {
        let guard = self.trip_lock(trip_id).lock_owned().await;
        TripGuard {
            trip_id: trip_id.clone(),
            _guard: guard,
        }
    }

    /// Replace the trip's scheduled reminders with `specs`.
    ///
    /// Cancels the previous set, checks permission, registers each spec and
    /// persists the new handles. If a registration fails, the handles
    /// registered so far are revoked and nothing is persisted.
    pub async fn schedule(
        &self,
        trip_id: &TripId,
        specs: &[ReminderSpec],
    ) -> Result<Vec<NotificationHandle>, ScheduleError> {
        let guard = self.lock_trip(trip_id).await;
        self.schedule_locked(&guard, specs).await
    }

    /// [`schedule`](Self::schedule) for a trip the caller already holds.
    pub async fn schedule_locked(
        &self,
        guard: &TripGuard,
        specs: &[ReminderSpec],
    ) -> Result<Vec<NotificationHandle>, ScheduleError> {
        let trip_id = guard.trip_id();
        self.cancel_locked(guard).await?;

        if !self.host.check_permission().await? {
            warn!(trip = %trip_id, "notification permission denied");
            return Err(ScheduleError::PermissionDenied);
        }

        let mut handles = Vec::with_capacity(specs.len());
        for spec in specs {
            let request = NotificationRequest::from(spec);
            match self.host.register(&request).await {
                Ok(handle) => {
                    debug!(trip = %trip_id, key = %spec.key, %handle, "registered reminder");
                    handles.push(handle);
                }
                Err(e) => {
                    warn!(trip = %trip_id, key = %spec.key, error = %e, "registration failed, rolling back");
                    self.roll_back(trip_id, &handles).await;
                    return Err(e.into());
                }
            }
        }

        if let Err(e) = self.store.put(
            trip_id,
            ScheduledNotificationSet {
                trip_id: trip_id.clone(),
                handles: handles.clone(),
            },
        ) {
            self.roll_back(trip_id, &handles).await;
            return Err(e.into());
        }

        info!(trip = %trip_id, count = handles.len(), "scheduled reminders");
        Ok(handles)
    }

    /// Revoke the trip's scheduled reminders and forget them.
    ///
    /// A trip with nothing scheduled is a no-op. Handles the host no longer
    /// knows count as revoked.
    pub async fn cancel_for_trip(&self, trip_id: &TripId) -> Result<(), ScheduleError> {
        let guard = self.lock_trip(trip_id).await;
        self.cancel_locked(&guard).await
    }

    /// [`cancel_for_trip`](Self::cancel_for_trip) for a trip the caller
    /// already holds.
    pub async fn cancel_locked(&self, guard: &TripGuard) -> Result<(), ScheduleError> {
        let trip_id = guard.trip_id();
        let Some(set) = self.store.get(trip_id)? else {
            return Ok(());
        };

        for handle in &set.handles {
            match self.host.revoke(handle).await {
                Ok(()) => {}
                Err(HostError::NotFound(_)) => {
                    debug!(trip = %trip_id, %handle, "reminder already gone");
                }
                Err(e) => {
                    // Keep the record so a retry can finish the job.
                    warn!(trip = %trip_id, %handle, error = %e, "failed to revoke reminder");
                    return Err(e.into());
                }
            }
        }

        self.store.remove(trip_id)?;
        info!(trip = %trip_id, count = set.handles.len(), "cancelled reminders");
        Ok(())
    }

    async fn roll_back(&self, trip_id: &TripId, handles: &[NotificationHandle]) {
        for handle in handles {
            if let Err(e) = self.host.revoke(handle).await {
                warn!(trip = %trip_id, %handle, error = %e, "rollback could not revoke reminder");
            }
        }
    }
}
