//! Application state for the web layer.

use std::sync::Arc;

use tracing::{info, warn};

use crate::clock::TripClock;
use crate::domain::Trip;
use crate::notify::{
    HostBackend, NotificationHandle, NotificationScheduler, ScheduleError,
    ScheduledNotificationSet, TripGuard,
};
use crate::reminders::{ReminderSpec, plan};
use crate::store::{Repository, StoreError};

/// The scheduler as wired up by the server.
pub type Scheduler =
    NotificationScheduler<HostBackend, Arc<dyn Repository<ScheduledNotificationSet>>>;

/// A trip's reminders as planned and handed to the scheduler.
pub struct Rescheduled {
    pub specs: Vec<ReminderSpec>,
    pub outcome: Result<Vec<NotificationHandle>, ScheduleError>,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Stored trip records
    pub trips: Arc<dyn Repository<Trip>>,

    /// Reminder scheduler
    pub scheduler: Arc<Scheduler>,

    /// Clock used for planning and progress
    pub clock: TripClock,
}

impl AppState {
    /// Create a new app state.
    pub fn new(trips: Arc<dyn Repository<Trip>>, scheduler: Scheduler, clock: TripClock) -> Self {
        Self {
            trips,
            scheduler: Arc::new(scheduler),
            clock,
        }
    }

    /// Store `trip` and replace its reminders with a fresh plan.
    ///
    /// The write, the plan and the schedule happen under the trip's lock, so
    /// concurrent saves leave the host holding the reminders of whichever
    /// version was stored last. Only a failed trip write is an error here;
    /// scheduling failures are reported in the outcome.
    pub async fn save_trip(&self, trip: &Trip) -> Result<Rescheduled, StoreError> {
        let guard = self.scheduler.lock_trip(&trip.id).await;
        self.trips.put(&trip.id, trip.clone())?;
        info!(trip = %trip.id, "saved trip");
        Ok(self.reschedule_locked(&guard, trip).await)
    }

    /// Cancel a trip's reminders and delete it.
    ///
    /// Returns `Ok(false)` if there was no such trip.
    pub async fn delete_trip(&self, trip: &Trip) -> Result<bool, ScheduleError> {
        let guard = self.scheduler.lock_trip(&trip.id).await;
        self.scheduler.cancel_locked(&guard).await?;
        Ok(self.trips.remove(&trip.id)?)
    }

    /// Re-plan every stored trip against the current host.
    ///
    /// Used at start-up with the in-process host, whose pending reminders do
    /// not outlive the process. Handles persisted by the previous process are
    /// cancelled as already gone. Returns the number of reminders scheduled.
    pub async fn resume_reminders(&self) -> Result<usize, StoreError> {
        let mut total = 0;
        for id in self.trips.ids()? {
            let guard = self.scheduler.lock_trip(&id).await;
            let Some(trip) = self.trips.get(&id)? else {
                continue;
            };
            match self.reschedule_locked(&guard, &trip).await.outcome {
                Ok(handles) => total += handles.len(),
                Err(ScheduleError::Store(e)) => return Err(e),
                Err(e) => warn!(trip = %id, error = %e, "could not resume reminders"),
            }
        }
        info!(count = total, "resumed reminders");
        Ok(total)
    }

    async fn reschedule_locked(&self, guard: &TripGuard, trip: &Trip) -> Rescheduled {
        let specs = plan(trip, self.clock.now());
        let outcome = self.scheduler.schedule_locked(guard, &specs).await;
        Rescheduled { specs, outcome }
    }
}
