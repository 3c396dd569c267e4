//! Clock sources and the per-trip progress ticker.
//!
//! [`Clock`] abstracts "what time is it" so the rest of the engine can be
//! driven by a virtual clock in tests. [`TripClock`] turns a clock and a
//! [`Timeline`] into a stream of [`TripProgress`] snapshots delivered to a
//! callback on a single background task.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::domain::{Timeline, TripProgress};

/// Source of the current local instant.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> NaiveDateTime;
}

/// The local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Jump to `instant`.
    pub fn set(&self, instant: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }

    /// Move forward (or backward, for a negative delta) by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Default tick period.
const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Configuration for [`TripClock`].
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Period between progress snapshots
    pub tick: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { tick: DEFAULT_TICK }
    }
}

impl ClockConfig {
    /// Set the tick period. Zero is clamped to one millisecond.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }
}

/// Projects timelines onto the current instant, once or periodically.
#[derive(Clone)]
pub struct TripClock {
    clock: Arc<dyn Clock>,
    tick: Duration,
}

impl std::fmt::Debug for TripClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TripClock")
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl TripClock {
    pub fn new(clock: Arc<dyn Clock>, config: &ClockConfig) -> Self {
        Self {
            clock,
            tick: config.tick.max(Duration::from_millis(1)),
        }
    }

    /// The current instant according to the underlying clock.
    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Progress of `timeline` right now.
    pub fn snapshot(&self, timeline: &Timeline) -> TripProgress {
        timeline.progress_at(self.clock.now())
    }

    /// Deliver a progress snapshot immediately and then once per tick.
    ///
    /// The callback runs on a single spawned task, so invocations never
    /// overlap; ticks missed while the callback is slow are skipped rather
    /// than bunched up. Must be called from within a tokio runtime.
    pub fn subscribe<F>(&self, timeline: Arc<Timeline>, mut callback: F) -> Subscription
    where
        F: FnMut(TripProgress) + Send + 'static,
    {
        let clock = Arc::clone(&self.clock);
        let tick = self.tick;
        let trip_id = timeline.trip_id().clone();

        debug!(trip = %trip_id, ?tick, "starting progress ticker");

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // The first tick completes immediately.
                interval.tick().await;
                callback(timeline.progress_at(clock.now()));
            }
        });

        Subscription {
            task: Some(task),
            trip: trip_id.to_string(),
        }
    }
}

/// Handle to a running progress ticker. Dropping it stops the ticker.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
    trip: String,
}

impl Subscription {
    /// Stop the ticker. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(trip = %self.trip, "stopped progress ticker");
        }
    }

    /// Whether the ticker task is still running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Trip, TripId, TripStatus};
    use chrono::NaiveDate;
    use tokio::sync::mpsc;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn timeline() -> Arc<Timeline> {
        let trip = Trip::bus(
            TripId::parse("bus-1").unwrap(),
            "Lima",
            "Ica",
            "06/01/2030",
            "10:00",
        )
        .with_arrival("06/01/2030", "14:00");
        Arc::new(Timeline::build(&trip, at(8, 0)))
    }

    #[test]
    fn manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(at(8, 0));
        assert_eq!(clock.now(), at(8, 0));

        clock.advance(TimeDelta::minutes(90));
        assert_eq!(clock.now(), at(9, 30));

        let shared = clock.clone();
        shared.set(at(12, 0));
        assert_eq!(clock.now(), at(12, 0));
    }

    #[test]
    fn zero_tick_is_clamped() {
        let config = ClockConfig::default().with_tick(Duration::ZERO);
        assert_eq!(config.tick, Duration::from_millis(1));
    }

    #[test]
    fn snapshot_reads_the_clock() {
        let manual = ManualClock::new(at(6, 0));
        let clock = TripClock::new(Arc::new(manual.clone()), &ClockConfig::default());
        let timeline = timeline();

        assert_eq!(clock.snapshot(&timeline).status, TripStatus::Upcoming);

        manual.set(at(11, 0));
        assert_eq!(clock.snapshot(&timeline).status, TripStatus::InProgress);

        manual.set(at(15, 0));
        let done = clock.snapshot(&timeline);
        assert_eq!(done.status, TripStatus::Completed);
        assert_eq!(done.percent, 100);
        assert!(done.countdown.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_delivers_immediately_then_per_tick() {
        let manual = ManualClock::new(at(6, 0));
        let clock = TripClock::new(
            Arc::new(manual.clone()),
            &ClockConfig::default().with_tick(Duration::from_secs(1)),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        let sub = clock.subscribe(timeline(), move |p| {
            let _ = tx.send(p);
        });
        assert!(sub.is_active());

        let first = rx.recv().await.unwrap();
        assert_eq!(first.status, TripStatus::Upcoming);

        manual.set(at(11, 0));
        let second = rx.recv().await.unwrap();
        assert_eq!(second.status, TripStatus::InProgress);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_subscription_stops_ticks() {
        let clock = TripClock::new(
            Arc::new(ManualClock::new(at(6, 0))),
            &ClockConfig::default(),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        let sub = clock.subscribe(timeline(), move |p| {
            let _ = tx.send(p);
        });
        rx.recv().await.unwrap();
        drop(sub);

        // The sender lives in the aborted task, so the channel closes.
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_is_idempotent() {
        let clock = TripClock::new(Arc::new(SystemClock), &ClockConfig::default());
        let mut sub = clock.subscribe(timeline(), |_| {});
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
    }
}
