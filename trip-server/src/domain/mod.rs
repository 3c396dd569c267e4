//! Domain types for the trip timeline engine.
//!
//! This module contains the trip record, the date/time parser, phase
//! derivation and progress tracking. Everything here is synchronous and
//! pure: no I/O, no clock reads, no logging.

mod error;
mod phase;
mod progress;
mod time;
mod timeline;
mod trip;

pub use error::DomainError;
pub use phase::{Phase, PhaseKind, derive_phases};
pub use progress::{Countdown, TripProgress, TripStatus, progress_at};
pub use time::{fallback_instant, noon, parse_clock_time, parse_trip_date, parse_trip_instant};
pub use timeline::Timeline;
pub use trip::{InvalidTripId, TransportKind, TransportMode, Trip, TripId};
