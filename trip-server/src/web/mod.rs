//! Web layer for the trip timeline engine.
//!
//! Provides HTTP endpoints for storing trips, inspecting their timelines and
//! reminders, and following progress live.

mod dto;
mod routes;
mod state;
pub mod templates;

#[cfg(test)]
mod tests;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::{AppState, Rescheduled, Scheduler};
pub use templates::*;
