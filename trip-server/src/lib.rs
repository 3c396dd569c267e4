//! Trip timeline and reminder server.
//!
//! A web application that answers: "Where am I in my trip, and what should
//! I be reminded of, and when?"

pub mod clock;
pub mod config;
pub mod domain;
pub mod notify;
pub mod reminders;
pub mod store;
pub mod web;
