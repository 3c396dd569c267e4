//! Reminder planning.
//!
//! Turns a trip and the current instant into the list of reminders that
//! should be pending for it. Planning is pure: it performs no I/O and reads
//! no clock, so the rules can be tested in isolation. Scheduling the result
//! with a notification host is the job of the `notify` module.

mod plan;
mod rules;

pub use plan::{ReminderKey, ReminderSpec, plan};
pub use rules::{
    Anchor, CONFIRMATION_DELAY_SECS, LeadGate, RULES, ReminderContext, ReminderRule, ReminderText,
    RuleId, rule,
};
