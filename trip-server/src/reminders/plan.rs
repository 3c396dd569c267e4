//! Reminder planning.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{Trip, TripId};

use super::rules::{RULES, ReminderContext, ReminderRule, RuleId};

/// Stable identity of one reminder: `{trip id}:{rule id}`.
///
/// Replanning the same trip yields the same keys, which is what lets a
/// reschedule supersede the previous set instead of adding to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderKey(String);

impl ReminderKey {
    pub fn new(trip: &TripId, rule: RuleId) -> Self {
        Self(format!("{}:{}", trip, rule))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReminderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A planned reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSpec {
    pub key: ReminderKey,
    pub rule: RuleId,
    pub title: String,
    pub body: String,
    pub trigger_at: NaiveDateTime,
}

impl ReminderSpec {
    fn from_rule(rule: &ReminderRule, ctx: &ReminderContext<'_>) -> Option<Self> {
        let trigger_at = rule.trigger_at(ctx)?;
        let text = (rule.content)(ctx);
        Some(Self {
            key: ReminderKey::new(&ctx.trip.id, rule.id),
            rule: rule.id,
            title: text.title,
            body: text.body,
            trigger_at,
        })
    }
}

/// Plan the reminder cascade for `trip` as of `now`.
///
/// Pure and deterministic. Returns an empty list once the trip has departed.
/// Every returned reminder fires strictly after `now`. The result is ordered
/// by trigger time, ties keeping rule-table order.
pub fn plan(trip: &Trip, now: NaiveDateTime) -> Vec<ReminderSpec> {
    let departure = trip.departure_instant(now);
    if departure <= now {
        return Vec::new();
    }

    let ctx = ReminderContext {
        trip,
        now,
        departure,
        return_at: trip.return_instant(now),
    };

    let mut specs: Vec<ReminderSpec> = RULES
        .iter()
        .filter_map(|rule| ReminderSpec::from_rule(rule, &ctx))
        .collect();
    specs.sort_by_key(|s| s.trigger_at);
    specs
}
