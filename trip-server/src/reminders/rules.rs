//! The reminder rule table.
//!
//! Every reminder the planner can produce is one row of [`RULES`]: an
//! anchor instant, a signed offset from it, a lead-time gate, a predicate on
//! the trip, and a content template. The planner evaluates every row the
//! same way, so adding a reminder means adding a row.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::Trip;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Delay between planning and the confirmation notification.
pub const CONFIRMATION_DELAY_SECS: i64 = 2;

/// Identifies one reminder rule. Stable across releases: it is part of the
/// reminder key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    Confirmation,
    OneWeek,
    Packing,
    TravelDayMorning,
    DayBefore,
    CheckIn,
    LuxuryEarlyArrival,
    ThreeHour,
    OneHour,
    GoodMorning,
    Boarding,
    Checklist,
    WeatherCheck,
    ReturnWelcome,
    Platform,
}

impl RuleId {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleId::Confirmation => "confirmation",
            RuleId::OneWeek => "one-week",
            RuleId::Packing => "packing",
            RuleId::TravelDayMorning => "travel-day-morning",
            RuleId::DayBefore => "day-before",
            RuleId::CheckIn => "check-in",
            RuleId::LuxuryEarlyArrival => "luxury-early-arrival",
            RuleId::ThreeHour => "three-hour",
            RuleId::OneHour => "one-hour",
            RuleId::GoodMorning => "good-morning",
            RuleId::Boarding => "boarding",
            RuleId::Checklist => "checklist",
            RuleId::WeatherCheck => "weather-check",
            RuleId::ReturnWelcome => "return-welcome",
            RuleId::Platform => "platform",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The instant a rule's offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// The moment of planning.
    Planning,
    /// The trip's departure.
    Departure,
    /// The trip's return; rules with this anchor only fire on round trips
    /// whose return is still ahead.
    Return,
}

/// Minimum time between planning and departure for a rule to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadGate {
    /// No lead-time requirement beyond the trigger being in the future.
    None,
    /// Lead time must be strictly greater than this many seconds.
    MoreThan(i64),
    /// Lead time must be at least this many seconds.
    AtLeast(i64),
}

impl LeadGate {
    fn admits(self, lead_secs: i64) -> bool {
        match self {
            LeadGate::None => true,
            LeadGate::MoreThan(secs) => lead_secs > secs,
            LeadGate::AtLeast(secs) => lead_secs >= secs,
        }
    }
}

/// Everything a rule needs to decide and render itself.
#[derive(Debug, Clone, Copy)]
pub struct ReminderContext<'a> {
    pub trip: &'a Trip,
    pub now: NaiveDateTime,
    pub departure: NaiveDateTime,
    pub return_at: Option<NaiveDateTime>,
}

impl ReminderContext<'_> {
    fn lead_secs(&self) -> i64 {
        self.departure.signed_duration_since(self.now).num_seconds()
    }

    fn departure_clock(&self) -> String {
        self.departure.format("%H:%M").to_string()
    }

    fn departure_day(&self) -> String {
        self.departure.format("%a %b %-d").to_string()
    }
}

/// Rendered notification text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderText {
    pub title: String,
    pub body: String,
}

impl ReminderText {
    fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// One row of the rule table.
#[derive(Debug, Clone, Copy)]
pub struct ReminderRule {
    pub id: RuleId,
    pub anchor: Anchor,
    /// Signed offset from the anchor; negative means "before".
    pub offset_secs: i64,
    pub lead: LeadGate,
    pub applies: fn(&Trip) -> bool,
    pub content: fn(&ReminderContext<'_>) -> ReminderText,
}

impl ReminderRule {
    /// When this rule would fire for `ctx`, if every gate passes.
    ///
    /// The trigger must be strictly after `ctx.now`; nothing past-dated is
    /// ever produced.
    pub fn trigger_at(&self, ctx: &ReminderContext<'_>) -> Option<NaiveDateTime> {
        if !(self.applies)(ctx.trip) || !self.lead.admits(ctx.lead_secs()) {
            return None;
        }

        let anchor = match self.anchor {
            Anchor::Planning => ctx.now,
            Anchor::Departure => ctx.departure,
            Anchor::Return => ctx.return_at.filter(|r| *r > ctx.now)?,
        };

        let trigger = anchor.checked_add_signed(Duration::seconds(self.offset_secs))?;
        (trigger > ctx.now).then_some(trigger)
    }
}

fn always(_: &Trip) -> bool {
    true
}

fn flight_only(trip: &Trip) -> bool {
    trip.is_flight()
}

fn luxury_bus_only(trip: &Trip) -> bool {
    trip.is_luxury_bus()
}

fn round_trip_only(trip: &Trip) -> bool {
    trip.return_date.as_deref().is_some_and(|d| !d.trim().is_empty())
}

fn has_platform(trip: &Trip) -> bool {
    trip.platform().is_some()
}

/// The full rule table, in tie-break order.
pub const RULES: &[ReminderRule] = &[
    ReminderRule {
        id: RuleId::Confirmation,
        anchor: Anchor::Planning,
        offset_secs: CONFIRMATION_DELAY_SECS,
        lead: LeadGate::None,
        applies: always,
        content: confirmation_text,
    },
    ReminderRule {
        id: RuleId::OneWeek,
        anchor: Anchor::Departure,
        offset_secs: -7 * DAY,
        lead: LeadGate::MoreThan(7 * DAY),
        applies: always,
        content: one_week_text,
    },
    ReminderRule {
        id: RuleId::Packing,
        anchor: Anchor::Departure,
        offset_secs: -DAY,
        lead: LeadGate::MoreThan(DAY),
        applies: always,
        content: packing_text,
    },
    ReminderRule {
        id: RuleId::TravelDayMorning,
        anchor: Anchor::Departure,
        offset_secs: -6 * HOUR,
        lead: LeadGate::MoreThan(6 * HOUR),
        applies: always,
        content: travel_day_text,
    },
    ReminderRule {
        id: RuleId::DayBefore,
        anchor: Anchor::Departure,
        offset_secs: -DAY,
        lead: LeadGate::MoreThan(DAY),
        applies: always,
        content: day_before_text,
    },
    ReminderRule {
        id: RuleId::CheckIn,
        anchor: Anchor::Departure,
        offset_secs: -DAY,
        lead: LeadGate::None,
        applies: flight_only,
        content: check_in_text,
    },
    ReminderRule {
        id: RuleId::LuxuryEarlyArrival,
        anchor: Anchor::Departure,
        offset_secs: -90 * MINUTE,
        lead: LeadGate::MoreThan(HOUR),
        applies: luxury_bus_only,
        content: luxury_text,
    },
    ReminderRule {
        id: RuleId::ThreeHour,
        anchor: Anchor::Departure,
        offset_secs: -3 * HOUR,
        lead: LeadGate::None,
        applies: always,
        content: three_hour_text,
    },
    ReminderRule {
        id: RuleId::OneHour,
        anchor: Anchor::Departure,
        offset_secs: -HOUR,
        lead: LeadGate::None,
        applies: always,
        content: one_hour_text,
    },
    ReminderRule {
        id: RuleId::GoodMorning,
        anchor: Anchor::Departure,
        offset_secs: -2 * HOUR,
        lead: LeadGate::None,
        applies: always,
        content: good_morning_text,
    },
    ReminderRule {
        id: RuleId::Boarding,
        anchor: Anchor::Departure,
        offset_secs: -30 * MINUTE,
        lead: LeadGate::None,
        applies: flight_only,
        content: boarding_text,
    },
    ReminderRule {
        id: RuleId::Checklist,
        anchor: Anchor::Departure,
        offset_secs: -8 * HOUR,
        lead: LeadGate::None,
        applies: always,
        content: checklist_text,
    },
    ReminderRule {
        id: RuleId::WeatherCheck,
        anchor: Anchor::Departure,
        offset_secs: -2 * DAY,
        lead: LeadGate::None,
        applies: always,
        content: weather_text,
    },
    ReminderRule {
        id: RuleId::ReturnWelcome,
        anchor: Anchor::Return,
        offset_secs: HOUR,
        lead: LeadGate::None,
        applies: round_trip_only,
        content: return_welcome_text,
    },
    ReminderRule {
        id: RuleId::Platform,
        anchor: Anchor::Departure,
        offset_secs: -10 * MINUTE,
        lead: LeadGate::AtLeast(10 * MINUTE),
        applies: has_platform,
        content: platform_text,
    },
];

/// Look up a rule by id.
pub fn rule(id: RuleId) -> Option<&'static ReminderRule> {
    RULES.iter().find(|r| r.id == id)
}

fn confirmation_text(ctx: &ReminderContext<'_>) -> ReminderText {
    ReminderText::new(
        "Trip saved",
        format!(
            "{} from {} to {} departs {} at {}. We'll remind you as it gets closer.",
            ctx.trip.service_label(),
            ctx.trip.origin,
            ctx.trip.destination,
            ctx.departure_day(),
            ctx.departure_clock(),
        ),
    )
}

fn one_week_text(ctx: &ReminderContext<'_>) -> ReminderText {
    ReminderText::new(
        "One week to go",
        format!(
            "Your trip to {} is a week away. Check your documents and bookings.",
            ctx.trip.destination
        ),
    )
}

fn packing_text(ctx: &ReminderContext<'_>) -> ReminderText {
    ReminderText::new(
        "Time to pack",
        format!(
            "You leave for {} tomorrow at {}. Start packing tonight.",
            ctx.trip.destination,
            ctx.departure_clock()
        ),
    )
}

fn travel_day_text(ctx: &ReminderContext<'_>) -> ReminderText {
    ReminderText::new(
        "Travel day",
        format!(
            "Today's the day: {} departs {} at {}.",
            ctx.trip.service_label(),
            ctx.trip.origin,
            ctx.departure_clock()
        ),
    )
}

fn day_before_text(ctx: &ReminderContext<'_>) -> ReminderText {
    ReminderText::new(
        "Departure in 24 hours",
        format!(
            "{} from {} to {} leaves in 24 hours.",
            ctx.trip.service_label(),
            ctx.trip.origin,
            ctx.trip.destination
        ),
    )
}

fn check_in_text(ctx: &ReminderContext<'_>) -> ReminderText {
    ReminderText::new(
        "Check-in is open",
        format!(
            "Online check-in for {} is open. Check in now to choose your seat.",
            ctx.trip.service_label()
        ),
    )
}

fn luxury_text(ctx: &ReminderContext<'_>) -> ReminderText {
    let company = ctx.trip.bus_company().unwrap_or("Your operator");
    ReminderText::new(
        "Arrive early for your luxury service",
        format!(
            "{company} luxury passengers board from the lounge. Arrive early for your {} departure.",
            ctx.departure_clock()
        ),
    )
}

fn three_hour_text(ctx: &ReminderContext<'_>) -> ReminderText {
    ReminderText::new(
        "Departure in 3 hours",
        format!(
            "{} leaves {} at {}. Plan when to head out.",
            ctx.trip.service_label(),
            ctx.trip.origin,
            ctx.departure_clock()
        ),
    )
}

fn one_hour_text(ctx: &ReminderContext<'_>) -> ReminderText {
    ReminderText::new(
        "Departure in 1 hour",
        format!(
            "{} to {} leaves at {}.",
            ctx.trip.service_label(),
            ctx.trip.destination,
            ctx.departure_clock()
        ),
    )
}

fn good_morning_text(ctx: &ReminderContext<'_>) -> ReminderText {
    ReminderText::new(
        "Good morning, traveler",
        format!(
            "Two hours until you leave {}. Double-check your ID and tickets.",
            ctx.trip.origin
        ),
    )
}

fn boarding_text(ctx: &ReminderContext<'_>) -> ReminderText {
    let body = match ctx.trip.platform() {
        Some(gate) => format!("Boarding for {} starts now at gate {gate}.", ctx.trip.service_label()),
        None => format!("Boarding for {} starts now. Head to your gate.", ctx.trip.service_label()),
    };
    ReminderText::new("Boarding now", body)
}

fn checklist_text(_ctx: &ReminderContext<'_>) -> ReminderText {
    ReminderText::new(
        "Review your checklist",
        "Departure is 8 hours away. Run through your travel checklist before you go.",
    )
}

fn weather_text(ctx: &ReminderContext<'_>) -> ReminderText {
    ReminderText::new(
        "Check the weather",
        format!(
            "Your trip to {} is in two days. Check the forecast before you pack.",
            ctx.trip.destination
        ),
    )
}

fn return_welcome_text(ctx: &ReminderContext<'_>) -> ReminderText {
    ReminderText::new(
        "Welcome home",
        format!("Welcome back from {}! We hope it was a great trip.", ctx.trip.destination),
    )
}

fn platform_text(ctx: &ReminderContext<'_>) -> ReminderText {
    let platform = ctx.trip.platform().unwrap_or_default();
    ReminderText::new(
        format!("Head to platform {platform}"),
        format!(
            "{} departs from platform {platform} in 10 minutes.",
            ctx.trip.service_label()
        ),
    )
}
