//! Itinerary phases.
//!
//! A trip is presented as a fixed sequence of phases, from leaving home to
//! arriving at the destination. The pre-departure phases sit at fixed
//! offsets before departure that depend on the mode of transport; flights
//! get an extra security checkpoint.
//!
//! The sequence is returned in its fixed display order. It is not sorted:
//! for unrealistically tight itineraries (a 20-minute trip, an arrival
//! before departure) phase times can be out of chronological order.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use super::trip::{TransportKind, Trip};

/// One named step of an itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseKind {
    LeaveHome,
    ArriveTerminal,
    SecurityCheckpoint,
    BoardingBegins,
    Departure,
    InTransit,
    Arrival,
}

/// Minutes before departure for each pre-departure phase of a flight.
const FLIGHT_LEAD_MINUTES: &[(PhaseKind, i64)] = &[
    (PhaseKind::LeaveHome, 180),
    (PhaseKind::ArriveTerminal, 120),
    (PhaseKind::SecurityCheckpoint, 90),
    (PhaseKind::BoardingBegins, 30),
    (PhaseKind::Departure, 0),
];

/// Minutes before departure for each pre-departure phase of a bus trip.
const BUS_LEAD_MINUTES: &[(PhaseKind, i64)] = &[
    (PhaseKind::LeaveHome, 90),
    (PhaseKind::ArriveTerminal, 45),
    (PhaseKind::BoardingBegins, 30),
    (PhaseKind::Departure, 0),
];

impl PhaseKind {
    /// Stable identifier, as serialized.
    pub fn id(self) -> &'static str {
        match self {
            PhaseKind::LeaveHome => "leave-home",
            PhaseKind::ArriveTerminal => "arrive-terminal",
            PhaseKind::SecurityCheckpoint => "security-checkpoint",
            PhaseKind::BoardingBegins => "boarding-begins",
            PhaseKind::Departure => "departure",
            PhaseKind::InTransit => "in-transit",
            PhaseKind::Arrival => "arrival",
        }
    }

    /// Display title.
    pub fn title(self) -> &'static str {
        match self {
            PhaseKind::LeaveHome => "Leave Home",
            PhaseKind::ArriveTerminal => "Arrive at Terminal",
            PhaseKind::SecurityCheckpoint => "Security Checkpoint",
            PhaseKind::BoardingBegins => "Boarding Begins",
            PhaseKind::Departure => "Departure",
            PhaseKind::InTransit => "In Transit",
            PhaseKind::Arrival => "Arrival",
        }
    }

    /// Icon name (Material Symbols) for this phase and mode.
    pub fn icon(self, kind: TransportKind) -> &'static str {
        match (self, kind) {
            (PhaseKind::LeaveHome, _) => "home",
            (PhaseKind::ArriveTerminal, TransportKind::Flight) => "local_airport",
            (PhaseKind::ArriveTerminal, TransportKind::Bus) => "storefront",
            (PhaseKind::SecurityCheckpoint, _) => "security",
            (PhaseKind::BoardingBegins, _) => "login",
            (PhaseKind::Departure, TransportKind::Flight) => "flight_takeoff",
            (PhaseKind::Departure, TransportKind::Bus) => "departure_board",
            (PhaseKind::InTransit, TransportKind::Flight) => "flight",
            (PhaseKind::InTransit, TransportKind::Bus) => "directions_bus",
            (PhaseKind::Arrival, TransportKind::Flight) => "flight_land",
            (PhaseKind::Arrival, TransportKind::Bus) => "place",
        }
    }
}

/// A phase with its absolute time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phase {
    pub id: PhaseKind,
    pub icon: &'static str,
    pub title: &'static str,
    pub time: NaiveDateTime,
    pub detail: String,
}

impl Phase {
    fn new(kind: PhaseKind, trip: &Trip, time: NaiveDateTime) -> Self {
        Self {
            id: kind,
            icon: kind.icon(trip.kind()),
            title: kind.title(),
            time,
            detail: phase_detail(kind, trip),
        }
    }
}

/// Derive the phase list for a trip from its departure and arrival instants.
///
/// The order is always leave home, arrive at terminal, security (flights
/// only), boarding, departure, in transit, arrival. In-transit sits at the
/// midpoint between departure and arrival. No clamping is applied.
pub fn derive_phases(trip: &Trip, departure: NaiveDateTime, arrival: NaiveDateTime) -> Vec<Phase> {
    let leads = match trip.kind() {
        TransportKind::Flight => FLIGHT_LEAD_MINUTES,
        TransportKind::Bus => BUS_LEAD_MINUTES,
    };

    let mut phases = Vec::with_capacity(leads.len() + 2);
    for &(kind, minutes) in leads {
        phases.push(Phase::new(kind, trip, departure - Duration::minutes(minutes)));
    }

    let midpoint = departure + (arrival - departure) / 2;
    phases.push(Phase::new(PhaseKind::InTransit, trip, midpoint));
    phases.push(Phase::new(PhaseKind::Arrival, trip, arrival));
    phases
}

fn phase_detail(kind: PhaseKind, trip: &Trip) -> String {
    let flight = trip.is_flight();
    match kind {
        PhaseKind::LeaveHome if flight => format!("Head to the airport in {}", trip.origin),
        PhaseKind::LeaveHome => format!("Head to the bus terminal in {}", trip.origin),
        PhaseKind::ArriveTerminal if flight => {
            format!("Check in and drop bags for {}", trip.service_label())
        }
        PhaseKind::ArriveTerminal => match trip.bus_company() {
            Some(company) => format!("Find the {company} counter and collect your ticket"),
            None => "Find your operator's counter and collect your ticket".to_string(),
        },
        PhaseKind::SecurityCheckpoint => "Have your ID and boarding pass ready".to_string(),
        PhaseKind::BoardingBegins => match trip.platform() {
            Some(platform) if flight => format!("Boarding starts at gate {platform}"),
            Some(platform) => format!("Board at platform {platform}"),
            None if flight => "Boarding starts at your gate".to_string(),
            None => "Board your bus".to_string(),
        },
        PhaseKind::Departure => format!("{} leaves {}", trip.service_label(), trip.origin),
        PhaseKind::InTransit => format!("On the way to {}", trip.destination),
        PhaseKind::Arrival => format!("Arrive in {}", trip.destination),
    }
}
