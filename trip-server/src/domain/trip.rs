//! Trip records.
//!
//! A `Trip` is the record the add-trip flow stores: where from, where to,
//! when, and a handful of mode-specific details. The engine only ever reads
//! trips; every derived value (instants, phases, reminders) is recomputed
//! from the record rather than written back into it.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::time::parse_trip_instant;

/// Service class that earns the luxury early-arrival reminder.
const LUXURY_SERVICE_CLASS: &str = "lujo";

/// Maximum length of a trip identifier.
const MAX_ID_LEN: usize = 128;

/// Error returned when parsing an invalid trip identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid trip id: {reason}")]
pub struct InvalidTripId {
    reason: &'static str,
}

/// A trip identifier.
///
/// Identifiers are 1-128 ASCII letters, digits, `-`, `_` or `.`, so they are
/// safe to embed in URL paths and in `{trip}:{rule}` reminder keys.
///
/// # Examples
///
/// ```
/// use trip_server::domain::TripId;
///
/// assert!(TripId::parse("trip-42").is_ok());
/// assert!(TripId::parse("").is_err());
/// assert!(TripId::parse("a:b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TripId(String);

impl TripId {
    /// Parse a trip identifier.
    pub fn parse(s: &str) -> Result<Self, InvalidTripId> {
        if s.is_empty() {
            return Err(InvalidTripId {
                reason: "must not be empty",
            });
        }
        if s.len() > MAX_ID_LEN {
            return Err(InvalidTripId {
                reason: "must be at most 128 characters",
            });
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        {
            return Err(InvalidTripId {
                reason: "must contain only letters, digits, '-', '_' or '.'",
            });
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TripId {
    type Error = InvalidTripId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TripId> for String {
    fn from(id: TripId) -> Self {
        id.0
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a trip travels, without the mode-specific details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Flight,
    Bus,
}

/// Mode-specific trip details, tagged by the record's `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum TransportMode {
    Flight {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flight_number: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        airline: Option<String>,
    },
    Bus {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bus_company: Option<String>,
        /// Free-form class name as sold by the operator (e.g. "lujo").
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bus_service_class: Option<String>,
    },
}

impl TransportMode {
    /// Returns the kind of transport.
    pub fn kind(&self) -> TransportKind {
        match self {
            TransportMode::Flight { .. } => TransportKind::Flight,
            TransportMode::Bus { .. } => TransportKind::Bus,
        }
    }
}

/// A stored trip.
///
/// Field names follow the camelCase record format used by trip storage.
/// `arrivalDate`/`arrivalTime` default to the departure values when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: TripId,

    #[serde(flatten)]
    pub mode: TransportMode,

    pub origin: String,
    pub destination: String,

    /// `MM/DD/YYYY` or `MM/DD/YY`
    pub departure_date: String,

    /// Free-form, 12-hour or 24-hour
    #[serde(default)]
    pub departure_time: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<String>,

    /// Present only on round trips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_platform: Option<String>,
}

impl Trip {
    /// Create a flight with no optional details.
    pub fn flight(
        id: TripId,
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure_date: impl Into<String>,
        departure_time: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            TransportMode::Flight {
                flight_number: None,
                airline: None,
            },
            origin.into(),
            destination.into(),
            departure_date.into(),
            departure_time.into(),
        )
    }

    /// Create a bus trip with no optional details.
    pub fn bus(
        id: TripId,
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure_date: impl Into<String>,
        departure_time: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            TransportMode::Bus {
                bus_company: None,
                bus_service_class: None,
            },
            origin.into(),
            destination.into(),
            departure_date.into(),
            departure_time.into(),
        )
    }

    fn new(
        id: TripId,
        mode: TransportMode,
        origin: String,
        destination: String,
        departure_date: String,
        departure_time: String,
    ) -> Self {
        Self {
            id,
            mode,
            origin,
            destination,
            departure_date,
            departure_time,
            arrival_date: None,
            arrival_time: None,
            return_date: None,
            return_time: None,
            departure_platform: None,
        }
    }

    /// Set the arrival date and time.
    pub fn with_arrival(mut self, date: impl Into<String>, time: impl Into<String>) -> Self {
        self.arrival_date = Some(date.into());
        self.arrival_time = Some(time.into());
        self
    }

    /// Mark this as a round trip returning at the given date and time.
    pub fn with_return(mut self, date: impl Into<String>, time: impl Into<String>) -> Self {
        self.return_date = Some(date.into());
        self.return_time = Some(time.into());
        self
    }

    /// Set the departure platform or gate.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.departure_platform = Some(platform.into());
        self
    }

    /// Set the flight number and airline. No effect on bus trips.
    pub fn with_flight(mut self, number: impl Into<String>, carrier: impl Into<String>) -> Self {
        if let TransportMode::Flight {
            flight_number,
            airline,
        } = &mut self.mode
        {
            *flight_number = Some(number.into());
            *airline = Some(carrier.into());
        }
        self
    }

    /// Set the bus company and service class. No effect on flights.
    pub fn with_bus_service(
        mut self,
        company: impl Into<String>,
        service_class: impl Into<String>,
    ) -> Self {
        if let TransportMode::Bus {
            bus_company,
            bus_service_class,
        } = &mut self.mode
        {
            *bus_company = Some(company.into());
            *bus_service_class = Some(service_class.into());
        }
        self
    }

    /// Check the fields every downstream component relies on.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.origin.trim().is_empty() {
            return Err(DomainError::InvalidTrip("origin must not be empty"));
        }
        if self.destination.trim().is_empty() {
            return Err(DomainError::InvalidTrip("destination must not be empty"));
        }
        if self.departure_date.trim().is_empty() {
            return Err(DomainError::InvalidTrip("departure date must not be empty"));
        }
        Ok(())
    }

    /// Returns the kind of transport.
    pub fn kind(&self) -> TransportKind {
        self.mode.kind()
    }

    /// Returns true for flights.
    pub fn is_flight(&self) -> bool {
        self.kind() == TransportKind::Flight
    }

    /// Returns true for bus trips sold in the luxury ("lujo") class.
    pub fn is_luxury_bus(&self) -> bool {
        match &self.mode {
            TransportMode::Bus {
                bus_service_class: Some(class),
                ..
            } => class.trim().eq_ignore_ascii_case(LUXURY_SERVICE_CLASS),
            _ => false,
        }
    }

    /// Short name of the service: flight number, airline, bus company, or
    /// just the mode.
    pub fn service_label(&self) -> String {
        match &self.mode {
            TransportMode::Flight {
                flight_number,
                airline,
            } => present(flight_number)
                .or(present(airline))
                .map_or_else(|| "Your flight".to_string(), |s| format!("Flight {s}")),
            TransportMode::Bus { bus_company, .. } => {
                present(bus_company).map_or_else(|| "Your bus".to_string(), str::to_string)
            }
        }
    }

    /// Returns the bus company, if one was recorded.
    pub fn bus_company(&self) -> Option<&str> {
        match &self.mode {
            TransportMode::Bus { bus_company, .. } => present(bus_company),
            TransportMode::Flight { .. } => None,
        }
    }

    /// Returns the departure platform, ignoring blank values.
    pub fn platform(&self) -> Option<&str> {
        present(&self.departure_platform)
    }

    /// The arrival date, defaulting to the departure date.
    pub fn effective_arrival_date(&self) -> &str {
        present(&self.arrival_date).unwrap_or(&self.departure_date)
    }

    /// The arrival time, defaulting to the departure time.
    pub fn effective_arrival_time(&self) -> &str {
        present(&self.arrival_time).unwrap_or(&self.departure_time)
    }

    /// Departure instant. See [`parse_trip_instant`] for fallback rules.
    pub fn departure_instant(&self, now: NaiveDateTime) -> NaiveDateTime {
        parse_trip_instant(&self.departure_date, &self.departure_time, now)
    }

    /// Arrival instant, using the departure values for absent fields.
    pub fn arrival_instant(&self, now: NaiveDateTime) -> NaiveDateTime {
        parse_trip_instant(
            self.effective_arrival_date(),
            self.effective_arrival_time(),
            now,
        )
    }

    /// Return instant for round trips; `None` when no return date is set.
    ///
    /// A missing return time means noon.
    pub fn return_instant(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let date = present(&self.return_date)?;
        let time = present(&self.return_time).unwrap_or("");
        Some(parse_trip_instant(date, time, now))
    }
}

/// Treat blank strings the same as absent ones.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn id(s: &str) -> TripId {
        TripId::parse(s).unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn trip_id_validation() {
        assert!(TripId::parse("abc-123_x.y").is_ok());
        assert!(TripId::parse("").is_err());
        assert!(TripId::parse("has space").is_err());
        assert!(TripId::parse("a/b").is_err());
        assert!(TripId::parse("a:b").is_err());
        assert!(TripId::parse(&"x".repeat(129)).is_err());
        assert!(TripId::parse(&"x".repeat(128)).is_ok());
    }

    #[test]
    fn deserialize_flight_record() {
        let json = r#"{
            "id": "t1",
            "type": "flight",
            "origin": "MEX",
            "destination": "CUN",
            "departureDate": "03/15/2026",
            "departureTime": "2:30 PM",
            "arrivalDate": "03/15/2026",
            "arrivalTime": "5:10 PM",
            "flightNumber": "AM 512",
            "airline": "Aeromexico"
        }"#;
        let trip: Trip = serde_json::from_str(json).unwrap();

        assert_eq!(trip.id.as_str(), "t1");
        assert!(trip.is_flight());
        assert_eq!(trip.service_label(), "Flight AM 512");
        assert_eq!(trip.departure_time, "2:30 PM");
        assert_eq!(trip.return_date, None);
    }

    #[test]
    fn deserialize_bus_record() {
        let json = r#"{
            "id": "b1",
            "type": "bus",
            "origin": "Guadalajara",
            "destination": "Puerto Vallarta",
            "departureDate": "04/02/26",
            "departureTime": "23:15",
            "busCompany": "ETN",
            "busServiceClass": "Lujo",
            "departurePlatform": "7"
        }"#;
        let trip: Trip = serde_json::from_str(json).unwrap();

        assert_eq!(trip.kind(), TransportKind::Bus);
        assert!(trip.is_luxury_bus());
        assert_eq!(trip.bus_company(), Some("ETN"));
        assert_eq!(trip.platform(), Some("7"));
        assert_eq!(trip.arrival_date, None);
    }

    #[test]
    fn deserialize_rejects_bad_id_and_unknown_mode() {
        let bad_id = r#"{"id": "", "type": "bus", "origin": "A", "destination": "B",
            "departureDate": "01/01/2026"}"#;
        assert!(serde_json::from_str::<Trip>(bad_id).is_err());

        let bad_mode = r#"{"id": "x", "type": "train", "origin": "A", "destination": "B",
            "departureDate": "01/01/2026"}"#;
        assert!(serde_json::from_str::<Trip>(bad_mode).is_err());
    }

    #[test]
    fn serialize_roundtrips_through_record_format() {
        let trip = Trip::bus(id("b2"), "A", "B", "05/05/2026", "08:00")
            .with_bus_service("Primera Plus", "ejecutivo")
            .with_return("05/09/2026", "18:00");

        let json = serde_json::to_value(&trip).unwrap();
        assert_eq!(json["type"], "bus");
        assert_eq!(json["busCompany"], "Primera Plus");
        assert_eq!(json["returnDate"], "05/09/2026");
        assert!(json.get("arrivalDate").is_none());

        let back: Trip = serde_json::from_value(json).unwrap();
        assert_eq!(back, trip);
    }

    #[test]
    fn arrival_defaults_to_departure() {
        let trip = Trip::flight(id("t"), "A", "B", "03/15/2026", "14:30");
        assert_eq!(trip.arrival_instant(now()), trip.departure_instant(now()));

        let trip = Trip {
            arrival_date: Some("   ".into()),
            ..trip
        };
        assert_eq!(trip.effective_arrival_date(), "03/15/2026");
    }

    #[test]
    fn arrival_time_defaults_independently() {
        let mut trip = Trip::flight(id("t"), "A", "B", "03/15/2026", "14:30");
        trip.arrival_date = Some("03/16/2026".into());

        let arrival = trip.arrival_instant(now());
        assert_eq!(arrival.to_string(), "2026-03-16 14:30:00");
    }

    #[test]
    fn return_instant_only_for_round_trips() {
        let trip = Trip::flight(id("t"), "A", "B", "03/15/2026", "14:30");
        assert_eq!(trip.return_instant(now()), None);

        let trip = trip.with_return("03/20/2026", "");
        assert_eq!(
            trip.return_instant(now()).unwrap().to_string(),
            "2026-03-20 12:00:00"
        );
    }

    #[test]
    fn luxury_detection() {
        let trip = Trip::bus(id("b"), "A", "B", "03/15/2026", "14:30");
        assert!(!trip.is_luxury_bus());
        assert!(trip.clone().with_bus_service("ETN", " LUJO ").is_luxury_bus());
        assert!(!trip.with_bus_service("ETN", "primera").is_luxury_bus());

        // Flights never count, whatever their details say
        let flight = Trip::flight(id("f"), "A", "B", "03/15/2026", "14:30")
            .with_bus_service("ETN", "lujo");
        assert!(!flight.is_luxury_bus());
    }

    #[test]
    fn service_labels() {
        let flight = Trip::flight(id("f"), "A", "B", "03/15/2026", "14:30");
        assert_eq!(flight.service_label(), "Your flight");
        assert_eq!(
            flight.with_flight("VB 1020", "Viva").service_label(),
            "Flight VB 1020"
        );

        let bus = Trip::bus(id("b"), "A", "B", "03/15/2026", "14:30");
        assert_eq!(bus.service_label(), "Your bus");
        assert_eq!(bus.with_bus_service("ADO", "GL").service_label(), "ADO");
    }

    #[test]
    fn validate_required_fields() {
        let trip = Trip::flight(id("f"), "A", "B", "03/15/2026", "14:30");
        assert!(trip.validate().is_ok());

        let blank_origin = Trip {
            origin: " ".into(),
            ..trip.clone()
        };
        assert!(blank_origin.validate().is_err());

        let blank_date = Trip {
            departure_date: String::new(),
            ..trip
        };
        assert!(blank_date.validate().is_err());
    }
}
