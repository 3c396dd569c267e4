//! Domain error types.
//!
//! These errors represent validation failures on trip records. Parsing
//! problems with dates and times are never errors: they are recovered by
//! the fallback rules in the time module.

use super::trip::InvalidTripId;

/// Domain-level errors for trip validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// A required trip field is missing or blank
    #[error("invalid trip: {0}")]
    InvalidTrip(&'static str),

    /// The trip identifier is malformed
    #[error(transparent)]
    InvalidTripId(#[from] InvalidTripId),

    /// The identifier in a request path does not match the record
    #[error("trip id mismatch: path has {path}, record has {record}")]
    TripIdMismatch { path: String, record: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TripId;

    #[test]
    fn error_display() {
        let err = DomainError::InvalidTrip("origin must not be empty");
        assert_eq!(err.to_string(), "invalid trip: origin must not be empty");

        let err: DomainError = TripId::parse("").unwrap_err().into();
        assert_eq!(err.to_string(), "invalid trip id: must not be empty");

        let err = DomainError::TripIdMismatch {
            path: "a".into(),
            record: "b".into(),
        };
        assert_eq!(
            err.to_string(),
            "trip id mismatch: path has a, record has b"
        );
    }
}
