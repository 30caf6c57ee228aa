use std::fmt;

/// Raised by entity constructors when field values violate the invariants
/// listed in the data model (out-of-range coordinates, empty identifiers,
/// out-of-sequence stop-times, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyId(&'static str),
    InvalidLatitude(String),
    InvalidLongitude(String),
    EmptyStopTimes,
    StopTimesOutOfSequence { trip_id: String },
    DepartureBeforeArrival { trip_id: String, sequence: u32 },
    NegativeTransferWeight(i64),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId(field) => write!(f, "{field} must not be empty"),
            Self::InvalidLatitude(v) => write!(f, "{v} is not a valid latitude"),
            Self::InvalidLongitude(v) => write!(f, "{v} is not a valid longitude"),
            Self::EmptyStopTimes => write!(f, "a trip must have at least one stop-time"),
            Self::StopTimesOutOfSequence { trip_id } => {
                write!(f, "stop-times for trip {trip_id} are not strictly increasing")
            }
            Self::DepartureBeforeArrival { trip_id, sequence } => write!(
                f,
                "stop-time {sequence} of trip {trip_id} departs before it arrives"
            ),
            Self::NegativeTransferWeight(v) => write!(f, "transfer weight {v} must be >= 0"),
        }
    }
}

impl std::error::Error for ValidationError {}
