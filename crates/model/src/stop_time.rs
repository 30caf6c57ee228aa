use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use utility::time::{Date, DateTime, Time};

use crate::error::ValidationError;
use crate::stop::StopId;

/// See <https://gtfs.org/schedule/reference/#stop_timestxt>
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy, Default)]
#[repr(u8)]
pub enum PickupType {
    #[default]
    Regular = 0,
    None = 1,
    PhoneAgency = 2,
    CoordinateWithDriver = 3,
}

/// See <https://gtfs.org/schedule/reference/#stop_timestxt>
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy, Default)]
#[repr(u8)]
pub enum DropOffType {
    #[default]
    Regular = 0,
    None = 1,
    PhoneAgency = 2,
    CoordinateWithDriver = 3,
}

#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy, Default)]
#[repr(u8)]
pub enum Timepoint {
    Approximate = 0,
    #[default]
    Exact = 1,
}

/// Constructor arguments for [`StopTime::new`]. An options-bag rather than a
/// positional constructor, per the chosen resolution of the two incompatible
/// shapes present upstream (see DESIGN.md).
pub struct StopTimeFields {
    pub stop_id: StopId,
    pub arrival: Time,
    pub departure: Time,
    pub sequence: u32,
    pub pickup_type: PickupType,
    pub drop_off_type: DropOffType,
    pub headsign: Option<String>,
    pub shape_distance_traveled: Option<f64>,
    pub timepoint: Timepoint,
    pub service_date: Date,
}

/// Arrival/departure at one stop along a trip. `arrival`/`departure` carry
/// the raw clock-time (possibly past 24h); `arrival_instant`/
/// `departure_instant` are the derived absolute timestamps obtained by
/// pairing that clock-time with the owning trip's `service_date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopTime {
    pub stop_id: StopId,
    pub arrival: Time,
    pub arrival_instant: DateTime,
    pub departure: Time,
    pub departure_instant: DateTime,
    pub sequence: u32,
    pub pickup_type: PickupType,
    pub drop_off_type: DropOffType,
    pub headsign: Option<String>,
    pub shape_distance_traveled: Option<f64>,
    pub timepoint: Timepoint,
    pub service_date: Date,
}

impl StopTime {
    pub fn new(fields: StopTimeFields) -> Result<Self, ValidationError> {
        let arrival_instant = DateTime::new(fields.service_date, fields.arrival);
        let departure_instant = DateTime::new(fields.service_date, fields.departure);
        if departure_instant < arrival_instant {
            return Err(ValidationError::DepartureBeforeArrival {
                trip_id: String::new(),
                sequence: fields.sequence,
            });
        }
        Ok(Self {
            stop_id: fields.stop_id,
            arrival: fields.arrival,
            arrival_instant,
            departure: fields.departure,
            departure_instant,
            sequence: fields.sequence,
            pickup_type: fields.pickup_type,
            drop_off_type: fields.drop_off_type,
            headsign: fields.headsign,
            shape_distance_traveled: fields.shape_distance_traveled,
            timepoint: fields.timepoint,
            service_date: fields.service_date,
        })
    }

    pub fn is_boardable(&self) -> bool {
        self.pickup_type != PickupType::None
    }

    pub fn is_alightable(&self) -> bool {
        self.drop_off_type != DropOffType::None
    }
}
