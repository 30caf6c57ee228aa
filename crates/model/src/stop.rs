use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use utility::id::{HasId, Id};

use crate::error::ValidationError;

/// See <https://gtfs.org/schedule/reference/#stopstxt>
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy, Default)]
#[repr(u8)]
pub enum WheelchairBoarding {
    #[default]
    Unknown = 0,
    Yes = 1,
    No = 2,
}

/// See <https://gtfs.org/schedule/reference/#stopstxt>
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy, Default)]
#[repr(u8)]
pub enum LocationType {
    #[default]
    StopOrPlatform = 0,
    Station = 1,
    EntranceExit = 2,
    GenericNode = 3,
    BoardingArea = 4,
}

/// Sentinel operator status id meaning "this stop has no real-time feed".
pub const NO_REALTIME_STATUS_ID: &str = "-1";

pub type StopId = Id<Stop>;

/// A location where passengers board or disembark a vehicle.
///
/// `name` is already resolved per the reader's fallback rule (operator
/// display name if present and non-empty, otherwise the raw GTFS
/// `stop_name`) — the raw pieces aren't retained on the entity, only the
/// resolved value, since nothing downstream of construction needs to
/// re-derive it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub url: Option<String>,
    pub wheelchair_boarding: WheelchairBoarding,
    pub status_id: Option<String>,
    pub transfer_weight: u32,
    pub code: Option<String>,
    pub description: Option<String>,
    pub zone_id: Option<String>,
    pub location_type: LocationType,
    pub parent_station: Option<StopId>,
    pub timezone: Option<String>,
    /// Transient, query-scoped distance from a `getStopsByLocation` search
    /// point, in miles. Absent outside of that query.
    pub distance_miles: Option<f64>,
}

impl HasId for Stop {
    type IdType = String;
}

pub struct StopFields {
    pub id: StopId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub url: Option<String>,
    pub wheelchair_boarding: WheelchairBoarding,
    pub status_id: Option<String>,
    pub transfer_weight: i64,
    pub code: Option<String>,
    pub description: Option<String>,
    pub zone_id: Option<String>,
    pub location_type: LocationType,
    pub parent_station: Option<StopId>,
    pub timezone: Option<String>,
}

impl Stop {
    pub fn new(fields: StopFields) -> Result<Self, ValidationError> {
        if fields.id.raw().trim().is_empty() {
            return Err(ValidationError::EmptyId("stop.id"));
        }
        if !(-90.0..=90.0).contains(&fields.latitude) {
            return Err(ValidationError::InvalidLatitude(fields.latitude.to_string()));
        }
        if !(-180.0..=180.0).contains(&fields.longitude) {
            return Err(ValidationError::InvalidLongitude(fields.longitude.to_string()));
        }
        if fields.transfer_weight < 0 {
            return Err(ValidationError::NegativeTransferWeight(fields.transfer_weight));
        }
        Ok(Self {
            id: fields.id,
            name: fields.name,
            latitude: fields.latitude,
            longitude: fields.longitude,
            url: fields.url,
            wheelchair_boarding: fields.wheelchair_boarding,
            status_id: fields.status_id,
            transfer_weight: fields.transfer_weight as u32,
            code: fields.code,
            description: fields.description,
            zone_id: fields.zone_id,
            location_type: fields.location_type,
            parent_station: fields.parent_station,
            timezone: fields.timezone,
            distance_miles: None,
        })
    }

    /// Whether this stop has a usable real-time feed mapping.
    pub fn has_realtime_feed(&self) -> bool {
        matches!(&self.status_id, Some(id) if id != NO_REALTIME_STATUS_ID)
    }

    /// Returns a copy annotated with a query-scoped distance, in miles.
    pub fn with_distance_miles(mut self, miles: f64) -> Self {
        self.distance_miles = Some(miles);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> StopFields {
        StopFields {
            id: Id::new("stop-1".to_owned()),
            name: "Main St".to_owned(),
            latitude: 40.0,
            longitude: -75.0,
            url: None,
            wheelchair_boarding: WheelchairBoarding::Unknown,
            status_id: None,
            transfer_weight: 3,
            code: None,
            description: None,
            zone_id: None,
            location_type: LocationType::StopOrPlatform,
            parent_station: None,
            timezone: None,
        }
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        let mut f = fields();
        f.latitude = 200.0;
        assert!(Stop::new(f).is_err());
    }

    #[test]
    fn sentinel_status_id_has_no_feed() {
        let mut f = fields();
        f.status_id = Some(NO_REALTIME_STATUS_ID.to_owned());
        let stop = Stop::new(f).unwrap();
        assert!(!stop.has_realtime_feed());
    }

    #[test]
    fn real_status_id_has_feed() {
        let mut f = fields();
        f.status_id = Some("4821".to_owned());
        let stop = Stop::new(f).unwrap();
        assert!(stop.has_realtime_feed());
    }
}
