use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use utility::id::{HasId, Id};
use utility::time::Date;

use crate::calendar::ServiceId;
use crate::direction::DirectionId;
use crate::error::ValidationError;
use crate::route::RouteId;
use crate::shape::ShapeId;
use crate::stop_time::StopTime;

pub type TripId = Id<Trip>;

/// See <https://gtfs.org/schedule/reference/#tripstxt>
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy, Default)]
#[repr(u8)]
pub enum WheelchairAccessible {
    #[default]
    Unknown = 0,
    Yes = 1,
    No = 2,
}

/// See <https://gtfs.org/schedule/reference/#tripstxt>
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy, Default)]
#[repr(u8)]
pub enum BikesAllowed {
    #[default]
    Unknown = 0,
    Yes = 1,
    No = 2,
}

/// The operator-curated base peak-fare indicator, before the holiday override
/// is taken into account (see [`Trip::is_peak_on`]).
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy, Default)]
#[repr(u8)]
pub enum PeakIndicator {
    #[default]
    Off = 0,
    On = 1,
    WeekdayOnly = 2,
}

/// A scheduled run of a vehicle along a Route on a given Service, as an
/// ordered sequence of stop visits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub route_id: RouteId,
    pub service_id: ServiceId,
    pub stop_times: Vec<StopTime>,
    pub headsign: Option<String>,
    pub short_name: Option<String>,
    pub block_id: Option<String>,
    pub shape_id: Option<ShapeId>,
    pub direction_id: Option<DirectionId>,
    pub wheelchair_accessible: WheelchairAccessible,
    pub bikes_allowed: BikesAllowed,
    pub peak_indicator: PeakIndicator,
}

impl HasId for Trip {
    type IdType = String;
}

impl Trip {
    pub fn new(
        id: TripId,
        route_id: RouteId,
        service_id: ServiceId,
        mut stop_times: Vec<StopTime>,
        headsign: Option<String>,
        short_name: Option<String>,
        block_id: Option<String>,
        shape_id: Option<ShapeId>,
        direction_id: Option<DirectionId>,
        wheelchair_accessible: WheelchairAccessible,
        bikes_allowed: BikesAllowed,
        peak_indicator: PeakIndicator,
    ) -> Result<Self, ValidationError> {
        if id.raw().trim().is_empty() {
            return Err(ValidationError::EmptyId("trip.id"));
        }
        if stop_times.is_empty() {
            return Err(ValidationError::EmptyStopTimes);
        }
        stop_times.sort_by_key(|stop_time| stop_time.sequence);
        for pair in stop_times.windows(2) {
            let [previous, next] = pair else { unreachable!() };
            if previous.sequence >= next.sequence
                || previous.departure_instant >= next.arrival_instant
            {
                return Err(ValidationError::StopTimesOutOfSequence {
                    trip_id: id.raw(),
                });
            }
        }
        Ok(Self {
            id,
            route_id,
            service_id,
            stop_times,
            headsign,
            short_name,
            block_id,
            shape_id,
            direction_id,
            wheelchair_accessible,
            bikes_allowed,
            peak_indicator,
        })
    }

    pub fn first_stop_time(&self) -> &StopTime {
        &self.stop_times[0]
    }

    pub fn last_stop_time(&self) -> &StopTime {
        &self.stop_times[self.stop_times.len() - 1]
    }

    /// Resolves whether this trip counts as peak service on `date`, given
    /// the holiday record (if any) covering that date:
    ///
    /// - `On` is always peak.
    /// - `Off` is never peak.
    /// - `WeekdayOnly` is peak iff `date` is Monday through Friday and
    ///   either there is no holiday on `date` or the holiday's `peak` flag
    ///   is true.
    pub fn is_peak_on(&self, date: Date, holiday_peak: Option<bool>) -> bool {
        match self.peak_indicator {
            PeakIndicator::On => true,
            PeakIndicator::Off => false,
            PeakIndicator::WeekdayOnly => {
                date.weekday().num_days_from_monday() < 5
                    && holiday_peak.unwrap_or(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use utility::time::Time;

    use super::*;
    use crate::stop_time::StopTimeFields;

    fn stop_time(stop: &str, arrival: u32, departure: u32, sequence: u32) -> StopTime {
        StopTime::new(StopTimeFields {
            stop_id: Id::new(stop.to_owned()),
            arrival: Time::from_seconds(arrival as i64).unwrap(),
            departure: Time::from_seconds(departure as i64).unwrap(),
            sequence,
            pickup_type: Default::default(),
            drop_off_type: Default::default(),
            headsign: None,
            shape_distance_traveled: None,
            timepoint: Default::default(),
            service_date: Date::from_yyyymmdd(20240305).unwrap(),
        })
        .unwrap()
    }

    fn build_trip(stop_times: Vec<StopTime>, peak_indicator: PeakIndicator) -> Result<Trip, ValidationError> {
        Trip::new(
            Id::new("t1".to_owned()),
            Id::new("r1".to_owned()),
            Id::new("s1".to_owned()),
            stop_times,
            None,
            None,
            None,
            None,
            None,
            WheelchairAccessible::Unknown,
            BikesAllowed::Unknown,
            peak_indicator,
        )
    }

    #[test]
    fn sorts_stop_times_by_sequence_at_construction() {
        let trip = build_trip(
            vec![stop_time("b", 3600, 3600, 2), stop_time("a", 0, 0, 1)],
            PeakIndicator::Off,
        )
        .unwrap();
        assert_eq!(trip.stop_times[0].stop_id, Id::<crate::stop::Stop>::new("a".to_owned()));
        assert_eq!(trip.stop_times[1].stop_id, Id::<crate::stop::Stop>::new("b".to_owned()));
    }

    #[test]
    fn rejects_non_increasing_sequence() {
        let result = build_trip(
            vec![stop_time("a", 0, 0, 1), stop_time("b", 3600, 3600, 1)],
            PeakIndicator::Off,
        );
        assert!(matches!(result, Err(ValidationError::StopTimesOutOfSequence { .. })));
    }

    #[test]
    fn weekday_only_peak_follows_holiday_override() {
        let trip = build_trip(vec![stop_time("a", 0, 0, 1)], PeakIndicator::WeekdayOnly).unwrap();
        // 2024-03-05 is a Tuesday.
        let tuesday = Date::from_yyyymmdd(20240305).unwrap();
        assert!(trip.is_peak_on(tuesday, None));
        assert!(!trip.is_peak_on(tuesday, Some(false)));
        assert!(trip.is_peak_on(tuesday, Some(true)));
    }
}
