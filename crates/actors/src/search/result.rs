//! Result model for the trip search engine (component H): a journey is a
//! chain of segments (time spent riding one trip) joined by transfers (time
//! spent waiting at a stop between two trips). Origin, destination, travel
//! time and transfer count are all derived from the segment chain rather
//! than stored redundantly.

use model::route::RouteId;
use model::stop::StopId;
use model::trip::TripId;
use utility::time::{DateTime, Duration};

/// A stop visit: either boarding (only `departure` is meaningful) or
/// alighting (only `arrival` is meaningful). Both fields are carried so a
/// `SegmentEndpoint` can serve as either end of a `TripSearchResultSegment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentEndpoint {
    pub stop_id: StopId,
    pub arrival: DateTime,
    pub departure: DateTime,
}

/// Time spent aboard a single Trip, from boarding at `enter` to alighting
/// at `exit`.
#[derive(Debug, Clone)]
pub struct TripSearchResultSegment {
    pub trip_id: TripId,
    pub route_id: RouteId,
    pub enter: SegmentEndpoint,
    pub exit: SegmentEndpoint,
}

/// Time spent waiting at a stop between two consecutive segments.
#[derive(Debug, Clone)]
pub struct TripSearchResultTransfer {
    pub stop_id: StopId,
    pub arrival: DateTime,
    pub departure: DateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultError {
    EmptySegments,
    BrokenChain { index: usize },
}

impl std::fmt::Display for ResultError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySegments => write!(f, "a trip search result must have at least one segment"),
            Self::BrokenChain { index } => {
                write!(f, "segment {index} does not connect to the following transfer/segment")
            }
        }
    }
}

impl std::error::Error for ResultError {}

/// A complete origin-to-destination journey: a non-empty chain of segments
/// joined by `segments.len() - 1` transfers.
///
/// Invariant, enforced at construction: for each consecutive pair
/// `(i, i+1)`, `segments[i].exit.stop == transfers[i].stop ==
/// segments[i+1].enter.stop` and `segments[i].exit.arrival <=
/// segments[i+1].enter.departure`.
#[derive(Debug, Clone)]
pub struct TripSearchResult {
    pub segments: Vec<TripSearchResultSegment>,
    pub transfers: Vec<TripSearchResultTransfer>,
}

impl TripSearchResult {
    pub fn new(
        segments: Vec<TripSearchResultSegment>,
        transfers: Vec<TripSearchResultTransfer>,
    ) -> Result<Self, ResultError> {
        if segments.is_empty() {
            return Err(ResultError::EmptySegments);
        }
        if transfers.len() != segments.len() - 1 {
            return Err(ResultError::BrokenChain { index: 0 });
        }
        for (index, window) in segments.windows(2).enumerate() {
            let [current, next] = window else { unreachable!() };
            let transfer = &transfers[index];
            if current.exit.stop_id != transfer.stop_id
                || transfer.stop_id != next.enter.stop_id
                || current.exit.arrival > next.enter.departure
            {
                return Err(ResultError::BrokenChain { index });
            }
        }
        Ok(Self { segments, transfers })
    }

    pub fn origin(&self) -> &SegmentEndpoint {
        &self.segments[0].enter
    }

    pub fn destination(&self) -> &SegmentEndpoint {
        &self.segments[self.segments.len() - 1].exit
    }

    pub fn travel_time(&self) -> Duration {
        self.destination().arrival.duration_since(self.origin().departure)
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.len()
    }
}

#[cfg(test)]
mod tests {
    use utility::id::Id;
    use utility::time::{Date, Time};

    use super::*;

    fn at(day: i32, hms: (u32, u32, u32)) -> DateTime {
        DateTime::new(
            Date::from_yyyymmdd(day).unwrap(),
            Time::from_hms(hms.0, hms.1, hms.2).unwrap(),
        )
    }

    fn endpoint(stop: &str, arrival: DateTime, departure: DateTime) -> SegmentEndpoint {
        SegmentEndpoint { stop_id: Id::new(stop.to_owned()), arrival, departure }
    }

    #[test]
    fn derives_origin_destination_and_travel_time_from_segments() {
        let a_departure = at(20240305, (8, 0, 0));
        let b_arrival = at(20240305, (8, 30, 0));
        let b_departure = at(20240305, (8, 40, 0));
        let c_arrival = at(20240305, (9, 10, 0));
        let segments = vec![
            TripSearchResultSegment {
                trip_id: Id::new("t1".to_owned()),
                route_id: Id::new("r1".to_owned()),
                enter: endpoint("a", a_departure, a_departure),
                exit: endpoint("b", b_arrival, b_arrival),
            },
            TripSearchResultSegment {
                trip_id: Id::new("t2".to_owned()),
                route_id: Id::new("r2".to_owned()),
                enter: endpoint("b", b_departure, b_departure),
                exit: endpoint("c", c_arrival, c_arrival),
            },
        ];
        let transfers = vec![TripSearchResultTransfer { stop_id: Id::new("b".to_owned()), arrival: b_arrival, departure: b_departure }];
        let result = TripSearchResult::new(segments, transfers).unwrap();
        assert_eq!(result.origin().stop_id, Id::new("a".to_owned()));
        assert_eq!(result.destination().stop_id, Id::new("c".to_owned()));
        assert_eq!(result.transfer_count(), 1);
        assert_eq!(result.travel_time(), Duration::minutes(70));
    }

    #[test]
    fn rejects_broken_chain() {
        let t0 = at(20240305, (8, 0, 0));
        let segments = vec![
            TripSearchResultSegment {
                trip_id: Id::new("t1".to_owned()),
                route_id: Id::new("r1".to_owned()),
                enter: endpoint("a", t0, t0),
                exit: endpoint("b", t0, t0),
            },
            TripSearchResultSegment {
                trip_id: Id::new("t2".to_owned()),
                route_id: Id::new("r2".to_owned()),
                enter: endpoint("x", t0, t0),
                exit: endpoint("c", t0, t0),
            },
        ];
        let transfers = vec![TripSearchResultTransfer { stop_id: Id::new("b".to_owned()), arrival: t0, departure: t0 }];
        assert!(TripSearchResult::new(segments, transfers).is_err());
    }

    #[test]
    fn rejects_empty_segments() {
        assert_eq!(TripSearchResult::new(vec![], vec![]).unwrap_err(), ResultError::EmptySegments);
    }
}
