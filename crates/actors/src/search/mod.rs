//! Bidirectional, breadth-bounded trip search over a [`ScheduleReader`].
//!
//! The engine never mutates the store; every candidate-gathering step is a
//! plain read dispatched through the reader's own cache, so concurrent
//! searches and repeated identical searches are cheap.

pub mod result;

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use model::route::RouteId;
use model::stop::StopId;
use model::trip::Trip;
use public_transport::{ReaderError, ScheduleReader};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use utility::time::{Date, DateTime, Duration};

pub use result::{ResultError, SegmentEndpoint, TripSearchResult, TripSearchResultSegment, TripSearchResultTransfer};

/// At most this many line-graph transfer candidates are explored per
/// expansion step, per spec: "cap the candidate set to at most the three
/// highest-transfer-weight stops to keep branching tractable."
const MAX_TRANSFER_CANDIDATES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub allow_transfers: bool,
    /// Reserved: when false a transfer should only be taken when the next
    /// trip continues in the same line-graph travel direction. Not yet
    /// enforced by the candidate-gathering step below.
    pub allow_change_in_direction: bool,
    pub pre_departure_hours: u32,
    pub post_departure_hours: u32,
    pub min_layover_mins: i64,
    pub max_layover_mins: i64,
    pub max_transfers: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            allow_transfers: true,
            allow_change_in_direction: true,
            pre_departure_hours: 3,
            post_departure_hours: 6,
            min_layover_mins: 0,
            max_layover_mins: 30,
            max_transfers: 2,
        }
    }
}

#[derive(Debug)]
pub enum SearchError {
    InvalidRequest(String),
    Cancelled,
    Store(ReaderError),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest(why) => write!(f, "invalid search request: {why}"),
            Self::Cancelled => write!(f, "search cancelled"),
            Self::Store(why) => write!(f, "store error: {why}"),
        }
    }
}

impl std::error::Error for SearchError {}

impl From<ReaderError> for SearchError {
    fn from(why: ReaderError) -> Self {
        Self::Store(why)
    }
}

/// Races a store read against the cancellation signal so an in-flight read
/// is abandoned (its result discarded, not awaited to completion) the
/// moment the token fires.
async fn cancellable<T>(
    cancellation: &CancellationToken,
    fut: impl Future<Output = Result<T, SearchError>>,
) -> Result<T, SearchError> {
    tokio::select! {
        _ = cancellation.cancelled() => Err(SearchError::Cancelled),
        result = fut => result,
    }
}

/// Runs `search` with an additional deadline; on expiry this behaves
/// identically to external cancellation (§5: "On expiry, behave identically
/// to cancellation").
pub async fn search_with_timeout(
    reader: &ScheduleReader,
    origin: &StopId,
    destination: &StopId,
    departure: DateTime,
    options: SearchOptions,
    cancellation: &CancellationToken,
    timeout: std::time::Duration,
) -> Result<Vec<TripSearchResult>, SearchError> {
    match tokio::time::timeout(timeout, search(reader, origin, destination, departure, options, cancellation)).await {
        Ok(result) => result,
        Err(_) => Err(SearchError::Cancelled),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Forward,
    Backward,
}

struct Chain {
    segments: Vec<TripSearchResultSegment>,
    transfers: Vec<TripSearchResultTransfer>,
    used_trip_ids: HashSet<String>,
}

fn stop_at<'a>(trip: &'a Trip, stop_id: &StopId) -> Option<(usize, &'a model::stop_time::StopTime)> {
    trip.stop_times.iter().enumerate().find(|(_, st)| &st.stop_id == stop_id)
}

/// Every calendar date the absolute window `[lo, hi]` touches. GTFS
/// stop-times can exceed 24h on the *earlier* of two straddled days, so a
/// window spanning local midnight is queried against both dates rather than
/// normalized away; the candidate-gathering helpers below filter precisely
/// on each trip's already-resolved `*_instant` regardless of which date
/// produced the row.
fn dates_in_window(lo: DateTime, hi: DateTime) -> Vec<Date> {
    let mut dates = Vec::new();
    let mut date = lo.date();
    // A deadline more than a week out is not a sane schedule-query window;
    // this bound only guards against a pathological options value.
    for _ in 0..8 {
        dates.push(date);
        if date >= hi.date() {
            break;
        }
        date = date.add_days(1);
    }
    dates
}

async fn candidates_at_stop(
    reader: &ScheduleReader,
    stop_id: &StopId,
    window: (DateTime, DateTime),
    cancellation: &CancellationToken,
    semaphore: &Semaphore,
) -> Result<Vec<Trip>, SearchError> {
    let mut matches = Vec::new();
    for date in dates_in_window(window.0, window.1) {
        let _permit = semaphore.acquire().await.expect("semaphore is never closed");
        let trips =
            cancellable(cancellation, async { Ok(reader.get_trips_by_date(date, None, Some(stop_id.raw_ref::<str>())).await?) }).await?;
        for trip in trips {
            matches.push(trip);
        }
    }
    Ok(matches)
}

/// Candidate trips boardable at `stop_id` with a departure in `window`.
async fn boardable_candidates(
    reader: &ScheduleReader,
    stop_id: &StopId,
    window: (DateTime, DateTime),
    cancellation: &CancellationToken,
    semaphore: &Semaphore,
) -> Result<Vec<Trip>, SearchError> {
    let all = candidates_at_stop(reader, stop_id, window, cancellation, semaphore).await?;
    Ok(all
        .into_iter()
        .filter(|trip| {
            stop_at(trip, stop_id)
                .map(|(_, st)| st.is_boardable() && st.departure_instant >= window.0 && st.departure_instant <= window.1)
                .unwrap_or(false)
        })
        .collect())
}

/// Candidate trips alightable at `stop_id` with an arrival in `window`.
async fn alightable_candidates(
    reader: &ScheduleReader,
    stop_id: &StopId,
    window: (DateTime, DateTime),
    cancellation: &CancellationToken,
    semaphore: &Semaphore,
) -> Result<Vec<Trip>, SearchError> {
    let all = candidates_at_stop(reader, stop_id, window, cancellation, semaphore).await?;
    Ok(all
        .into_iter()
        .filter(|trip| {
            stop_at(trip, stop_id)
                .map(|(_, st)| st.is_alightable() && st.arrival_instant >= window.0 && st.arrival_instant <= window.1)
                .unwrap_or(false)
        })
        .collect())
}

fn is_direct(trip: &Trip, origin: &StopId, destination: &StopId) -> bool {
    let Some((origin_index, _)) = stop_at(trip, origin) else { return false };
    let Some((destination_index, _)) = stop_at(trip, destination) else { return false };
    origin_index < destination_index
}

fn one_segment_result(trip: &Trip, origin: &StopId, destination: &StopId, route_id: &RouteId) -> Option<TripSearchResult> {
    let (_, enter_stop_time) = stop_at(trip, origin)?;
    let (_, exit_stop_time) = stop_at(trip, destination)?;
    let segment = TripSearchResultSegment {
        trip_id: trip.id.clone(),
        route_id: route_id.clone(),
        enter: SegmentEndpoint {
            stop_id: origin.clone(),
            arrival: enter_stop_time.arrival_instant,
            departure: enter_stop_time.departure_instant,
        },
        exit: SegmentEndpoint {
            stop_id: destination.clone(),
            arrival: exit_stop_time.arrival_instant,
            departure: exit_stop_time.departure_instant,
        },
    };
    TripSearchResult::new(vec![segment], vec![]).ok()
}

/// Top `MAX_TRANSFER_CANDIDATES` stops by transfer weight from
/// `next_stops`, restricted to those still reachable on `trip` after
/// (forward) or before (backward) `anchor_index`.
fn transfer_stops_on_trip(trip: &Trip, anchor_index: usize, side: Side, next_stops: &[StopId]) -> Vec<(usize, StopId)> {
    let reachable: Vec<(usize, &StopId)> = match side {
        Side::Forward => trip.stop_times[anchor_index + 1..]
            .iter()
            .enumerate()
            .map(|(offset, st)| (anchor_index + 1 + offset, &st.stop_id))
            .collect(),
        Side::Backward => trip.stop_times[..anchor_index].iter().enumerate().map(|(index, st)| (index, &st.stop_id)).collect(),
    };
    let mut out: Vec<(usize, StopId)> = reachable
        .into_iter()
        .filter(|(_, stop_id)| next_stops.iter().any(|candidate| candidate == *stop_id))
        .map(|(index, stop_id)| (index, stop_id.clone()))
        .collect();
    out.truncate(MAX_TRANSFER_CANDIDATES);
    out
}

fn layover_window(anchor: DateTime, min_layover_mins: i64, max_layover_mins: i64, side: Side) -> (DateTime, DateTime) {
    match side {
        Side::Forward => (anchor.sub(Duration::minutes(min_layover_mins)), anchor.add(Duration::minutes(max_layover_mins))),
        Side::Backward => (anchor.sub(Duration::minutes(max_layover_mins)), anchor.sub(Duration::minutes(min_layover_mins))),
    }
}

/// Recursive transfer expansion (§4.G). `anchor` is the open end of the
/// chain: the most recently alighted stop when expanding forward from the
/// origin, or the earliest-boarded stop when expanding backward from the
/// destination.
#[allow(clippy::too_many_arguments)]
fn expand<'a>(
    reader: &'a ScheduleReader,
    origin: &'a StopId,
    destination: &'a StopId,
    side: Side,
    trip: Trip,
    anchor_index: usize,
    chain: Chain,
    options: SearchOptions,
    cancellation: &'a CancellationToken,
    semaphore: &'a Semaphore,
) -> std::pin::Pin<Box<dyn Future<Output = Result<Vec<TripSearchResult>, SearchError>> + Send + 'a>> {
    Box::pin(async move {
        if cancellation.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        let anchor_stop = trip.stop_times[anchor_index].stop_id.clone();
        let line_graph_next = match side {
            Side::Forward => reader.get_line_graph_next_stops(origin, destination, &anchor_stop).await?,
            Side::Backward => reader.get_line_graph_next_stops(destination, origin, &anchor_stop).await?,
        };
        let transfer_stops = transfer_stops_on_trip(&trip, anchor_index, side, &line_graph_next);

        let mut results = Vec::new();
        for (stop_index, stop_id) in transfer_stops {
            let stop_time = &trip.stop_times[stop_index];
            let mut next_chain = Chain {
                segments: chain.segments.clone(),
                transfers: chain.transfers.clone(),
                used_trip_ids: chain.used_trip_ids.clone(),
            };
            next_chain.used_trip_ids.insert(trip.id.raw());

            let (segment_enter_index, new_anchor_index) = match side {
                Side::Forward => (anchor_index, stop_index),
                Side::Backward => (stop_index, anchor_index),
            };
            let enter_stop_time = &trip.stop_times[segment_enter_index];
            let exit_stop_time = &trip.stop_times[new_anchor_index];
            let segment = TripSearchResultSegment {
                trip_id: trip.id.clone(),
                route_id: trip.route_id.clone(),
                enter: SegmentEndpoint {
                    stop_id: enter_stop_time.stop_id.clone(),
                    arrival: enter_stop_time.arrival_instant,
                    departure: enter_stop_time.departure_instant,
                },
                exit: SegmentEndpoint {
                    stop_id: exit_stop_time.stop_id.clone(),
                    arrival: exit_stop_time.arrival_instant,
                    departure: exit_stop_time.departure_instant,
                },
            };
            match side {
                Side::Forward => next_chain.segments.push(segment),
                Side::Backward => next_chain.segments.insert(0, segment),
            }

            let transfer_anchor = match side {
                Side::Forward => stop_time.arrival_instant,
                Side::Backward => stop_time.departure_instant,
            };
            let window = layover_window(transfer_anchor, options.min_layover_mins, options.max_layover_mins, side);

            let next_candidates = match side {
                Side::Forward => boardable_candidates(reader, &stop_id, window, cancellation, semaphore).await?,
                Side::Backward => alightable_candidates(reader, &stop_id, window, cancellation, semaphore).await?,
            };
            let next_candidates: Vec<Trip> = next_candidates.into_iter().filter(|t| !next_chain.used_trip_ids.contains(&t.id.raw())).collect();

            let (direct, indirect): (Vec<Trip>, Vec<Trip>) = next_candidates.into_iter().partition(|t| match side {
                Side::Forward => is_direct(t, &stop_id, destination),
                Side::Backward => is_direct(t, origin, &stop_id),
            });

            for direct_trip in &direct {
                let final_chain = complete_chain(&next_chain, side, direct_trip, &stop_id, origin, destination, transfer_anchor);
                if let Some(result) = final_chain {
                    results.push(result);
                }
            }

            if direct.is_empty() && next_chain.segments.len() < options.max_transfers {
                log::trace!("expanding transfer candidates at {stop_id} ({} indirect)", indirect.len());
                for indirect_trip in indirect {
                    let Some((new_anchor, _)) = stop_at(&indirect_trip, &stop_id) else { continue };
                    let sub_results = expand(
                        reader,
                        origin,
                        destination,
                        side,
                        indirect_trip,
                        new_anchor,
                        Chain {
                            segments: next_chain.segments.clone(),
                            transfers: next_chain.transfers.clone(),
                            used_trip_ids: next_chain.used_trip_ids.clone(),
                        },
                        options,
                        cancellation,
                        semaphore,
                    )
                    .await?;
                    results.extend(sub_results);
                }
            }
        }
        Ok(results)
    })
}

fn complete_chain(
    chain: &Chain,
    side: Side,
    direct_trip: &Trip,
    board_stop: &StopId,
    origin: &StopId,
    destination: &StopId,
    transfer_instant: DateTime,
) -> Option<TripSearchResult> {
    let far_end = match side {
        Side::Forward => destination,
        Side::Backward => origin,
    };
    let (_, board_stop_time) = stop_at(direct_trip, board_stop)?;
    let (_, far_stop_time) = stop_at(direct_trip, far_end)?;
    // Forward: direct_trip is boarded at `board_stop` and rides to `destination`.
    // Backward: direct_trip was boarded at `origin` and alights at `board_stop`
    // (the transfer point into the already-built chain), so enter/exit swap.
    let (enter_stop_time, exit_stop_time) = match side {
        Side::Forward => (board_stop_time, far_stop_time),
        Side::Backward => (far_stop_time, board_stop_time),
    };
    let final_segment = TripSearchResultSegment {
        trip_id: direct_trip.id.clone(),
        route_id: direct_trip.route_id.clone(),
        enter: SegmentEndpoint {
            stop_id: enter_stop_time.stop_id.clone(),
            arrival: enter_stop_time.arrival_instant,
            departure: enter_stop_time.departure_instant,
        },
        exit: SegmentEndpoint {
            stop_id: exit_stop_time.stop_id.clone(),
            arrival: exit_stop_time.arrival_instant,
            departure: exit_stop_time.departure_instant,
        },
    };
    let mut segments = chain.segments.clone();
    let mut transfers = chain.transfers.clone();
    match side {
        Side::Forward => {
            transfers.push(TripSearchResultTransfer { stop_id: board_stop.clone(), arrival: transfer_instant, departure: board_stop_time.departure_instant });
            segments.push(final_segment);
        }
        Side::Backward => {
            transfers.insert(0, TripSearchResultTransfer { stop_id: board_stop.clone(), arrival: board_stop_time.arrival_instant, departure: transfer_instant });
            segments.insert(0, final_segment);
        }
    }
    TripSearchResult::new(segments, transfers).ok()
}

/// Deduplicates per §4.G's "Result deduplication and dominance pruning",
/// then sorts ascending by origin departure.
fn dedup_and_sort(results: Vec<TripSearchResult>) -> Vec<TripSearchResult> {
    use std::collections::BTreeMap;

    let mut by_departure: BTreeMap<DateTime, TripSearchResult> = BTreeMap::new();
    for result in results {
        let key = result.origin().departure;
        match by_departure.get(&key) {
            Some(existing)
                if (existing.destination().arrival, existing.transfer_count())
                    <= (result.destination().arrival, result.transfer_count()) => {}
            _ => {
                by_departure.insert(key, result);
            }
        }
    }

    let mut by_arrival: BTreeMap<DateTime, TripSearchResult> = BTreeMap::new();
    for (_, result) in by_departure {
        let key = result.destination().arrival;
        match by_arrival.get(&key) {
            Some(existing) if (std::cmp::Reverse(existing.origin().departure), existing.transfer_count()) <= (std::cmp::Reverse(result.origin().departure), result.transfer_count()) => {}
            _ => {
                by_arrival.insert(key, result);
            }
        }
    }

    let mut survivors: Vec<TripSearchResult> = by_arrival.into_values().collect();
    survivors.sort_by_key(|result| result.origin().departure);
    survivors
}

/// `search(origin, destination, departure, options)` (§4.G).
pub async fn search(
    reader: &ScheduleReader,
    origin: &StopId,
    destination: &StopId,
    departure: DateTime,
    options: SearchOptions,
    cancellation: &CancellationToken,
) -> Result<Vec<TripSearchResult>, SearchError> {
    if origin.raw_ref::<str>().is_empty() {
        return Err(SearchError::InvalidRequest("origin stop id is empty".to_owned()));
    }
    if destination.raw_ref::<str>().is_empty() {
        return Err(SearchError::InvalidRequest("destination stop id is empty".to_owned()));
    }
    log::debug!("search {origin} -> {destination} around {departure}");
    let start = std::time::Instant::now();

    let concurrency = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).max(4);
    let semaphore = Arc::new(Semaphore::new(concurrency));

    let lo = departure.sub(Duration::seconds(options.pre_departure_hours as i64 * 3600));
    let hi = departure.add(Duration::seconds(options.post_departure_hours as i64 * 3600));

    let origin_pool = boardable_candidates(reader, origin, (lo, hi), cancellation, &semaphore).await?;
    let destination_pool = alightable_candidates(reader, destination, (lo, hi), cancellation, &semaphore).await?;

    let (origin_direct, origin_indirect): (Vec<Trip>, Vec<Trip>) =
        origin_pool.into_iter().partition(|t| is_direct(t, origin, destination));
    let (destination_direct, destination_indirect): (Vec<Trip>, Vec<Trip>) =
        destination_pool.into_iter().partition(|t| is_direct(t, origin, destination));

    let origin_side_count = origin_direct.len() + origin_indirect.len();
    let destination_side_count = destination_direct.len() + destination_indirect.len();
    let reverse = destination_side_count < origin_side_count;

    let mut results = Vec::new();

    let (direct, indirect, side) = if reverse {
        (destination_direct, destination_indirect, Side::Backward)
    } else {
        (origin_direct, origin_indirect, Side::Forward)
    };

    for trip in &direct {
        if let Some(result) = one_segment_result(trip, origin, destination, &trip.route_id) {
            results.push(result);
        }
    }

    if options.allow_transfers {
        for trip in indirect {
            let anchor_stop = match side {
                Side::Forward => origin,
                Side::Backward => destination,
            };
            let Some((anchor_index, _)) = stop_at(&trip, anchor_stop) else { continue };
            let chain = Chain { segments: Vec::new(), transfers: Vec::new(), used_trip_ids: HashSet::new() };
            let sub_results =
                expand(reader, origin, destination, side, trip, anchor_index, chain, options, cancellation, &semaphore).await?;
            results.extend(sub_results);
        }
    }

    let results = dedup_and_sort(results);
    log::debug!("search {origin} -> {destination} found {} results in {:?}", results.len(), start.elapsed());
    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use database::{ColumnValue, Row};
    use database::memory::InMemoryScheduleStore;
    use utility::id::Id;
    use utility::time::{Date, Time};

    use super::*;

    fn at(hms: (u32, u32, u32)) -> DateTime {
        DateTime::new(Date::from_yyyymmdd(20240305).unwrap(), Time::from_hms(hms.0, hms.1, hms.2).unwrap())
    }

    fn service_row(id: &str) -> Row {
        Row::new()
            .with("service_id", ColumnValue::Text(id.to_owned()))
            .with("monday", ColumnValue::Bool(true))
            .with("tuesday", ColumnValue::Bool(true))
            .with("wednesday", ColumnValue::Bool(true))
            .with("thursday", ColumnValue::Bool(true))
            .with("friday", ColumnValue::Bool(true))
            .with("saturday", ColumnValue::Bool(true))
            .with("sunday", ColumnValue::Bool(true))
            .with("start_date", ColumnValue::Integer(20240101))
            .with("end_date", ColumnValue::Integer(20241231))
    }

    fn stop_row(id: &str) -> Row {
        Row::new()
            .with("stop_id", ColumnValue::Text(id.to_owned()))
            .with("stop_name", ColumnValue::Text(id.to_owned()))
            .with("stop_lat", ColumnValue::Real(0.0))
            .with("stop_lon", ColumnValue::Real(0.0))
    }

    fn edge_row(a: &str, b: &str) -> Row {
        Row::new().with("stop1_id", ColumnValue::Text(a.to_owned())).with("stop2_id", ColumnValue::Text(b.to_owned()))
    }

    fn trip_row(trip_id: &str, route_id: &str, service_id: &str) -> Row {
        Row::new()
            .with("trip_id", ColumnValue::Text(trip_id.to_owned()))
            .with("route_id", ColumnValue::Text(route_id.to_owned()))
            .with("service_id", ColumnValue::Text(service_id.to_owned()))
            .with("service_date", ColumnValue::Integer(20240305))
    }

    fn stop_time_row(trip_id: &str, stop_id: &str, sequence: i64, arrival_secs: i64, departure_secs: i64) -> Row {
        Row::new()
            .with("trip_id", ColumnValue::Text(trip_id.to_owned()))
            .with("stop_id", ColumnValue::Text(stop_id.to_owned()))
            .with("stop_sequence", ColumnValue::Integer(sequence))
            .with("arrival_time_seconds", ColumnValue::Integer(arrival_secs))
            .with("departure_time_seconds", ColumnValue::Integer(departure_secs))
    }

    fn stop_id(id: &str) -> StopId {
        Id::new(id.to_owned())
    }

    fn reader_with(store: InMemoryScheduleStore) -> ScheduleReader {
        ScheduleReader::new(Arc::new(store))
    }

    #[tokio::test]
    async fn finds_direct_single_segment_match() {
        let mut store = InMemoryScheduleStore::new();
        store.services.push(service_row("everyday"));
        store.trips.push(trip_row("t1", "r1", "everyday"));
        store.stop_times.push(stop_time_row("t1", "o", 1, 28_800, 28_800));
        store.stop_times.push(stop_time_row("t1", "d", 2, 30_600, 30_600));
        let reader = reader_with(store);

        let results = search(&reader, &stop_id("o"), &stop_id("d"), at((8, 0, 0)), SearchOptions::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].segments.len(), 1);
        assert!(results[0].transfers.is_empty());
        assert_eq!(results[0].segments[0].trip_id, Id::new("t1".to_owned()));
        assert_eq!(results[0].origin().departure, at((8, 0, 0)));
        assert_eq!(results[0].destination().arrival, at((8, 30, 0)));
    }

    fn build_transfer_store() -> InMemoryScheduleStore {
        let mut store = InMemoryScheduleStore::new();
        store.services.push(service_row("everyday"));
        for id in ["o", "m", "d"] {
            store.stops.push(stop_row(id));
        }
        store.line_graph_edges.push(edge_row("o", "m"));
        store.line_graph_edges.push(edge_row("m", "d"));

        store.trips.push(trip_row("leg1", "r1", "everyday"));
        store.stop_times.push(stop_time_row("leg1", "o", 1, 28_800, 28_800));
        store.stop_times.push(stop_time_row("leg1", "m", 2, 30_000, 30_000));

        store.trips.push(trip_row("leg2", "r2", "everyday"));
        store.stop_times.push(stop_time_row("leg2", "m", 1, 30_300, 30_300));
        store.stop_times.push(stop_time_row("leg2", "d", 2, 31_800, 31_800));
        store
    }

    #[tokio::test]
    async fn finds_one_transfer_journey_via_forward_expansion() {
        let reader = reader_with(build_transfer_store());

        let results = search(&reader, &stop_id("o"), &stop_id("d"), at((8, 0, 0)), SearchOptions::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.transfer_count(), 1);
        assert_eq!(result.segments[0].trip_id, Id::new("leg1".to_owned()));
        assert_eq!(result.segments[1].trip_id, Id::new("leg2".to_owned()));
        assert_eq!(result.transfers[0].stop_id, stop_id("m"));
        assert_eq!(result.origin().stop_id, stop_id("o"));
        assert_eq!(result.destination().stop_id, stop_id("d"));
    }

    #[tokio::test]
    async fn finds_one_transfer_journey_via_backward_expansion() {
        let mut store = build_transfer_store();
        // Decoy trips boardable at the origin, unrelated to the real route,
        // so the origin-side candidate pool outnumbers the destination-side
        // pool and the engine picks the `reverse` (backward) expansion.
        store.trips.push(trip_row("decoy1", "r3", "everyday"));
        store.stop_times.push(stop_time_row("decoy1", "o", 1, 29_000, 29_000));
        store.stop_times.push(stop_time_row("decoy1", "m", 2, 29_500, 29_500));
        store.trips.push(trip_row("decoy2", "r3", "everyday"));
        store.stop_times.push(stop_time_row("decoy2", "o", 1, 29_100, 29_100));
        store.stop_times.push(stop_time_row("decoy2", "m", 2, 29_600, 29_600));
        let reader = reader_with(store);

        let results = search(&reader, &stop_id("o"), &stop_id("d"), at((8, 0, 0)), SearchOptions::default(), &CancellationToken::new())
            .await
            .unwrap();

        let real = results.iter().find(|r| r.destination().stop_id == stop_id("d")).expect("real journey present");
        assert_eq!(real.segments.len(), 2);
        assert_eq!(real.segments[0].trip_id, Id::new("leg1".to_owned()));
        assert_eq!(real.segments[1].trip_id, Id::new("leg2".to_owned()));
        assert_eq!(real.transfers[0].stop_id, stop_id("m"));
    }

    fn build_two_transfer_store() -> InMemoryScheduleStore {
        let mut store = InMemoryScheduleStore::new();
        store.services.push(service_row("everyday"));
        for id in ["o", "a", "b", "d"] {
            store.stops.push(stop_row(id));
        }
        store.line_graph_edges.push(edge_row("o", "a"));
        store.line_graph_edges.push(edge_row("a", "b"));
        store.line_graph_edges.push(edge_row("b", "d"));

        store.trips.push(trip_row("leg1", "r1", "everyday"));
        store.stop_times.push(stop_time_row("leg1", "o", 1, 28_800, 28_800));
        store.stop_times.push(stop_time_row("leg1", "a", 2, 29_400, 29_400));

        store.trips.push(trip_row("leg2", "r2", "everyday"));
        store.stop_times.push(stop_time_row("leg2", "a", 1, 29_700, 29_700));
        store.stop_times.push(stop_time_row("leg2", "b", 2, 30_300, 30_300));

        store.trips.push(trip_row("leg3", "r3", "everyday"));
        store.stop_times.push(stop_time_row("leg3", "b", 1, 30_600, 30_600));
        store.stop_times.push(stop_time_row("leg3", "d", 2, 31_200, 31_200));
        store
    }

    #[tokio::test]
    async fn max_transfers_caps_recursion_depth() {
        let reader = reader_with(build_two_transfer_store());

        let capped =
            SearchOptions { max_transfers: 1, ..SearchOptions::default() };
        let results = search(&reader, &stop_id("o"), &stop_id("d"), at((8, 0, 0)), capped, &CancellationToken::new()).await.unwrap();
        assert!(results.is_empty(), "a two-transfer journey must not survive a max_transfers of 1");

        let allowed = SearchOptions { max_transfers: 2, ..SearchOptions::default() };
        let results = search(&reader, &stop_id("o"), &stop_id("d"), at((8, 0, 0)), allowed, &CancellationToken::new()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].segments.len(), 3);
        assert_eq!(results[0].transfer_count(), 2);
    }

    #[tokio::test]
    async fn rejects_empty_origin_or_destination() {
        let reader = reader_with(InMemoryScheduleStore::new());
        let result =
            search(&reader, &stop_id(""), &stop_id("d"), at((8, 0, 0)), SearchOptions::default(), &CancellationToken::new()).await;
        assert!(matches!(result, Err(SearchError::InvalidRequest(_))));
    }

    fn result_with(origin_departure: DateTime, destination_arrival: DateTime, segment_count: usize) -> TripSearchResult {
        let mut segments = Vec::new();
        for i in 0..segment_count {
            let enter_stop = if i == 0 { "o".to_owned() } else { format!("mid{i}") };
            let exit_stop = if i + 1 == segment_count { "d".to_owned() } else { format!("mid{}", i + 1) };
            let enter_time = if i == 0 { origin_departure } else { at((9, 0, 0)) };
            let exit_time = if i + 1 == segment_count { destination_arrival } else { at((9, 30, 0)) };
            segments.push(TripSearchResultSegment {
                trip_id: Id::new(format!("t{i}")),
                route_id: Id::new(format!("r{i}")),
                enter: SegmentEndpoint { stop_id: Id::new(enter_stop), arrival: enter_time, departure: enter_time },
                exit: SegmentEndpoint { stop_id: Id::new(exit_stop), arrival: exit_time, departure: exit_time },
            });
        }
        let transfers = (1..segment_count)
            .map(|i| TripSearchResultTransfer { stop_id: Id::new(format!("mid{i}")), arrival: at((9, 0, 0)), departure: at((9, 0, 0)) })
            .collect();
        TripSearchResult::new(segments, transfers).unwrap()
    }

    #[test]
    fn dedup_prefers_earliest_arrival_then_fewest_segments_per_departure() {
        let departure = at((8, 0, 0));
        let slower = result_with(departure, at((9, 0, 0)), 1);
        let faster = result_with(departure, at((8, 30, 0)), 1);
        let survivors = dedup_and_sort(vec![slower, faster]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].destination().arrival, at((8, 30, 0)));
    }

    #[test]
    fn dedup_prefers_latest_departure_then_fewest_segments_per_arrival() {
        let arrival = at((9, 0, 0));
        let earlier_departure = result_with(at((7, 0, 0)), arrival, 1);
        let later_departure = result_with(at((8, 0, 0)), arrival, 1);
        let survivors = dedup_and_sort(vec![earlier_departure, later_departure]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].origin().departure, at((8, 0, 0)));
    }

    #[test]
    fn dedup_sorts_survivors_ascending_by_origin_departure() {
        let first = result_with(at((7, 0, 0)), at((7, 30, 0)), 1);
        let second = result_with(at((8, 0, 0)), at((8, 30, 0)), 1);
        let survivors = dedup_and_sort(vec![second, first]);
        assert_eq!(survivors.len(), 2);
        assert_eq!(survivors[0].origin().departure, at((7, 0, 0)));
        assert_eq!(survivors[1].origin().departure, at((8, 0, 0)));
    }
}
