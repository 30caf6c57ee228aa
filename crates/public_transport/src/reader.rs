//! `ScheduleReader`: the facade over a `ScheduleStore`, implementing every
//! reader in the schedule-query table. Holds one `moka` cache per
//! frequently-hit query family; composite readers (by-name search,
//! location search, departure lookup, date-filtered trip listings) are
//! built on top of the cached primitives rather than cached separately, to
//! keep the cache-key space bounded.

use std::sync::Arc;

use database::{Query, ScheduleStore};
use model::about::About;
use model::calendar::{Service, ServiceException};
use model::direction::{Direction, DirectionId};
use model::holiday::Holiday;
use model::link::Link;
use model::route::Route;
use model::shape::{Shape, ShapeId};
use model::stop::{Stop, StopId};
use model::stop_time::StopTime;
use model::trip::Trip;
use moka::future::Cache;
use utility::id::Id;
use utility::time::{Date, DateTime, Time};

use crate::calendar::effective_services;
use crate::error::{ReaderError, Result};
use crate::line_graph::LineGraph;
use crate::{decode, error};

/// A `getTrip` result: the trip together with the entities spec.md's reader
/// table says it's joined against, and the peak flag resolved against the
/// holiday calendar for the requested date.
#[derive(Debug, Clone)]
pub struct TripDetail {
    pub trip: Trip,
    pub route: Route,
    pub service: Service,
    pub peak: bool,
}

fn alt_names(row: &database::Row) -> Vec<String> {
    row.text("alt_names")
        .map(|joined| joined.split('|').filter(|s| !s.is_empty()).map(str::to_owned).collect())
        .unwrap_or_default()
}

fn cache<K, V>() -> Cache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    Cache::new(10_000)
}

fn unwrap_cached<T>(result: std::result::Result<T, Arc<ReaderError>>) -> Result<T> {
    result.map_err(|why| ReaderError::Decode(why.to_string()))
}

pub struct ScheduleReader {
    store: Arc<dyn ScheduleStore>,
    about: Cache<(), About>,
    service: Cache<String, Service>,
    services_default: Cache<i32, Vec<Service>>,
    service_exceptions: Cache<i32, Vec<ServiceException>>,
    services_effective: Cache<i32, Vec<Service>>,
    route: Cache<String, Route>,
    routes: Cache<(), Vec<Route>>,
    stop: Cache<String, Stop>,
    stops: Cache<(), Vec<Stop>>,
    stop_times_by_trip: Cache<(String, i32), Vec<StopTime>>,
    trip: Cache<(String, i32), Trip>,
    holidays: Cache<(), Vec<Holiday>>,
    holiday_by_date: Cache<i32, Option<Holiday>>,
    directions: Cache<(), Vec<Direction>>,
    shapes: Cache<(), Vec<Shape>>,
    links: Cache<(), Vec<Link>>,
    line_graph: Cache<(), Arc<LineGraph>>,
}

impl ScheduleReader {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self {
            store,
            about: cache(),
            service: cache(),
            services_default: cache(),
            service_exceptions: cache(),
            services_effective: cache(),
            route: cache(),
            routes: cache(),
            stop: cache(),
            stops: cache(),
            stop_times_by_trip: cache(),
            trip: cache(),
            holidays: cache(),
            holiday_by_date: cache(),
            directions: cache(),
            shapes: cache(),
            links: cache(),
            line_graph: cache(),
        }
    }

    /// Invalidates every cache. Callers reload a fresh schedule snapshot by
    /// swapping the underlying store and calling this, rather than mutating
    /// through the store (read-only per its contract).
    pub fn clear_cache(&self) {
        self.about.invalidate_all();
        self.service.invalidate_all();
        self.services_default.invalidate_all();
        self.service_exceptions.invalidate_all();
        self.services_effective.invalidate_all();
        self.route.invalidate_all();
        self.routes.invalidate_all();
        self.stop.invalidate_all();
        self.stops.invalidate_all();
        self.stop_times_by_trip.invalidate_all();
        self.trip.invalidate_all();
        self.holidays.invalidate_all();
        self.holiday_by_date.invalidate_all();
        self.directions.invalidate_all();
        self.shapes.invalidate_all();
        self.links.invalidate_all();
        self.line_graph.invalidate_all();
    }

    pub async fn get_about(&self) -> Result<About> {
        let store = self.store.clone();
        unwrap_cached(
            self.about
                .try_get_with((), async move {
                    log::trace!("about cache miss");
                    let row = store.get(Query::About).await?.ok_or(ReaderError::NotFound)?;
                    decode::about(&row)
                })
                .await,
        )
    }

    pub async fn get_service(&self, id: &str) -> Result<Service> {
        let store = self.store.clone();
        let id = id.to_owned();
        unwrap_cached(
            self.service
                .try_get_with(id.clone(), async move {
                    log::trace!("service cache miss for {id}");
                    let exception_rows = store.select(Query::ServiceExceptionsByServiceId(id.clone())).await?;
                    let exceptions = exception_rows
                        .iter()
                        .map(decode::service_exception)
                        .collect::<error::Result<Vec<_>>>()?;
                    match store.get(Query::ServiceById(id.clone())).await? {
                        Some(row) => decode::service(&row, exceptions),
                        None if !exceptions.is_empty() => {
                            let start = exceptions.iter().map(|e| e.date).min().expect("non-empty");
                            let end = exceptions.iter().map(|e| e.date).max().expect("non-empty");
                            model::calendar::Service::new(
                                Id::new(id.clone()),
                                [false, false, false, false, false, false, false],
                                start,
                                end,
                                exceptions,
                            )
                            .map_err(ReaderError::from)
                        }
                        None => Err(ReaderError::NotFound),
                    }
                })
                .await,
        )
    }

    pub async fn get_services(&self, ids: &[String]) -> Result<Vec<Service>> {
        let mut services = Vec::with_capacity(ids.len());
        for id in ids {
            services.push(self.get_service(id).await?);
        }
        Ok(services)
    }

    pub async fn get_services_default(&self, date: Date) -> Result<Vec<Service>> {
        let store = self.store.clone();
        unwrap_cached(
            self.services_default
                .try_get_with(date.to_yyyymmdd(), async move {
                    log::trace!("services_default cache miss for {date}");
                    let rows = store.select(Query::ServicesDefaultForDate(date)).await?;
                    rows.iter().map(|row| decode::service(row, vec![])).collect()
                })
                .await,
        )
    }

    pub async fn get_service_exceptions(&self, date: Date) -> Result<Vec<ServiceException>> {
        let store = self.store.clone();
        unwrap_cached(
            self.service_exceptions
                .try_get_with(date.to_yyyymmdd(), async move {
                    log::trace!("service_exceptions cache miss for {date}");
                    let rows = store.select(Query::ServiceExceptionsForDate(date)).await?;
                    rows.iter().map(decode::service_exception).collect()
                })
                .await,
        )
    }

    /// The authoritative "what runs on `date`" set: `getServicesDefault`
    /// with `added` exceptions unioned in and `removed` exceptions taken
    /// out.
    pub async fn get_services_effective(&self, date: Date) -> Result<Vec<Service>> {
        let this_default = self.get_services_default(date).await?;
        let this_exceptions = self.get_service_exceptions(date).await?;
        unwrap_cached(
            self.services_effective
                .try_get_with(date.to_yyyymmdd(), async move {
                    Ok::<_, ReaderError>(effective_services(this_default, &this_exceptions))
                })
                .await,
        )
    }

    pub async fn get_route(&self, id: &str) -> Result<Route> {
        let store = self.store.clone();
        let id = id.to_owned();
        unwrap_cached(
            self.route
                .try_get_with(id.clone(), async move {
                    log::trace!("route cache miss for {id}");
                    let row = store.get(Query::RouteById(id)).await?.ok_or(ReaderError::NotFound)?;
                    decode::route(&row)
                })
                .await,
        )
    }

    pub async fn get_routes_by_ids(&self, ids: &[String]) -> Result<Vec<Route>> {
        let mut routes = Vec::with_capacity(ids.len());
        for id in ids {
            routes.push(self.get_route(id).await?);
        }
        Ok(routes)
    }

    pub async fn get_all_routes(&self) -> Result<Vec<Route>> {
        let store = self.store.clone();
        unwrap_cached(
            self.routes
                .try_get_with((), async move {
                    log::trace!("routes cache miss");
                    let rows = store.select(Query::AllRoutes).await?;
                    let mut routes = rows.iter().map(decode::route).collect::<error::Result<Vec<_>>>()?;
                    routes.sort_by(|a, b| a.long_name.cmp(&b.long_name));
                    Ok(routes)
                })
                .await,
        )
    }

    pub async fn get_stop(&self, id: &str) -> Result<Stop> {
        let store = self.store.clone();
        let id = id.to_owned();
        unwrap_cached(
            self.stop
                .try_get_with(id.clone(), async move {
                    log::trace!("stop cache miss for {id}");
                    let row = store.get(Query::StopById(id)).await?.ok_or(ReaderError::NotFound)?;
                    decode::stop(&row)
                })
                .await,
        )
    }

    pub async fn get_stops_by_ids(&self, ids: &[String]) -> Result<Vec<Stop>> {
        let mut stops = Vec::with_capacity(ids.len());
        for id in ids {
            stops.push(self.get_stop(id).await?);
        }
        Ok(stops)
    }

    /// First stop whose GTFS name, an alt-name, or the operator display
    /// name matches `name` case-insensitively, preferring matches in that
    /// order within a stop and stop iteration order across stops.
    pub async fn get_stop_by_name(&self, name: &str) -> Result<Option<Stop>> {
        let needle = name.to_ascii_lowercase();
        let rows = self.store.select(Query::AllStops).await?;
        for row in &rows {
            let candidates = std::iter::once(row.text("stop_name").unwrap_or_default().to_owned())
                .chain(alt_names(row))
                .chain(row.text("display_name").map(str::to_owned));
            if candidates.map(|c| c.to_ascii_lowercase()).any(|c| c == needle) {
                return Ok(Some(decode::stop(row)?));
            }
        }
        Ok(None)
    }

    pub async fn get_stop_by_status_id(&self, status_id: &str) -> Result<Stop> {
        if status_id == model::stop::NO_REALTIME_STATUS_ID {
            return Err(ReaderError::NotFound);
        }
        let row = self
            .store
            .get(Query::StopByStatusId(status_id.to_owned()))
            .await?
            .ok_or(ReaderError::NotFound)?;
        decode::stop(&row)
    }

    pub async fn get_all_stops(&self, has_feed: Option<bool>) -> Result<Vec<Stop>> {
        let store = self.store.clone();
        let all = unwrap_cached(
            self.stops
                .try_get_with((), async move {
                    log::trace!("stops cache miss");
                    let rows = store.select(Query::AllStops).await?;
                    let mut stops = rows.iter().map(decode::stop).collect::<error::Result<Vec<_>>>()?;
                    stops.sort_by(|a, b| a.name.cmp(&b.name));
                    Ok(stops)
                })
                .await,
        )?;
        Ok(match has_feed {
            Some(true) => all.into_iter().filter(Stop::has_realtime_feed).collect(),
            _ => all,
        })
    }

    pub async fn get_stops_by_route(&self, route_id: &str, has_feed: Option<bool>) -> Result<Vec<Stop>> {
        let rows = self.store.select(Query::StopsByRoute(route_id.to_owned())).await?;
        let mut stops = rows.iter().map(decode::stop).collect::<error::Result<Vec<_>>>()?;
        stops.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(match has_feed {
            Some(true) => stops.into_iter().filter(Stop::has_realtime_feed).collect(),
            _ => stops,
        })
    }

    /// Stops within `distance` (miles, if given) of `(lat, lon)`, closest
    /// first, optionally truncated to `count` and filtered to a route or
    /// to stops with a real-time feed.
    pub async fn get_stops_by_location(
        &self,
        latitude: f64,
        longitude: f64,
        count: Option<usize>,
        distance: Option<f64>,
        has_feed: Option<bool>,
        route_id: Option<&str>,
    ) -> Result<Vec<Stop>> {
        let candidates = match route_id {
            Some(route_id) => self.get_stops_by_route(route_id, has_feed).await?,
            None => self.get_all_stops(has_feed).await?,
        };
        let mut with_distance: Vec<Stop> = candidates
            .into_iter()
            .map(|stop| {
                let miles = utility::geo::haversine_distance_miles(latitude, longitude, stop.latitude, stop.longitude);
                stop.with_distance_miles(miles)
            })
            .filter(|stop| distance.is_none_or(|max| stop.distance_miles.unwrap_or(f64::MAX) <= max))
            .collect();
        with_distance.sort_by(|a, b| {
            a.distance_miles
                .unwrap_or(f64::MAX)
                .total_cmp(&b.distance_miles.unwrap_or(f64::MAX))
        });
        if let Some(count) = count {
            with_distance.truncate(count);
        }
        Ok(with_distance)
    }

    pub async fn get_stop_times_by_trip(&self, trip_id: &str, date: Date) -> Result<Vec<StopTime>> {
        let store = self.store.clone();
        let trip_id = trip_id.to_owned();
        unwrap_cached(
            self.stop_times_by_trip
                .try_get_with((trip_id.clone(), date.to_yyyymmdd()), async move {
                    log::trace!("stop_times_by_trip cache miss for {trip_id} on {date}");
                    let rows = store.select(Query::StopTimesByTrip(trip_id)).await?;
                    let mut stop_times =
                        rows.iter().map(|row| decode::stop_time(row, date)).collect::<error::Result<Vec<_>>>()?;
                    stop_times.sort_by_key(|stop_time| stop_time.sequence);
                    Ok(stop_times)
                })
                .await,
        )
    }

    pub async fn get_stop_time_by_trip_stop(&self, trip_id: &str, stop_id: &str, date: Date) -> Result<Option<StopTime>> {
        let needle: StopId = Id::new(stop_id.to_owned());
        let stop_times = self.get_stop_times_by_trip(trip_id, date).await?;
        Ok(stop_times.into_iter().find(|stop_time| stop_time.stop_id == needle))
    }

    pub async fn get_trip(&self, trip_id: &str, date: Date) -> Result<TripDetail> {
        let store = self.store.clone();
        let trip_id_owned = trip_id.to_owned();
        let stop_times = self.get_stop_times_by_trip(trip_id, date).await?;
        let trip = unwrap_cached(
            self.trip
                .try_get_with((trip_id_owned.clone(), date.to_yyyymmdd()), async move {
                    log::trace!("trip cache miss for {trip_id_owned} on {date}");
                    let row = store
                        .get(Query::TripById(trip_id_owned.clone()))
                        .await?
                        .ok_or(ReaderError::NotFound)?;
                    decode::trip(&row, stop_times)
                })
                .await,
        )?;
        let route = self.get_route(trip.route_id.raw_ref()).await?;
        let service = self.get_service(trip.service_id.raw_ref()).await?;
        let holiday_peak = self.get_holiday(date).await?.map(|holiday| holiday.peak);
        let peak = trip.is_peak_on(date, holiday_peak);
        Ok(TripDetail { trip, route, service, peak })
    }

    pub async fn get_trip_by_short_name(&self, short_name: &str, date: Date) -> Result<Option<TripDetail>> {
        let trips = self.get_trips_by_date(date, None, None).await?;
        let Some(trip) = trips.into_iter().find(|trip| trip.short_name.as_deref() == Some(short_name)) else {
            return Ok(None);
        };
        Ok(Some(self.get_trip(trip.id.raw_ref(), date).await?))
    }

    /// Finds the trip whose origin departure matches `departure` exactly,
    /// retrying against the previous calendar date with 24h added to the
    /// seconds-of-day (GTFS stop-times can carry times >= 24:00:00 for
    /// service that started the day before).
    pub async fn get_trip_by_departure(&self, origin_id: &str, destination_id: &str, departure: DateTime) -> Result<Option<Trip>> {
        if let Some(trip) = self
            .find_trip_by_departure_on_date(origin_id, destination_id, departure.date(), departure.time())
            .await?
        {
            return Ok(Some(trip));
        }
        let previous_date = departure.date().sub_days(1);
        let Ok(rolled_time) = Time::from_seconds(departure.time().seconds_of_day() as i64 + 86_400) else {
            return Ok(None);
        };
        self.find_trip_by_departure_on_date(origin_id, destination_id, previous_date, rolled_time).await
    }

    async fn find_trip_by_departure_on_date(
        &self,
        origin_id: &str,
        destination_id: &str,
        date: Date,
        departure: Time,
    ) -> Result<Option<Trip>> {
        let trips = self.get_trips_by_date(date, None, None).await?;
        for trip in trips {
            let origin_index = trip.stop_times.iter().position(|st| st.stop_id.raw_ref::<str>() == origin_id);
            let Some(origin_index) = origin_index else { continue };
            if trip.stop_times[origin_index].departure != departure {
                continue;
            }
            let destination_after = trip.stop_times[origin_index + 1..]
                .iter()
                .any(|st| st.stop_id.raw_ref::<str>() == destination_id);
            if destination_after {
                return Ok(Some(trip));
            }
        }
        Ok(None)
    }

    /// Trips running on `date`, sorted by the reference stop's departure
    /// (if `stop_id` given) or otherwise by first stop-time departure.
    pub async fn get_trips_by_date(&self, date: Date, route_id: Option<&str>, stop_id: Option<&str>) -> Result<Vec<Trip>> {
        let effective_ids: std::collections::HashSet<String> =
            self.get_services_effective(date).await?.into_iter().map(|service| service.id.raw()).collect();
        let rows = self.store.select(Query::TripsByDate(date)).await?;
        let mut trips = Vec::new();
        for row in &rows {
            let service_id = row.text("service_id").ok_or_else(|| ReaderError::Decode("missing column service_id".to_owned()))?;
            if !effective_ids.contains(service_id) {
                continue;
            }
            if let Some(route_id) = route_id {
                if row.text("route_id") != Some(route_id) {
                    continue;
                }
            }
            let trip_id = row.text("trip_id").ok_or_else(|| ReaderError::Decode("missing column trip_id".to_owned()))?;
            let stop_times = self.get_stop_times_by_trip(trip_id, date).await?;
            if let Some(stop_id) = stop_id {
                if !stop_times.iter().any(|st| st.stop_id.raw_ref::<str>() == stop_id) {
                    continue;
                }
            }
            trips.push(decode::trip(row, stop_times)?);
        }
        trips.sort_by_key(|trip| match stop_id {
            Some(stop_id) => trip
                .stop_times
                .iter()
                .find(|st| st.stop_id.raw_ref::<str>() == stop_id)
                .map(|st| st.departure_instant)
                .unwrap_or(trip.first_stop_time().departure_instant),
            None => trip.first_stop_time().departure_instant,
        });
        Ok(trips)
    }

    pub async fn get_holiday(&self, date: Date) -> Result<Option<Holiday>> {
        let store = self.store.clone();
        unwrap_cached(
            self.holiday_by_date
                .try_get_with(date.to_yyyymmdd(), async move {
                    log::trace!("holiday cache miss for {date}");
                    match store.get(Query::HolidayByDate(date)).await? {
                        Some(row) => decode::holiday(&row).map(Some),
                        None => Ok(None),
                    }
                })
                .await,
        )
    }

    pub async fn is_holiday(&self, date: Date) -> Result<bool> {
        Ok(self.get_holiday(date).await?.is_some())
    }

    pub async fn get_holidays(&self) -> Result<Vec<Holiday>> {
        let store = self.store.clone();
        unwrap_cached(
            self.holidays
                .try_get_with((), async move {
                    log::trace!("holidays cache miss");
                    let rows = store.select(Query::Holidays).await?;
                    rows.iter().map(decode::holiday).collect()
                })
                .await,
        )
    }

    pub async fn get_directions(&self) -> Result<Vec<Direction>> {
        let store = self.store.clone();
        unwrap_cached(
            self.directions
                .try_get_with((), async move {
                    log::trace!("directions cache miss");
                    let rows = store.select(Query::Directions).await?;
                    rows.iter().map(decode::direction).collect()
                })
                .await,
        )
    }

    pub async fn get_direction(&self, id: &DirectionId) -> Result<Direction> {
        let directions = self.get_directions().await?;
        directions.into_iter().find(|direction| &direction.id == id).ok_or(ReaderError::NotFound)
    }

    pub async fn get_shapes(&self) -> Result<Vec<Shape>> {
        let store = self.store.clone();
        unwrap_cached(
            self.shapes
                .try_get_with((), async move {
                    log::trace!("shapes cache miss");
                    let rows = store.select(Query::Shapes).await?;
                    decode::shapes(rows)
                })
                .await,
        )
    }

    pub async fn get_shape(&self, id: &ShapeId) -> Result<Shape> {
        let shapes = self.get_shapes().await?;
        shapes.into_iter().find(|shape| &shape.id == id).ok_or(ReaderError::NotFound)
    }

    pub async fn get_shape_center(&self, id: &ShapeId) -> Result<Option<(f64, f64)>> {
        Ok(self.get_shape(id).await?.center())
    }

    pub async fn get_links(&self) -> Result<Vec<Link>> {
        let store = self.store.clone();
        unwrap_cached(
            self.links
                .try_get_with((), async move {
                    log::trace!("links cache miss");
                    let rows = store.select(Query::Links).await?;
                    rows.iter().map(decode::link).collect()
                })
                .await,
        )
    }

    pub async fn get_link_categories(&self) -> Result<Vec<String>> {
        let mut categories: Vec<String> = self.get_links().await?.into_iter().map(|link| link.category_title).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    pub async fn get_links_by_category(&self, category: &str) -> Result<Vec<Link>> {
        Ok(self.get_links().await?.into_iter().filter(|link| link.category_title == category).collect())
    }

    async fn line_graph(&self) -> Result<Arc<LineGraph>> {
        let store = self.store.clone();
        let stops = self.get_all_stops(None).await?;
        unwrap_cached(
            self.line_graph
                .try_get_with((), async move {
                    log::trace!("line_graph cache miss");
                    let rows = store.select(Query::LineGraphEdges).await?;
                    let transfer_weight = stops
                        .into_iter()
                        .map(|stop| (stop.id, stop.transfer_weight))
                        .collect::<std::collections::HashMap<StopId, u32>>();
                    let edges = rows
                        .iter()
                        .map(|row| {
                            let a = row.text("stop1_id").ok_or_else(|| ReaderError::Decode("missing column stop1_id".to_owned()))?;
                            let b = row.text("stop2_id").ok_or_else(|| ReaderError::Decode("missing column stop2_id".to_owned()))?;
                            Ok((Id::new(a.to_owned()), Id::new(b.to_owned())))
                        })
                        .collect::<error::Result<Vec<(StopId, StopId)>>>()?;
                    Ok(Arc::new(LineGraph::new(&edges, transfer_weight)))
                })
                .await,
        )
    }

    pub async fn get_line_graph_paths(&self, origin: &StopId, destination: &StopId) -> Result<Vec<Vec<StopId>>> {
        Ok(self.line_graph().await?.get_paths(origin, destination))
    }

    pub async fn get_line_graph_next_stops(&self, origin: &StopId, destination: &StopId, stop: &StopId) -> Result<Vec<StopId>> {
        Ok(self.line_graph().await?.get_next_stops(origin, destination, stop))
    }
}

