use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row as SqlxRow, TypeInfo};

use crate::query::Query;
use crate::{ColumnValue, Result, Row, ScheduleStore, StoreError};

/// Connection parameters for the Postgres-backed store, read from the
/// environment the host configures (persistence setup itself is out of
/// scope here — only the connection shape is).
pub struct ConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
}

impl ConnectionInfo {
    pub fn from_env() -> Option<Self> {
        use std::env;
        Some(Self {
            username: env::var("DATABASE_USER").ok()?,
            password: env::var("DATABASE_PASSWORD").ok()?,
            hostname: env::var("DATABASE_HOST").ok()?,
            port: env::var("DATABASE_PORT").ok()?.parse().ok()?,
            database: env::var("DATABASE_NAME").ok()?,
        })
    }

    fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.hostname, self.port, self.database
        )
    }
}

/// Read-only `ScheduleStore` backed by a Postgres pool, querying the §6
/// table schema directly. Operator-extension tables (`rt_*`) are left
/// joined in SQL rather than pre-joined ahead of time, unlike
/// `InMemoryScheduleStore`.
#[derive(Clone)]
pub struct PgScheduleStore {
    pool: sqlx::PgPool,
}

impl PgScheduleStore {
    pub async fn connect(info: ConnectionInfo) -> Result<Self> {
        let pool = sqlx::postgres::PgPool::connect(&info.url())
            .await
            .map_err(|why| StoreError::new(Query::About, why))?;
        Ok(Self { pool })
    }

    async fn fetch_all(&self, query: &Query, sql: &str, bind: impl FnOnce(sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>) -> Result<Vec<Row>> {
        let bound = bind(sqlx::query(sql));
        let rows = bound.fetch_all(&self.pool).await.map_err(|why| {
            log::warn!("schedule store query {query:?} failed: {why}");
            StoreError::new(query.clone(), why)
        })?;
        Ok(rows.into_iter().map(to_row).collect())
    }
}

#[async_trait]
impl ScheduleStore for PgScheduleStore {
    async fn get(&self, query: Query) -> Result<Option<Row>> {
        Ok(self.select(query).await?.into_iter().next())
    }

    async fn select(&self, query: Query) -> Result<Vec<Row>> {
        match &query {
            Query::About => {
                self.fetch_all(
                    &query,
                    "SELECT compile_date, gtfs_publish_date, start_date, end_date, version, notes FROM rt_about;",
                    |q| q,
                )
                .await
            }
            Query::ServiceById(id) => {
                self.fetch_all(
                    &query,
                    "SELECT service_id, monday, tuesday, wednesday, thursday, friday, saturday, sunday, start_date, end_date
                     FROM gtfs_calendar WHERE service_id = $1;",
                    |q| q.bind(id.clone()),
                )
                .await
            }
            Query::ServicesByIds(ids) => {
                self.fetch_all(
                    &query,
                    "SELECT service_id, monday, tuesday, wednesday, thursday, friday, saturday, sunday, start_date, end_date
                     FROM gtfs_calendar WHERE service_id = ANY($1);",
                    |q| q.bind(ids.clone()),
                )
                .await
            }
            Query::ServicesDefaultForDate(date) => {
                self.fetch_all(
                    &query,
                    "SELECT service_id, monday, tuesday, wednesday, thursday, friday, saturday, sunday, start_date, end_date
                     FROM gtfs_calendar
                     WHERE start_date <= $1 AND end_date >= $1
                     AND (CASE EXTRACT(ISODOW FROM TO_DATE($1::text, 'YYYYMMDD'))
                        WHEN 1 THEN monday WHEN 2 THEN tuesday WHEN 3 THEN wednesday
                        WHEN 4 THEN thursday WHEN 5 THEN friday WHEN 6 THEN saturday
                        ELSE sunday END);",
                    |q| q.bind(date.to_yyyymmdd()),
                )
                .await
            }
            Query::ServiceExceptionsForDate(date) => {
                self.fetch_all(
                    &query,
                    "SELECT service_id, date, exception_type FROM gtfs_calendar_dates WHERE date = $1;",
                    |q| q.bind(date.to_yyyymmdd()),
                )
                .await
            }
            Query::ServiceExceptionsByServiceId(id) => {
                self.fetch_all(
                    &query,
                    "SELECT service_id, date, exception_type FROM gtfs_calendar_dates WHERE service_id = $1;",
                    |q| q.bind(id.clone()),
                )
                .await
            }
            Query::RouteById(id) => {
                self.fetch_all(
                    &query,
                    "SELECT r.route_id, r.agency_id, r.route_short_name, r.route_long_name, r.route_desc,
                            r.route_type, r.route_url, r.route_color, r.route_text_color, r.route_sort_order
                     FROM gtfs_routes r WHERE r.route_id = $1;",
                    |q| q.bind(id.clone()),
                )
                .await
            }
            Query::RoutesByIds(ids) => {
                self.fetch_all(
                    &query,
                    "SELECT route_id, agency_id, route_short_name, route_long_name, route_desc,
                            route_type, route_url, route_color, route_text_color, route_sort_order
                     FROM gtfs_routes WHERE route_id = ANY($1);",
                    |q| q.bind(ids.clone()),
                )
                .await
            }
            Query::AllRoutes => {
                self.fetch_all(
                    &query,
                    "SELECT route_id, agency_id, route_short_name, route_long_name, route_desc,
                            route_type, route_url, route_color, route_text_color, route_sort_order
                     FROM gtfs_routes ORDER BY route_long_name;",
                    |q| q,
                )
                .await
            }
            Query::StopById(id) => {
                self.fetch_all(
                    &query,
                    "SELECT s.stop_id, s.stop_code, s.stop_name, s.stop_desc, s.stop_lat, s.stop_lon,
                            s.zone_id, s.stop_url, s.location_type, s.parent_station, s.stop_timezone,
                            s.wheelchair_boarding, e.status_id, e.display_name, e.transfer_weight,
                            (SELECT string_agg(a.alt_name, '|') FROM rt_alt_stop_names a WHERE a.stop_id = s.stop_id) AS alt_names
                     FROM gtfs_stops s LEFT JOIN rt_stops_extra e ON e.stop_id = s.stop_id
                     WHERE s.stop_id = $1;",
                    |q| q.bind(id.clone()),
                )
                .await
            }
            Query::StopsByIds(ids) => {
                self.fetch_all(
                    &query,
                    "SELECT s.stop_id, s.stop_code, s.stop_name, s.stop_desc, s.stop_lat, s.stop_lon,
                            s.zone_id, s.stop_url, s.location_type, s.parent_station, s.stop_timezone,
                            s.wheelchair_boarding, e.status_id, e.display_name, e.transfer_weight,
                            (SELECT string_agg(a.alt_name, '|') FROM rt_alt_stop_names a WHERE a.stop_id = s.stop_id) AS alt_names
                     FROM gtfs_stops s LEFT JOIN rt_stops_extra e ON e.stop_id = s.stop_id
                     WHERE s.stop_id = ANY($1);",
                    |q| q.bind(ids.clone()),
                )
                .await
            }
            Query::StopByStatusId(status_id) => {
                self.fetch_all(
                    &query,
                    "SELECT s.stop_id, s.stop_code, s.stop_name, s.stop_desc, s.stop_lat, s.stop_lon,
                            s.zone_id, s.stop_url, s.location_type, s.parent_station, s.stop_timezone,
                            s.wheelchair_boarding, e.status_id, e.display_name, e.transfer_weight,
                            (SELECT string_agg(a.alt_name, '|') FROM rt_alt_stop_names a WHERE a.stop_id = s.stop_id) AS alt_names
                     FROM gtfs_stops s JOIN rt_stops_extra e ON e.stop_id = s.stop_id
                     WHERE e.status_id = $1;",
                    |q| q.bind(status_id.clone()),
                )
                .await
            }
            Query::AllStops => {
                self.fetch_all(
                    &query,
                    "SELECT s.stop_id, s.stop_code, s.stop_name, s.stop_desc, s.stop_lat, s.stop_lon,
                            s.zone_id, s.stop_url, s.location_type, s.parent_station, s.stop_timezone,
                            s.wheelchair_boarding, e.status_id, e.display_name, e.transfer_weight,
                            (SELECT string_agg(a.alt_name, '|') FROM rt_alt_stop_names a WHERE a.stop_id = s.stop_id) AS alt_names
                     FROM gtfs_stops s LEFT JOIN rt_stops_extra e ON e.stop_id = s.stop_id
                     ORDER BY s.stop_name;",
                    |q| q,
                )
                .await
            }
            Query::StopsByRoute(route_id) => {
                self.fetch_all(
                    &query,
                    "SELECT DISTINCT s.stop_id, s.stop_code, s.stop_name, s.stop_desc, s.stop_lat, s.stop_lon,
                            s.zone_id, s.stop_url, s.location_type, s.parent_station, s.stop_timezone,
                            s.wheelchair_boarding, e.status_id, e.display_name, e.transfer_weight,
                            (SELECT string_agg(a.alt_name, '|') FROM rt_alt_stop_names a WHERE a.stop_id = s.stop_id) AS alt_names
                     FROM gtfs_stops s
                     LEFT JOIN rt_stops_extra e ON e.stop_id = s.stop_id
                     JOIN gtfs_stop_times st ON st.stop_id = s.stop_id
                     JOIN gtfs_trips t ON t.trip_id = st.trip_id
                     WHERE t.route_id = $1
                     ORDER BY s.stop_name;",
                    |q| q.bind(route_id.clone()),
                )
                .await
            }
            Query::StopTimesByTrip(trip_id) => {
                self.fetch_all(
                    &query,
                    "SELECT trip_id, arrival_time, arrival_time_seconds, departure_time, departure_time_seconds,
                            stop_id, stop_sequence, stop_headsign, pickup_type, drop_off_type, shape_dist_traveled, timepoint
                     FROM gtfs_stop_times WHERE trip_id = $1 ORDER BY stop_sequence;",
                    |q| q.bind(trip_id.clone()),
                )
                .await
            }
            Query::TripById(id) => {
                self.fetch_all(
                    &query,
                    "SELECT trip_id, route_id, service_id, trip_headsign, trip_short_name, direction_id,
                            block_id, shape_id, wheelchair_accessible, bikes_allowed, peak
                     FROM gtfs_trips WHERE trip_id = $1;",
                    |q| q.bind(id.clone()),
                )
                .await
            }
            Query::TripsByDate(date) => {
                self.fetch_all(
                    &query,
                    "SELECT DISTINCT t.trip_id, t.route_id, t.service_id, t.trip_headsign, t.trip_short_name,
                            t.direction_id, t.block_id, t.shape_id, t.wheelchair_accessible, t.bikes_allowed, t.peak
                     FROM gtfs_trips t
                     JOIN gtfs_calendar c ON c.service_id = t.service_id
                     WHERE c.start_date <= $1 AND c.end_date >= $1;",
                    |q| q.bind(date.to_yyyymmdd()),
                )
                .await
            }
            Query::Holidays => {
                self.fetch_all(
                    &query,
                    "SELECT date, holiday_name, peak, service_info FROM rt_holidays;",
                    |q| q,
                )
                .await
            }
            Query::HolidayByDate(date) => {
                self.fetch_all(
                    &query,
                    "SELECT date, holiday_name, peak, service_info FROM rt_holidays WHERE date = $1;",
                    |q| q.bind(date.to_yyyymmdd()),
                )
                .await
            }
            Query::Directions => {
                self.fetch_all(&query, "SELECT direction_id, description FROM gtfs_directions;", |q| q)
                    .await
            }
            Query::DirectionById(id) => {
                self.fetch_all(
                    &query,
                    "SELECT direction_id, description FROM gtfs_directions WHERE direction_id = $1;",
                    |q| q.bind(id.clone()),
                )
                .await
            }
            Query::Shapes => {
                self.fetch_all(
                    &query,
                    "SELECT shape_id, shape_pt_lat, shape_pt_lon, shape_pt_sequence, shape_dist_traveled
                     FROM gtfs_shapes ORDER BY shape_id, shape_pt_sequence;",
                    |q| q,
                )
                .await
            }
            Query::ShapeById(id) => {
                self.fetch_all(
                    &query,
                    "SELECT shape_id, shape_pt_lat, shape_pt_lon, shape_pt_sequence, shape_dist_traveled
                     FROM gtfs_shapes WHERE shape_id = $1 ORDER BY shape_pt_sequence;",
                    |q| q.bind(id.clone()),
                )
                .await
            }
            Query::Links => {
                self.fetch_all(
                    &query,
                    "SELECT link_category_title, link_title, link_description, link_url FROM rt_links;",
                    |q| q,
                )
                .await
            }
            Query::LineGraphEdges => {
                self.fetch_all(&query, "SELECT stop1_id, stop2_id FROM rt_line_graph;", |q| q)
                    .await
            }
        }
    }
}

/// Converts a raw Postgres row into our untyped `Row` by column type,
/// trying the narrowest applicable Rust type per Postgres type name.
fn to_row(pg_row: PgRow) -> Row {
    let mut row = Row::new();
    for column in pg_row.columns() {
        let name = column.name().to_owned();
        let value = match column.type_info().name() {
            "INT2" | "INT4" | "INT8" => pg_row
                .try_get::<Option<i64>, _>(name.as_str())
                .ok()
                .flatten()
                .map_or(ColumnValue::Null, ColumnValue::Integer),
            "FLOAT4" | "FLOAT8" | "NUMERIC" => pg_row
                .try_get::<Option<f64>, _>(name.as_str())
                .ok()
                .flatten()
                .map_or(ColumnValue::Null, ColumnValue::Real),
            "BOOL" => pg_row
                .try_get::<Option<bool>, _>(name.as_str())
                .ok()
                .flatten()
                .map_or(ColumnValue::Null, ColumnValue::Bool),
            _ => pg_row
                .try_get::<Option<String>, _>(name.as_str())
                .ok()
                .flatten()
                .map_or(ColumnValue::Null, ColumnValue::Text),
        };
        row.set(name, value);
    }
    row
}
