use async_trait::async_trait;

use crate::query::Query;
use crate::{Result, Row, ScheduleStore};

/// A read-only, pre-loaded snapshot held entirely in memory. Rows for each
/// logical table are pre-joined with their operator-extension counterpart
/// at construction time (`rt_stops_extra` into `gtfs_stops`, etc.) — an
/// in-memory store is free to do that eagerly since §4.C leaves the query
/// format implementation-defined; `PgScheduleStore` does the equivalent
/// join in SQL.
///
/// Loading a schedule snapshot into this shape (from GTFS CSVs or
/// elsewhere) is a persistence-setup concern and out of scope here (§1);
/// callers construct an instance directly from already-decoded rows, which
/// is how the test suite exercises it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScheduleStore {
    pub about: Option<Row>,
    pub services: Vec<Row>,
    pub service_exceptions: Vec<Row>,
    pub routes: Vec<Row>,
    pub stops: Vec<Row>,
    pub stop_times: Vec<Row>,
    pub trips: Vec<Row>,
    pub holidays: Vec<Row>,
    pub directions: Vec<Row>,
    pub shape_points: Vec<Row>,
    pub links: Vec<Row>,
    pub line_graph_edges: Vec<Row>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_one<'a>(rows: &'a [Row], column: &str, value: &str) -> Option<&'a Row> {
        rows.iter().find(|row| row.text(column) == Some(value))
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn get(&self, query: Query) -> Result<Option<Row>> {
        let row = match &query {
            Query::About => self.about.clone(),
            Query::ServiceById(id) => Self::find_one(&self.services, "service_id", id).cloned(),
            Query::RouteById(id) => Self::find_one(&self.routes, "route_id", id).cloned(),
            Query::StopById(id) => Self::find_one(&self.stops, "stop_id", id).cloned(),
            Query::StopByStatusId(status_id) => {
                Self::find_one(&self.stops, "status_id", status_id).cloned()
            }
            Query::TripById(id) => Self::find_one(&self.trips, "trip_id", id).cloned(),
            Query::HolidayByDate(date) => self
                .holidays
                .iter()
                .find(|row| row.integer("date") == Some(i64::from(date.to_yyyymmdd())))
                .cloned(),
            Query::DirectionById(id) => {
                Self::find_one(&self.directions, "direction_id", id).cloned()
            }
            Query::ShapeById(id) => Self::find_one(&self.shape_points, "shape_id", id).cloned(),
            other => self.select(other.clone()).await?.into_iter().next(),
        };
        Ok(row)
    }

    async fn select(&self, query: Query) -> Result<Vec<Row>> {
        let rows = match query {
            Query::About => self.about.iter().cloned().collect(),
            Query::ServiceById(id) => self
                .services
                .iter()
                .filter(|row| row.text("service_id") == Some(id.as_str()))
                .cloned()
                .collect(),
            Query::ServicesByIds(ids) => self
                .services
                .iter()
                .filter(|row| row.text("service_id").is_some_and(|v| ids.iter().any(|id| id == v)))
                .cloned()
                .collect(),
            Query::ServicesDefaultForDate(date) => {
                let weekday_column = weekday_column(date);
                let yyyymmdd = i64::from(date.to_yyyymmdd());
                self.services
                    .iter()
                    .filter(|row| {
                        row.boolean(weekday_column).unwrap_or(false)
                            && row.integer("start_date").is_some_and(|v| v <= yyyymmdd)
                            && row.integer("end_date").is_some_and(|v| v >= yyyymmdd)
                    })
                    .cloned()
                    .collect()
            }
            Query::ServiceExceptionsForDate(date) => {
                let yyyymmdd = i64::from(date.to_yyyymmdd());
                self.service_exceptions
                    .iter()
                    .filter(|row| row.integer("date") == Some(yyyymmdd))
                    .cloned()
                    .collect()
            }
            Query::ServiceExceptionsByServiceId(id) => self
                .service_exceptions
                .iter()
                .filter(|row| row.text("service_id") == Some(id.as_str()))
                .cloned()
                .collect(),
            Query::RouteById(id) => self
                .routes
                .iter()
                .filter(|row| row.text("route_id") == Some(id.as_str()))
                .cloned()
                .collect(),
            Query::RoutesByIds(ids) => self
                .routes
                .iter()
                .filter(|row| row.text("route_id").is_some_and(|v| ids.iter().any(|id| id == v)))
                .cloned()
                .collect(),
            Query::AllRoutes => self.routes.clone(),
            Query::StopById(id) => self
                .stops
                .iter()
                .filter(|row| row.text("stop_id") == Some(id.as_str()))
                .cloned()
                .collect(),
            Query::StopsByIds(ids) => self
                .stops
                .iter()
                .filter(|row| row.text("stop_id").is_some_and(|v| ids.iter().any(|id| id == v)))
                .cloned()
                .collect(),
            Query::StopByStatusId(status_id) => self
                .stops
                .iter()
                .filter(|row| row.text("status_id") == Some(status_id.as_str()))
                .cloned()
                .collect(),
            Query::AllStops => self.stops.clone(),
            Query::StopsByRoute(route_id) => {
                let trip_ids: Vec<&str> = self
                    .trips
                    .iter()
                    .filter(|row| row.text("route_id") == Some(route_id.as_str()))
                    .filter_map(|row| row.text("trip_id"))
                    .collect();
                let stop_ids: Vec<&str> = self
                    .stop_times
                    .iter()
                    .filter(|row| row.text("trip_id").is_some_and(|v| trip_ids.contains(&v)))
                    .filter_map(|row| row.text("stop_id"))
                    .collect();
                self.stops
                    .iter()
                    .filter(|row| row.text("stop_id").is_some_and(|v| stop_ids.contains(&v)))
                    .cloned()
                    .collect()
            }
            Query::StopTimesByTrip(trip_id) => self
                .stop_times
                .iter()
                .filter(|row| row.text("trip_id") == Some(trip_id.as_str()))
                .cloned()
                .collect(),
            Query::TripById(id) => self
                .trips
                .iter()
                .filter(|row| row.text("trip_id") == Some(id.as_str()))
                .cloned()
                .collect(),
            Query::TripsByDate(date) => {
                let yyyymmdd = i64::from(date.to_yyyymmdd());
                self.trips
                    .iter()
                    .filter(|row| row.integer("service_date") == Some(yyyymmdd))
                    .cloned()
                    .collect()
            }
            Query::Holidays => self.holidays.clone(),
            Query::HolidayByDate(date) => {
                let yyyymmdd = i64::from(date.to_yyyymmdd());
                self.holidays
                    .iter()
                    .filter(|row| row.integer("date") == Some(yyyymmdd))
                    .cloned()
                    .collect()
            }
            Query::Directions => self.directions.clone(),
            Query::DirectionById(id) => self
                .directions
                .iter()
                .filter(|row| row.text("direction_id") == Some(id.as_str()))
                .cloned()
                .collect(),
            Query::Shapes => self.shape_points.clone(),
            Query::ShapeById(id) => self
                .shape_points
                .iter()
                .filter(|row| row.text("shape_id") == Some(id.as_str()))
                .cloned()
                .collect(),
            Query::Links => self.links.clone(),
            Query::LineGraphEdges => self.line_graph_edges.clone(),
        };
        Ok(rows)
    }
}

fn weekday_column(date: utility::time::Date) -> &'static str {
    use chrono::Weekday;
    match date.weekday() {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

#[cfg(test)]
mod tests {
    use utility::time::Date;

    use super::*;
    use crate::ColumnValue;

    fn stop_row(id: &str, name: &str) -> Row {
        Row::new()
            .with("stop_id", ColumnValue::Text(id.to_owned()))
            .with("stop_name", ColumnValue::Text(name.to_owned()))
    }

    #[tokio::test]
    async fn get_stop_by_id_returns_none_when_absent() {
        let store = InMemoryScheduleStore::new();
        let result = store.get(Query::StopById("missing".to_owned())).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn get_stop_by_id_finds_match() {
        let mut store = InMemoryScheduleStore::new();
        store.stops.push(stop_row("s1", "Main St"));
        let result = store
            .get(Query::StopById("s1".to_owned()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.text("stop_name"), Some("Main St"));
    }

    #[tokio::test]
    async fn services_default_for_date_filters_by_weekday_and_range() {
        let mut store = InMemoryScheduleStore::new();
        store.services.push(
            Row::new()
                .with("service_id", ColumnValue::Text("weekday".to_owned()))
                .with("monday", ColumnValue::Bool(true))
                .with("tuesday", ColumnValue::Bool(true))
                .with("wednesday", ColumnValue::Bool(true))
                .with("thursday", ColumnValue::Bool(true))
                .with("friday", ColumnValue::Bool(true))
                .with("saturday", ColumnValue::Bool(false))
                .with("sunday", ColumnValue::Bool(false))
                .with("start_date", ColumnValue::Integer(20240101))
                .with("end_date", ColumnValue::Integer(20241231)),
        );
        // 2024-03-05 is a Tuesday.
        let tuesday = Date::from_yyyymmdd(20240305).unwrap();
        let results = store
            .select(Query::ServicesDefaultForDate(tuesday))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);

        // 2024-03-09 is a Saturday.
        let saturday = Date::from_yyyymmdd(20240309).unwrap();
        let results = store
            .select(Query::ServicesDefaultForDate(saturday))
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
