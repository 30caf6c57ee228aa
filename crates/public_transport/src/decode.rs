//! Converts untyped `database::Row`s into validated `model` entities. This
//! is the one place raw column names from §6's store schema are known;
//! everything above the query layer only sees typed entities.

use database::Row;
use model::about::About;
use model::agency::Agency;
use model::calendar::{Service, ServiceException, ServiceExceptionType};
use model::direction::Direction;
use model::holiday::Holiday;
use model::link::Link;
use model::route::{Route, RouteType};
use model::shape::{Shape, ShapePoint};
use model::stop::{LocationType, Stop, StopFields, WheelchairBoarding};
use model::stop_time::{DropOffType, PickupType, StopTime, StopTimeFields, Timepoint};
use model::trip::{BikesAllowed, PeakIndicator, Trip, WheelchairAccessible};
use utility::id::Id;
use utility::time::{Date, Time};

use crate::error::{ReaderError, Result};

fn missing(column: &str) -> ReaderError {
    ReaderError::Decode(format!("missing column {column}"))
}

fn date_column(row: &Row, column: &str) -> Result<Date> {
    let value = row.integer(column).ok_or_else(|| missing(column))?;
    Date::from_yyyymmdd(value as i32).map_err(|why| ReaderError::Decode(why.to_string()))
}

pub fn about(row: &Row) -> Result<About> {
    Ok(About {
        compile_date: date_column(row, "compile_date")?,
        gtfs_publish_date: date_column(row, "gtfs_publish_date")?,
        start_date: date_column(row, "start_date")?,
        end_date: date_column(row, "end_date")?,
        version: row.text("version").ok_or_else(|| missing("version"))?.to_owned(),
        notes: row.text("notes").map(str::to_owned),
    })
}

pub fn agency(row: &Row) -> Result<Agency> {
    Ok(Agency {
        id: Id::new(row.text("agency_id").ok_or_else(|| missing("agency_id"))?.to_owned()),
        name: row.text("agency_name").ok_or_else(|| missing("agency_name"))?.to_owned(),
        url: row.text("agency_url").ok_or_else(|| missing("agency_url"))?.to_owned(),
        timezone: row.text("agency_timezone").ok_or_else(|| missing("agency_timezone"))?.to_owned(),
        lang: row.text("agency_lang").map(str::to_owned),
        phone: row.text("agency_phone").map(str::to_owned),
        fare_url: row.text("agency_fare_url").map(str::to_owned),
        email: row.text("agency_email").map(str::to_owned),
    })
}

fn route_type(value: i64) -> Result<RouteType> {
    match value {
        0 => Ok(RouteType::LightRail),
        1 => Ok(RouteType::Subway),
        2 => Ok(RouteType::Rail),
        3 => Ok(RouteType::Bus),
        4 => Ok(RouteType::Ferry),
        5 => Ok(RouteType::CableCar),
        6 => Ok(RouteType::Gondola),
        7 => Ok(RouteType::Funicular),
        other => Err(ReaderError::Decode(format!("unknown route_type {other}"))),
    }
}

pub fn route(row: &Row) -> Result<Route> {
    Ok(Route::new(
        Id::new(row.text("route_id").ok_or_else(|| missing("route_id"))?.to_owned()),
        row.text("route_short_name").map(str::to_owned),
        row.text("route_long_name").map(str::to_owned),
        route_type(row.integer("route_type").ok_or_else(|| missing("route_type"))?)?,
        row.text("agency_id").map(|id| Id::new(id.to_owned())),
        row.text("route_color").map(str::to_owned),
        row.text("route_text_color").map(str::to_owned),
        row.text("route_desc").map(str::to_owned),
        row.text("route_url").map(str::to_owned),
        row.integer("route_sort_order").map(|v| v as i32),
    )?)
}

/// `name` is resolved per §4.D's fallback rule before this is called:
/// operator `display_name` if present and non-empty, else the raw
/// `stop_name`.
pub fn stop(row: &Row) -> Result<Stop> {
    let gtfs_name = row.text("stop_name").ok_or_else(|| missing("stop_name"))?;
    let name = row
        .text("display_name")
        .filter(|name| !name.is_empty())
        .unwrap_or(gtfs_name)
        .to_owned();
    let wheelchair_boarding = match row.integer("wheelchair_boarding") {
        Some(0) | None => WheelchairBoarding::Unknown,
        Some(1) => WheelchairBoarding::Yes,
        Some(2) => WheelchairBoarding::No,
        Some(other) => return Err(ReaderError::Decode(format!("unknown wheelchair_boarding {other}"))),
    };
    let location_type = match row.integer("location_type") {
        Some(0) | None => LocationType::StopOrPlatform,
        Some(1) => LocationType::Station,
        Some(2) => LocationType::EntranceExit,
        Some(3) => LocationType::GenericNode,
        Some(4) => LocationType::BoardingArea,
        Some(other) => return Err(ReaderError::Decode(format!("unknown location_type {other}"))),
    };
    Ok(Stop::new(StopFields {
        id: Id::new(row.text("stop_id").ok_or_else(|| missing("stop_id"))?.to_owned()),
        name,
        latitude: row.real("stop_lat").ok_or_else(|| missing("stop_lat"))?,
        longitude: row.real("stop_lon").ok_or_else(|| missing("stop_lon"))?,
        url: row.text("stop_url").map(str::to_owned),
        wheelchair_boarding,
        status_id: row.text("status_id").map(str::to_owned),
        transfer_weight: row.integer("transfer_weight").unwrap_or(0),
        code: row.text("stop_code").map(str::to_owned),
        description: row.text("stop_desc").map(str::to_owned),
        zone_id: row.text("zone_id").map(str::to_owned),
        location_type,
        parent_station: row.text("parent_station").map(|id| Id::new(id.to_owned())),
        timezone: row.text("stop_timezone").map(str::to_owned),
    })?)
}

fn stop_time_of_day(row: &Row, text_column: &str, seconds_column: &str) -> Result<Time> {
    if let Some(seconds) = row.integer(seconds_column) {
        return Time::from_seconds(seconds).map_err(|why| ReaderError::Decode(why.to_string()));
    }
    row.text(text_column)
        .ok_or_else(|| missing(text_column))?
        .parse()
        .map_err(|why: utility::time::TimeParseError| ReaderError::Decode(why.to_string()))
}

pub fn stop_time(row: &Row, service_date: Date) -> Result<StopTime> {
    let pickup_type = match row.integer("pickup_type") {
        Some(0) | None => PickupType::Regular,
        Some(1) => PickupType::None,
        Some(2) => PickupType::PhoneAgency,
        Some(3) => PickupType::CoordinateWithDriver,
        Some(other) => return Err(ReaderError::Decode(format!("unknown pickup_type {other}"))),
    };
    let drop_off_type = match row.integer("drop_off_type") {
        Some(0) | None => DropOffType::Regular,
        Some(1) => DropOffType::None,
        Some(2) => DropOffType::PhoneAgency,
        Some(3) => DropOffType::CoordinateWithDriver,
        Some(other) => return Err(ReaderError::Decode(format!("unknown drop_off_type {other}"))),
    };
    let timepoint = match row.integer("timepoint") {
        Some(0) => Timepoint::Approximate,
        Some(1) | None => Timepoint::Exact,
        Some(other) => return Err(ReaderError::Decode(format!("unknown timepoint {other}"))),
    };
    Ok(StopTime::new(StopTimeFields {
        stop_id: Id::new(row.text("stop_id").ok_or_else(|| missing("stop_id"))?.to_owned()),
        arrival: stop_time_of_day(row, "arrival_time", "arrival_time_seconds")?,
        departure: stop_time_of_day(row, "departure_time", "departure_time_seconds")?,
        sequence: row.integer("stop_sequence").ok_or_else(|| missing("stop_sequence"))? as u32,
        pickup_type,
        drop_off_type,
        headsign: row.text("stop_headsign").map(str::to_owned),
        shape_distance_traveled: row.real("shape_dist_traveled"),
        timepoint,
        service_date,
    })?)
}

pub fn trip(row: &Row, stop_times: Vec<StopTime>) -> Result<Trip> {
    let wheelchair_accessible = match row.integer("wheelchair_accessible") {
        Some(0) | None => WheelchairAccessible::Unknown,
        Some(1) => WheelchairAccessible::Yes,
        Some(2) => WheelchairAccessible::No,
        Some(other) => return Err(ReaderError::Decode(format!("unknown wheelchair_accessible {other}"))),
    };
    let bikes_allowed = match row.integer("bikes_allowed") {
        Some(0) | None => BikesAllowed::Unknown,
        Some(1) => BikesAllowed::Yes,
        Some(2) => BikesAllowed::No,
        Some(other) => return Err(ReaderError::Decode(format!("unknown bikes_allowed {other}"))),
    };
    let peak_indicator = match row.integer("peak") {
        Some(0) | None => PeakIndicator::Off,
        Some(1) => PeakIndicator::On,
        Some(2) => PeakIndicator::WeekdayOnly,
        Some(other) => return Err(ReaderError::Decode(format!("unknown peak indicator {other}"))),
    };
    Ok(Trip::new(
        Id::new(row.text("trip_id").ok_or_else(|| missing("trip_id"))?.to_owned()),
        Id::new(row.text("route_id").ok_or_else(|| missing("route_id"))?.to_owned()),
        Id::new(row.text("service_id").ok_or_else(|| missing("service_id"))?.to_owned()),
        stop_times,
        row.text("trip_headsign").map(str::to_owned),
        row.text("trip_short_name").map(str::to_owned),
        row.text("block_id").map(str::to_owned),
        row.text("shape_id").map(|id| Id::new(id.to_owned())),
        row.text("direction_id").map(|id| Id::new(id.to_owned())),
        wheelchair_accessible,
        bikes_allowed,
        peak_indicator,
    )?)
}

pub fn service(row: &Row, exceptions: Vec<ServiceException>) -> Result<Service> {
    let flag = |column: &str| row.boolean(column).unwrap_or(false);
    Ok(Service::new(
        Id::new(row.text("service_id").ok_or_else(|| missing("service_id"))?.to_owned()),
        [
            flag("monday"),
            flag("tuesday"),
            flag("wednesday"),
            flag("thursday"),
            flag("friday"),
            flag("saturday"),
            flag("sunday"),
        ],
        date_column(row, "start_date")?,
        date_column(row, "end_date")?,
        exceptions,
    )?)
}

pub fn service_exception(row: &Row) -> Result<ServiceException> {
    let exception_type = match row.integer("exception_type") {
        Some(1) => ServiceExceptionType::Added,
        Some(2) => ServiceExceptionType::Removed,
        other => return Err(ReaderError::Decode(format!("unknown exception_type {other:?}"))),
    };
    Ok(ServiceException {
        service_id: Id::new(row.text("service_id").ok_or_else(|| missing("service_id"))?.to_owned()),
        date: date_column(row, "date")?,
        exception_type,
    })
}

pub fn holiday(row: &Row) -> Result<Holiday> {
    Ok(Holiday {
        date: date_column(row, "date")?,
        name: row.text("holiday_name").ok_or_else(|| missing("holiday_name"))?.to_owned(),
        peak: row.boolean("peak").unwrap_or(false),
        service_info: row.text("service_info").unwrap_or_default().to_owned(),
    })
}

pub fn direction(row: &Row) -> Result<Direction> {
    Ok(Direction {
        id: Id::new(row.text("direction_id").ok_or_else(|| missing("direction_id"))?.to_owned()),
        description: row.text("description").unwrap_or_default().to_owned(),
    })
}

pub fn shape_point(row: &Row) -> Result<(String, ShapePoint)> {
    Ok((
        row.text("shape_id").ok_or_else(|| missing("shape_id"))?.to_owned(),
        ShapePoint {
            latitude: row.real("shape_pt_lat").ok_or_else(|| missing("shape_pt_lat"))?,
            longitude: row.real("shape_pt_lon").ok_or_else(|| missing("shape_pt_lon"))?,
            sequence: row.integer("shape_pt_sequence").ok_or_else(|| missing("shape_pt_sequence"))? as u32,
            distance_traveled: row.real("shape_dist_traveled"),
        },
    ))
}

/// Groups shape-point rows by `shape_id` into sorted `Shape`s.
pub fn shapes(rows: Vec<Row>) -> Result<Vec<Shape>> {
    let mut by_id: std::collections::HashMap<String, Vec<ShapePoint>> = std::collections::HashMap::new();
    for row in &rows {
        let (id, point) = shape_point(row)?;
        by_id.entry(id).or_default().push(point);
    }
    Ok(by_id
        .into_iter()
        .map(|(id, points)| Shape::new(Id::new(id), points))
        .collect())
}

pub fn link(row: &Row) -> Result<Link> {
    Ok(Link {
        category_title: row.text("link_category_title").unwrap_or_default().to_owned(),
        title: row.text("link_title").ok_or_else(|| missing("link_title"))?.to_owned(),
        description: row.text("link_description").unwrap_or_default().to_owned(),
        url: row.text("link_url").ok_or_else(|| missing("link_url"))?.to_owned(),
    })
}
