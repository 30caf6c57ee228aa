use utility::time::Date;

/// A typed description of what the `public_transport` query layer needs
/// from the store. The store (in-memory or Postgres) is free to satisfy
/// each variant however it likes — linear scan, index lookup, a
/// parameterized `SELECT` — the point of `Query` being a closed enum
/// rather than a raw SQL string is that every access pattern the engine
/// uses is enumerable up front.
#[derive(Debug, Clone)]
pub enum Query {
    About,
    ServiceById(String),
    ServicesByIds(Vec<String>),
    ServicesDefaultForDate(Date),
    ServiceExceptionsForDate(Date),
    ServiceExceptionsByServiceId(String),
    RouteById(String),
    RoutesByIds(Vec<String>),
    AllRoutes,
    StopById(String),
    StopsByIds(Vec<String>),
    StopByStatusId(String),
    AllStops,
    StopsByRoute(String),
    StopTimesByTrip(String),
    TripById(String),
    TripsByDate(Date),
    Holidays,
    HolidayByDate(Date),
    Directions,
    DirectionById(String),
    Shapes,
    ShapeById(String),
    Links,
    LineGraphEdges,
}
