use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use utility::id::{HasId, Id};

use crate::agency::Agency;
use crate::error::ValidationError;

/// See <https://gtfs.org/schedule/reference/#routestxt>
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy)]
#[repr(u8)]
pub enum RouteType {
    LightRail = 0,
    Subway = 1,
    Rail = 2,
    Bus = 3,
    Ferry = 4,
    CableCar = 5,
    Gondola = 6,
    Funicular = 7,
}

pub type RouteId = Id<Route>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub route_type: RouteType,
    pub agency_id: Option<Id<Agency>>,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub sort_order: Option<i32>,
}

impl HasId for Route {
    type IdType = String;
}

impl Route {
    pub fn new(
        id: RouteId,
        short_name: Option<String>,
        long_name: Option<String>,
        route_type: RouteType,
        agency_id: Option<Id<Agency>>,
        color: Option<String>,
        text_color: Option<String>,
        description: Option<String>,
        url: Option<String>,
        sort_order: Option<i32>,
    ) -> Result<Self, ValidationError> {
        if id.raw().trim().is_empty() {
            return Err(ValidationError::EmptyId("route.id"));
        }
        Ok(Self {
            id,
            short_name,
            long_name,
            route_type,
            agency_id,
            color,
            text_color,
            description,
            url,
            sort_order,
        })
    }
}
