use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

/// See <https://gtfs.org/schedule/reference/#agencytxt>. Referenced by
/// `Route.agency_id`; not itself part of the searchable schedule surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agency {
    pub id: Id<Agency>,
    pub name: String,
    pub url: String,
    pub timezone: String,
    pub lang: Option<String>,
    pub phone: Option<String>,
    pub fare_url: Option<String>,
    pub email: Option<String>,
}

impl HasId for Agency {
    type IdType = String;
}
