use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

pub type DirectionId = Id<Direction>;

/// `gtfs_directions`: a human-readable label for a `Trip.direction_id`,
/// independent of GTFS `trips.direction_id`'s 0/1 encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Direction {
    pub id: DirectionId,
    pub description: String,
}

impl HasId for Direction {
    type IdType = String;
}
