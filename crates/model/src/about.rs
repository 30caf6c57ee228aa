use serde::{Deserialize, Serialize};
use utility::time::Date;

/// `rt_about`: single-row metadata describing the loaded schedule snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct About {
    pub compile_date: Date,
    pub gtfs_publish_date: Date,
    pub start_date: Date,
    pub end_date: Date,
    pub version: String,
    pub notes: Option<String>,
}
