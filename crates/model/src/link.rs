use serde::{Deserialize, Serialize};

/// `rt_links`: miscellaneous operator-curated links surfaced alongside the
/// schedule (rider info pages, accessibility notices, ...), grouped by a
/// free-form category title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub category_title: String,
    pub title: String,
    pub description: String,
    pub url: String,
}
