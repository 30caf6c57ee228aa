use serde::{Deserialize, Serialize};
use utility::time::Date;

/// `rt_holidays`: overrides peak-fare resolution for trips whose base
/// peak-indicator is `WeekdayOnly` (see `Trip::resolve_peak`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holiday {
    pub date: Date,
    pub name: String,
    pub peak: bool,
    pub service_info: String,
}
