use chrono::Weekday;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use utility::id::{HasId, Id};
use utility::time::Date;

use crate::error::ValidationError;

pub type ServiceId = Id<Service>;

/// `gtfs_calendar`: a weekly repeating pattern of service between two dates.
/// Unlike the multi-window representation this collapses from, a schedule
/// snapshot has exactly one calendar row per service id — there is no
/// multi-origin reconciliation to merge windows from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub start_date: Date,
    pub end_date: Date,
    pub exceptions: Vec<ServiceException>,
}

impl HasId for Service {
    type IdType = String;
}

impl Service {
    pub fn new(
        id: ServiceId,
        weekdays: [bool; 7],
        start_date: Date,
        end_date: Date,
        exceptions: Vec<ServiceException>,
    ) -> Result<Self, ValidationError> {
        if id.raw().trim().is_empty() {
            return Err(ValidationError::EmptyId("service.id"));
        }
        let [monday, tuesday, wednesday, thursday, friday, saturday, sunday] = weekdays;
        Ok(Self {
            id,
            monday,
            tuesday,
            wednesday,
            thursday,
            friday,
            saturday,
            sunday,
            start_date,
            end_date,
            exceptions,
        })
    }

    fn runs_on_weekday(&self, weekday: Weekday) -> bool {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    /// Whether this service's *base calendar* (ignoring exceptions) covers
    /// `date`: the weekday flag matches and `date` falls within
    /// `[start_date, end_date]`.
    pub fn is_default_on(&self, date: Date) -> bool {
        date >= self.start_date && date <= self.end_date && self.runs_on_weekday(date.weekday())
    }
}

#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy)]
#[repr(u8)]
pub enum ServiceExceptionType {
    Added = 1,
    Removed = 2,
}

/// `gtfs_calendar_dates`: an override that adds or removes a service on a
/// specific date, independent of the weekly base calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceException {
    pub service_id: ServiceId,
    pub date: Date,
    pub exception_type: ServiceExceptionType,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weekday_service() -> Service {
        Service::new(
            Id::new("weekday".to_owned()),
            [true, true, true, true, true, false, false],
            Date::from_yyyymmdd(20240101).unwrap(),
            Date::from_yyyymmdd(20241231).unwrap(),
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn default_on_matches_weekday_and_range() {
        let service = weekday_service();
        // 2024-03-05 is a Tuesday.
        assert!(service.is_default_on(Date::from_yyyymmdd(20240305).unwrap()));
        // 2024-03-09 is a Saturday.
        assert!(!service.is_default_on(Date::from_yyyymmdd(20240309).unwrap()));
        // Out of range entirely.
        assert!(!service.is_default_on(Date::from_yyyymmdd(20250305).unwrap()));
    }
}
