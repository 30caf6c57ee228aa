//! Clock-time and calendar-date handling for GTFS schedules.
//!
//! GTFS stop-times may exceed "24:00:00" to describe service that continues
//! past local midnight without rolling to the next `service_id`/date — a
//! 25:30:00 departure on 2024-03-04 is the same instant as 01:30:00 on
//! 2024-03-05. [`Time`] keeps a 48-hour domain so both representations can be
//! compared directly; [`Date`] is a YYYYMMDD integer; [`DateTime`] pairs the
//! two and is the type ordering and arithmetic operate on.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Neg, Sub};

use chrono::Datelike;
use serde::{de, ser, Deserialize, Serialize};

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
const MAX_SECONDS_OF_DAY: i64 = 2 * SECONDS_PER_DAY;

const MIN_DATE: i32 = 19700101;
const MAX_DATE: i32 = 21001231;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    InvalidFormat(String),
    OutOfRange(i64),
    InvalidDate(i32),
}

impl fmt::Display for TimeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat(s) => write!(f, "could not parse time from {s:?}"),
            Self::OutOfRange(s) => write!(f, "{s} seconds is outside [0, {MAX_SECONDS_OF_DAY}]"),
            Self::InvalidDate(d) => write!(f, "{d} is outside [{MIN_DATE}, {MAX_DATE}]"),
        }
    }
}

impl std::error::Error for TimeParseError {}

/// A signed duration in whole seconds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    seconds: i64,
}

impl Duration {
    pub fn seconds(seconds: i64) -> Self {
        Self { seconds }
    }

    pub fn minutes(minutes: i64) -> Self {
        Self {
            seconds: minutes * SECONDS_PER_MINUTE,
        }
    }

    pub fn to_secs(self) -> i64 {
        self.seconds
    }

    pub fn to_mins(self) -> i64 {
        self.seconds / SECONDS_PER_MINUTE
    }
}

impl Add for Duration {
    type Output = Duration;
    fn add(self, rhs: Duration) -> Duration {
        Duration::seconds(self.seconds + rhs.seconds)
    }
}

impl Sub for Duration {
    type Output = Duration;
    fn sub(self, rhs: Duration) -> Duration {
        Duration::seconds(self.seconds - rhs.seconds)
    }
}

impl Neg for Duration {
    type Output = Duration;
    fn neg(self) -> Duration {
        Duration::seconds(-self.seconds)
    }
}

/// Seconds since local midnight, in `[0, 48*3600]`.
///
/// The upper half of the range (`>= 24*3600`) represents a time on the
/// *previous* calendar day that is still part of the same service day, per
/// GTFS convention.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time {
    seconds_since_midnight: u32,
}

impl Time {
    pub fn from_seconds(seconds: i64) -> Result<Self, TimeParseError> {
        if !(0..=MAX_SECONDS_OF_DAY).contains(&seconds) {
            return Err(TimeParseError::OutOfRange(seconds));
        }
        Ok(Self {
            seconds_since_midnight: seconds as u32,
        })
    }

    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Result<Self, TimeParseError> {
        let total = (hours as i64 * 60 + minutes as i64) * 60 + seconds as i64;
        Self::from_seconds(total)
    }

    pub fn seconds_of_day(self) -> u32 {
        self.seconds_since_midnight
    }

    fn hour(self) -> u32 {
        self.seconds_since_midnight / 3600
    }

    fn minute(self) -> u32 {
        (self.seconds_since_midnight / 60) % 60
    }

    fn second(self) -> u32 {
        self.seconds_since_midnight % 60
    }

    /// Renders "HH:MM:SS", hour unbounded past 24 (GTFS stop_times format).
    pub fn to_gtfs_string(self) -> String {
        format!("{:02}:{:02}:{:02}", self.hour(), self.minute(), self.second())
    }

    /// Renders "HHmm" with no separator, used by the operator extension feeds.
    pub fn to_hhmm(self) -> String {
        format!("{:02}{:02}", self.hour() % 100, self.minute())
    }

    /// Renders as a 12-hour clock, e.g. "12:05 AM". Hours at or past 24 are
    /// folded onto the next day's AM/PM cycle rather than shown as "25:05 AM".
    pub fn to_12_hour_string(self) -> String {
        let hour24 = self.hour() % 24;
        let (period, hour12) = match hour24 {
            0 => ("AM", 12),
            1..=11 => ("AM", hour24),
            12 => ("PM", 12),
            _ => ("PM", hour24 - 12),
        };
        format!("{}:{:02} {}", hour12, self.minute(), period)
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_gtfs_string())
    }
}

impl ser::Serialize for Time {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        self.to_gtfs_string().serialize(serializer)
    }
}

impl<'de> de::Deserialize<'de> for Time {
    fn deserialize<D>(deserializer: D) -> Result<Time, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

fn is_am_pm_suffix(s: &str) -> Option<(&str, bool)> {
    let lower = s.to_ascii_lowercase();
    if let Some(prefix) = lower.strip_suffix("am") {
        Some((&s[..prefix.len()], true))
    } else if let Some(prefix) = lower.strip_suffix("pm") {
        Some((&s[..prefix.len()], false))
    } else {
        None
    }
}

fn parse_12_hour(s: &str) -> Result<Time, TimeParseError> {
    let (digits, is_am) =
        is_am_pm_suffix(s).ok_or_else(|| TimeParseError::InvalidFormat(s.to_owned()))?;
    let digits = digits.trim();
    let (hour_str, minute_str) = digits
        .split_once(':')
        .ok_or_else(|| TimeParseError::InvalidFormat(s.to_owned()))?;
    let hour: u32 = hour_str
        .parse()
        .map_err(|_| TimeParseError::InvalidFormat(s.to_owned()))?;
    let minute: u32 = minute_str
        .parse()
        .map_err(|_| TimeParseError::InvalidFormat(s.to_owned()))?;
    if !(1..=12).contains(&hour) || minute > 59 {
        return Err(TimeParseError::InvalidFormat(s.to_owned()));
    }
    let hour24 = match (hour, is_am) {
        (12, true) => 0,
        (12, false) => 12,
        (h, true) => h,
        (h, false) => h + 12,
    };
    Time::from_hms(hour24, minute, 0)
}

impl std::str::FromStr for Time {
    type Err = TimeParseError;

    /// Accepts, in order: "h:mm AM/PM" (optional space, case-insensitive),
    /// "HH:mm:ss", "HH:mm", "HHmm", and bare integer seconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if is_am_pm_suffix(trimmed).is_some() {
            return parse_12_hour(trimmed);
        }
        if let Some((h, rest)) = trimmed.split_once(':') {
            let hour: u32 = h
                .parse()
                .map_err(|_| TimeParseError::InvalidFormat(s.to_owned()))?;
            return match rest.split_once(':') {
                Some((m, sec)) => {
                    let minute: u32 = m
                        .parse()
                        .map_err(|_| TimeParseError::InvalidFormat(s.to_owned()))?;
                    let second: u32 = sec
                        .parse()
                        .map_err(|_| TimeParseError::InvalidFormat(s.to_owned()))?;
                    Time::from_hms(hour, minute, second)
                }
                None => {
                    let minute: u32 = rest
                        .parse()
                        .map_err(|_| TimeParseError::InvalidFormat(s.to_owned()))?;
                    Time::from_hms(hour, minute, 0)
                }
            };
        }
        if trimmed.len() == 4 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            let hour: u32 = trimmed[0..2]
                .parse()
                .map_err(|_| TimeParseError::InvalidFormat(s.to_owned()))?;
            let minute: u32 = trimmed[2..4]
                .parse()
                .map_err(|_| TimeParseError::InvalidFormat(s.to_owned()))?;
            return Time::from_hms(hour, minute, 0);
        }
        let seconds: i64 = trimmed
            .parse()
            .map_err(|_| TimeParseError::InvalidFormat(s.to_owned()))?;
        Time::from_seconds(seconds)
    }
}

/// A calendar date, stored and compared as a YYYYMMDD integer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Date(i32);

impl Date {
    pub fn from_yyyymmdd(value: i32) -> Result<Self, TimeParseError> {
        if !(MIN_DATE..=MAX_DATE).contains(&value) {
            return Err(TimeParseError::InvalidDate(value));
        }
        let (year, rest) = (value / 10000, value % 10000);
        let (month, day) = (rest / 100, rest % 100);
        chrono::NaiveDate::from_ymd_opt(year, month as u32, day as u32)
            .ok_or(TimeParseError::InvalidDate(value))?;
        Ok(Self(value))
    }

    pub fn from_naive_date(date: chrono::NaiveDate) -> Self {
        Self(date.year() * 10000 + date.month() as i32 * 100 + date.day() as i32)
    }

    pub fn to_naive_date(self) -> chrono::NaiveDate {
        let (year, rest) = (self.0 / 10000, self.0 % 10000);
        let (month, day) = (rest / 100, rest % 100);
        chrono::NaiveDate::from_ymd_opt(year, month as u32, day as u32)
            .expect("Date is only constructed from already-validated YYYYMMDD values")
    }

    pub fn to_yyyymmdd(self) -> i32 {
        self.0
    }

    pub fn weekday(self) -> chrono::Weekday {
        self.to_naive_date().weekday()
    }

    pub fn weekday_name(self) -> &'static str {
        match self.weekday() {
            chrono::Weekday::Mon => "Monday",
            chrono::Weekday::Tue => "Tuesday",
            chrono::Weekday::Wed => "Wednesday",
            chrono::Weekday::Thu => "Thursday",
            chrono::Weekday::Fri => "Friday",
            chrono::Weekday::Sat => "Saturday",
            chrono::Weekday::Sun => "Sunday",
        }
    }

    pub fn add_days(self, days: i64) -> Self {
        Self::from_naive_date(self.to_naive_date() + chrono::Duration::days(days))
    }

    pub fn sub_days(self, days: i64) -> Self {
        self.add_days(-days)
    }

    fn epoch_day(self) -> i64 {
        self.to_naive_date().num_days_from_ce() as i64
    }
}

impl TryFrom<i32> for Date {
    type Error = TimeParseError;
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_yyyymmdd(value)
    }
}

impl From<Date> for i32 {
    fn from(value: Date) -> Self {
        value.0
    }
}

impl fmt::Debug for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `Time` anchored to the calendar `Date` it was constructed against.
/// Ordering and arithmetic use the absolute instant
/// `date-at-local-midnight + seconds`, so a 25:30:00 time on day N compares
/// equal to 01:30:00 on day N+1.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    date: Date,
    time: Time,
}

impl DateTime {
    pub fn new(date: Date, time: Time) -> Self {
        Self { date, time }
    }

    pub fn date(self) -> Date {
        self.date
    }

    pub fn time(self) -> Time {
        self.time
    }

    fn absolute_instant_seconds(self) -> i64 {
        self.date.epoch_day() * SECONDS_PER_DAY + self.time.seconds_of_day() as i64
    }

    /// Rolls the date by `days`, preserving the (possibly >24h) seconds value.
    pub fn add_days(self, days: i64) -> Self {
        Self {
            date: self.date.add_days(days),
            time: self.time,
        }
    }

    pub fn sub_days(self, days: i64) -> Self {
        self.add_days(-days)
    }

    /// Adds `minutes`, promoting to an absolute instant and renormalizing
    /// into a canonical `(date, seconds-of-day < 24h)` form.
    pub fn add_minutes(self, minutes: i64) -> Self {
        self.add(Duration::minutes(minutes))
    }

    pub fn add(self, delta: Duration) -> Self {
        let instant = self.absolute_instant_seconds() + delta.to_secs();
        let day = instant.div_euclid(SECONDS_PER_DAY);
        let seconds_of_day = instant.rem_euclid(SECONDS_PER_DAY);
        let date = Date::from_naive_date(
            chrono::NaiveDate::from_num_days_from_ce_opt(day as i32)
                .expect("renormalized day stays within the chrono-representable range"),
        );
        Self {
            date,
            time: Time::from_seconds(seconds_of_day)
                .expect("seconds_of_day is always in [0, SECONDS_PER_DAY)"),
        }
    }

    pub fn sub(self, delta: Duration) -> Self {
        self.add(-delta)
    }

    /// Duration from `other` to `self`.
    pub fn duration_since(self, other: DateTime) -> Duration {
        Duration::seconds(self.absolute_instant_seconds() - other.absolute_instant_seconds())
    }
}

impl fmt::Debug for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time.to_12_hour_string())
    }
}

impl PartialOrd for DateTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DateTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.absolute_instant_seconds()
            .cmp(&other.absolute_instant_seconds())
    }
}

impl Sub for DateTime {
    type Output = Duration;
    fn sub(self, rhs: DateTime) -> Duration {
        self.duration_since(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gtfs_round_trip() {
        for seconds in [0_i64, 1, 3599, 3600, 86399, 86400, 90000, 172800] {
            let time = Time::from_seconds(seconds).unwrap();
            let rendered = time.to_gtfs_string();
            let parsed: Time = rendered.parse().unwrap();
            assert_eq!(time, parsed, "round trip for {seconds}");
        }
    }

    #[test]
    fn twelve_hour_matches_24_hour() {
        assert_eq!(
            Time::from_hms(0, 5, 0).unwrap(),
            "12:05 AM".parse().unwrap()
        );
        assert_eq!(
            Time::from_hms(13, 30, 0).unwrap(),
            "1:30pm".parse().unwrap()
        );
        assert_eq!(
            Time::from_hms(12, 0, 0).unwrap(),
            "12:00 PM".parse().unwrap()
        );
    }

    #[test]
    fn hhmm_compact_parses() {
        assert_eq!(Time::from_hms(8, 5, 0).unwrap(), "0805".parse().unwrap());
    }

    #[test]
    fn out_of_range_seconds_rejected() {
        assert!(Time::from_seconds(-1).is_err());
        assert!(Time::from_seconds(172801).is_err());
    }

    #[test]
    fn date_delta_days_round_trips() {
        let date = Date::from_yyyymmdd(20240305).unwrap();
        assert_eq!(date.add_days(17).sub_days(17), date);
    }

    #[test]
    fn date_time_ordering_across_midnight_straddle() {
        // 25:30:00 on 2024-03-04 is the same instant as 01:30:00 on 2024-03-05.
        let late_evening = DateTime::new(
            Date::from_yyyymmdd(20240304).unwrap(),
            Time::from_hms(25, 30, 0).unwrap(),
        );
        let next_morning = DateTime::new(
            Date::from_yyyymmdd(20240305).unwrap(),
            Time::from_hms(1, 30, 0).unwrap(),
        );
        assert_eq!(late_evening.duration_since(next_morning), Duration::seconds(0));
    }

    #[test]
    fn add_minutes_renormalizes_across_midnight() {
        let dt = DateTime::new(
            Date::from_yyyymmdd(20240305).unwrap(),
            Time::from_hms(23, 50, 0).unwrap(),
        );
        let later = dt.add_minutes(20);
        assert_eq!(later.date(), Date::from_yyyymmdd(20240306).unwrap());
        assert_eq!(later.time(), Time::from_hms(0, 10, 0).unwrap());
    }

    #[test]
    fn invalid_date_rejected() {
        assert!(Date::from_yyyymmdd(20240231).is_err());
        assert!(Date::from_yyyymmdd(19000101).is_err());
    }
}
