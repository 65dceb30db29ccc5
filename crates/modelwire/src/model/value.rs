//! Language-level property values.
//!
//! [`PropValue`] is the typed union an instance holds for each declared
//! property. It is strictly richer than the wire payloads: dates, times,
//! geo points, enum members, external messages and nested records all have
//! their own variants so a decode can recover the exact original value.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ValidationError;
use crate::model::{EnumMember, Instance, MessageValue};
use crate::util::datetime::{
    self, MICROS_PER_DAY, MICROS_PER_HOUR, MICROS_PER_MINUTE, MICROS_PER_SECOND,
};

/// A UTC timestamp with microsecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime {
    micros: i64,
}

impl UtcDateTime {
    /// Creates a timestamp from microseconds since the Unix epoch.
    pub fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    /// Creates a timestamp from civil UTC parts.
    pub fn from_civil(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        micro: u32,
    ) -> Result<Self, ValidationError> {
        let date = LocalDate::new(year, month, day)?;
        let time = LocalTime::new(hour, minute, second, micro)?;
        Ok(Self {
            micros: date.days() as i64 * MICROS_PER_DAY + time.micros_of_day(),
        })
    }

    /// Current time.
    pub fn now() -> Self {
        Self {
            micros: datetime::now_micros(),
        }
    }

    /// Microseconds since the Unix epoch.
    pub fn micros(&self) -> i64 {
        self.micros
    }

    /// Projects out the calendar date.
    pub fn date(&self) -> LocalDate {
        let (days, _) = datetime::split_epoch_micros(self.micros);
        LocalDate::from_days(days)
    }

    /// Projects out the time of day.
    pub fn time_of_day(&self) -> LocalTime {
        let (_, rem) = datetime::split_epoch_micros(self.micros);
        LocalTime::from_micros_of_day(rem)
    }
}

impl fmt::Display for UtcDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", datetime::format_rfc3339(self.micros))
    }
}

/// A calendar date without a time-of-day part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalDate {
    year: i32,
    month: u8,
    day: u8,
}

impl LocalDate {
    /// Creates a date, validating month and day ranges.
    pub fn new(year: i32, month: u8, day: u8) -> Result<Self, ValidationError> {
        if month < 1
            || month > 12
            || day < 1
            || day as u32 > datetime::days_in_month(year, month as u32)
        {
            return Err(ValidationError::InvalidDate { year, month, day });
        }
        Ok(Self { year, month, day })
    }

    /// Creates a date from days since the Unix epoch.
    pub fn from_days(days: i32) -> Self {
        let (year, month, day) = datetime::days_to_civil(days);
        Self {
            year,
            month: month as u8,
            day: day as u8,
        }
    }

    /// Days since the Unix epoch.
    pub fn days(&self) -> i32 {
        datetime::civil_to_days(self.year, self.month as u32, self.day as u32)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }
}

impl fmt::Display for LocalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// A time of day without a date part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalTime {
    hour: u8,
    minute: u8,
    second: u8,
    micro: u32,
}

impl LocalTime {
    /// Creates a time of day, validating component ranges.
    pub fn new(hour: u8, minute: u8, second: u8, micro: u32) -> Result<Self, ValidationError> {
        if hour > 23 || minute > 59 || second > 59 || micro > 999_999 {
            return Err(ValidationError::InvalidTime {
                hour,
                minute,
                second,
                micro,
            });
        }
        Ok(Self {
            hour,
            minute,
            second,
            micro,
        })
    }

    /// Creates a time of day from in-day microseconds.
    ///
    /// The value must already be in `[0, MICROS_PER_DAY)`.
    pub fn from_micros_of_day(micros: i64) -> Self {
        debug_assert!((0..MICROS_PER_DAY).contains(&micros));
        Self {
            hour: (micros / MICROS_PER_HOUR) as u8,
            minute: ((micros % MICROS_PER_HOUR) / MICROS_PER_MINUTE) as u8,
            second: ((micros % MICROS_PER_MINUTE) / MICROS_PER_SECOND) as u8,
            micro: (micros % MICROS_PER_SECOND) as u32,
        }
    }

    /// Microseconds since midnight.
    pub fn micros_of_day(&self) -> i64 {
        self.hour as i64 * MICROS_PER_HOUR
            + self.minute as i64 * MICROS_PER_MINUTE
            + self.second as i64 * MICROS_PER_SECOND
            + self.micro as i64
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }

    pub fn micro(&self) -> u32 {
        self.micro
    }
}

impl fmt::Display for LocalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", datetime::format_time_of_day(self.micros_of_day()))
    }
}

/// A WGS84 geographic point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPt {
    lat: f64,
    lon: f64,
}

impl GeoPt {
    /// Creates a point, validating coordinate bounds.
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        if lat.is_nan() || !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::LatitudeOutOfRange { lat });
        }
        if lon.is_nan() || !(-180.0..=180.0).contains(&lon) {
            return Err(ValidationError::LongitudeOutOfRange { lon });
        }
        Ok(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl fmt::Display for GeoPt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.lat, self.lon)
    }
}

/// A typed language-level value held by a model instance.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    DateTime(UtcDateTime),
    Date(LocalDate),
    Time(LocalTime),
    GeoPt(GeoPt),
    Json(serde_json::Value),
    Enum(EnumMember),
    Message(MessageValue),
    /// A nested model instance (structured / local-structured properties).
    Record(Instance),
    /// An ordered sequence for repeated properties.
    List(Vec<PropValue>),
    /// A string-keyed mapping. Only reachable inside pickled value trees.
    Map(BTreeMap<String, PropValue>),
}

impl PropValue {
    /// Returns a short name for the variant, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            PropValue::Bool(_) => "boolean",
            PropValue::Int(_) => "integer",
            PropValue::Float(_) => "float",
            PropValue::Str(_) => "string",
            PropValue::Bytes(_) => "bytes",
            PropValue::DateTime(_) => "datetime",
            PropValue::Date(_) => "date",
            PropValue::Time(_) => "time",
            PropValue::GeoPt(_) => "geo point",
            PropValue::Json(_) => "json",
            PropValue::Enum(_) => "enum member",
            PropValue::Message(_) => "message",
            PropValue::Record(_) => "record",
            PropValue::List(_) => "list",
            PropValue::Map(_) => "map",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PropValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<UtcDateTime> {
        match self {
            PropValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Instance> {
        match self {
            PropValue::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropValue]> {
        match self {
            PropValue::List(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Int(v)
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        PropValue::Float(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Str(v)
    }
}

impl From<Vec<u8>> for PropValue {
    fn from(v: Vec<u8>) -> Self {
        PropValue::Bytes(v)
    }
}

impl From<UtcDateTime> for PropValue {
    fn from(v: UtcDateTime) -> Self {
        PropValue::DateTime(v)
    }
}

impl From<LocalDate> for PropValue {
    fn from(v: LocalDate) -> Self {
        PropValue::Date(v)
    }
}

impl From<LocalTime> for PropValue {
    fn from(v: LocalTime) -> Self {
        PropValue::Time(v)
    }
}

impl From<GeoPt> for PropValue {
    fn from(v: GeoPt) -> Self {
        PropValue::GeoPt(v)
    }
}

impl From<serde_json::Value> for PropValue {
    fn from(v: serde_json::Value) -> Self {
        PropValue::Json(v)
    }
}

impl From<EnumMember> for PropValue {
    fn from(v: EnumMember) -> Self {
        PropValue::Enum(v)
    }
}

impl From<MessageValue> for PropValue {
    fn from(v: MessageValue) -> Self {
        PropValue::Message(v)
    }
}

impl From<Instance> for PropValue {
    fn from(v: Instance) -> Self {
        PropValue::Record(v)
    }
}

impl<'a> From<Vec<&'a str>> for PropValue {
    fn from(v: Vec<&'a str>) -> Self {
        PropValue::List(v.into_iter().map(PropValue::from).collect())
    }
}

impl From<Vec<String>> for PropValue {
    fn from(v: Vec<String>) -> Self {
        PropValue::List(v.into_iter().map(PropValue::Str).collect())
    }
}

impl From<Vec<i64>> for PropValue {
    fn from(v: Vec<i64>) -> Self {
        PropValue::List(v.into_iter().map(PropValue::Int).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_projections() {
        let dt = UtcDateTime::from_civil(2017, 8, 26, 15, 10, 42, 123_456).unwrap();
        let date = dt.date();
        assert_eq!((date.year(), date.month(), date.day()), (2017, 8, 26));
        let time = dt.time_of_day();
        assert_eq!(
            (time.hour(), time.minute(), time.second(), time.micro()),
            (15, 10, 42, 123_456)
        );
        assert_eq!(dt.to_string(), "2017-08-26T15:10:42.123456Z");
    }

    #[test]
    fn test_date_validation() {
        assert!(LocalDate::new(2023, 2, 29).is_err());
        assert!(LocalDate::new(2024, 2, 29).is_ok());
        assert!(LocalDate::new(2024, 13, 1).is_err());
        assert!(LocalDate::new(2024, 0, 1).is_err());
    }

    #[test]
    fn test_date_days_roundtrip() {
        let date = LocalDate::new(2017, 8, 26).unwrap();
        assert_eq!(LocalDate::from_days(date.days()), date);
    }

    #[test]
    fn test_time_validation() {
        assert!(LocalTime::new(24, 0, 0, 0).is_err());
        assert!(LocalTime::new(23, 60, 0, 0).is_err());
        assert!(LocalTime::new(0, 0, 0, 1_000_000).is_err());
        assert!(LocalTime::new(23, 59, 59, 999_999).is_ok());
    }

    #[test]
    fn test_time_micros_roundtrip() {
        let time = LocalTime::new(15, 10, 42, 123_456).unwrap();
        assert_eq!(LocalTime::from_micros_of_day(time.micros_of_day()), time);
    }

    #[test]
    fn test_geo_pt_bounds() {
        assert!(GeoPt::new(52.37, 4.88).is_ok());
        assert!(GeoPt::new(91.0, 0.0).is_err());
        assert!(GeoPt::new(-91.0, 0.0).is_err());
        assert!(GeoPt::new(0.0, 181.0).is_err());
        assert!(GeoPt::new(0.0, -181.0).is_err());
        assert!(GeoPt::new(f64::NAN, 0.0).is_err());
        assert!(GeoPt::new(0.0, f64::NAN).is_err());
        assert!(GeoPt::new(90.0, 180.0).is_ok());
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(PropValue::from(42i64), PropValue::Int(42));
        assert_eq!(PropValue::from("x"), PropValue::Str("x".to_string()));
        assert_eq!(
            PropValue::from(vec!["a", "b"]),
            PropValue::List(vec![PropValue::from("a"), PropValue::from("b")])
        );
    }
}
