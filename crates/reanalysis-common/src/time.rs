//! Time handling: query intervals, datetime parsing and calendar buckets.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike,
    Utc,
};
use serde::{Deserialize, Serialize};

use crate::error::{RasterError, RasterResult};

/// Parse a timestamp as accepted by the query layer.
///
/// Supports RFC 3339 (`2023-01-01T00:00:00Z`), naive ISO forms with `T` or a
/// space separator, with or without seconds, and bare dates. Naive values
/// are interpreted as UTC.
pub fn parse_datetime(s: &str) -> RasterResult<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(start_of_day(date));
    }

    Err(RasterError::invalid_parameter("datetime", s))
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

/// An inclusive datetime interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a range, rejecting `end < start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> RasterResult<Self> {
        if end < start {
            return Err(RasterError::invalid_parameter(
                "end_datetime",
                format!("{} is before start {}", end, start),
            ));
        }
        Ok(Self { start, end })
    }

    /// Parse a range from two timestamp strings.
    pub fn parse(start: &str, end: &str) -> RasterResult<Self> {
        Self::new(parse_datetime(start)?, parse_datetime(end)?)
    }

    pub fn contains(&self, dt: &DateTime<Utc>) -> bool {
        dt >= &self.start && dt <= &self.end
    }

    /// Every calendar day touched by the range, in ascending order.
    ///
    /// The time-of-day of both bounds is ignored, so a range ending at
    /// `2023-01-02T09:00` still yields 2023-01-02.
    pub fn days(&self) -> Vec<NaiveDate> {
        let last = self.end.date_naive();
        self.start
            .date_naive()
            .iter_days()
            .take_while(|day| *day <= last)
            .collect()
    }
}

/// Target time granularity of a resampled raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeResolution {
    /// Native granularity; no temporal grouping.
    #[default]
    Hour,
    Day,
    Month,
    Year,
}

impl TimeResolution {
    /// Start of the calendar bucket containing `t`.
    pub fn bucket_start(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let date = t.date_naive();
        match self {
            Self::Hour => start_of_day(date) + Duration::hours(i64::from(t.hour())),
            Self::Day => start_of_day(date),
            Self::Month => start_of_day(date.with_day0(0).unwrap_or(date)),
            Self::Year => start_of_day(date.with_ordinal0(0).unwrap_or(date)),
        }
    }

    /// Start of the bucket following the one starting at `start`.
    ///
    /// `None` only when the calendar overflows.
    pub fn next_bucket(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Hour => start.checked_add_signed(Duration::hours(1)),
            Self::Day => start.checked_add_signed(Duration::days(1)),
            Self::Month => start.checked_add_months(Months::new(1)),
            Self::Year => start.checked_add_months(Months::new(12)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl FromStr for TimeResolution {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(RasterError::invalid_parameter("time_resolution", s)),
        }
    }
}

impl fmt::Display for TimeResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
