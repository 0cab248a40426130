//! CF-convention time axes (`"<unit> since <epoch>"`).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use reanalysis_common::{RasterError, RasterResult};

/// Units written by [`crate::DayStoreWriter`].
pub const WRITER_TIME_UNITS: &str = "seconds since 1970-01-01 00:00:00";

/// A decoded `units` attribute of a time coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfTimeUnits {
    unit_millis: i64,
    epoch: DateTime<Utc>,
}

impl CfTimeUnits {
    /// Parse e.g. `"hours since 1900-01-01 00:00:00"`.
    pub fn parse(units: &str) -> RasterResult<Self> {
        let (unit, epoch) = units
            .split_once(" since ")
            .ok_or_else(|| RasterError::format(format!("unsupported time units '{}'", units)))?;

        let unit_millis = match unit.trim().to_lowercase().as_str() {
            "seconds" | "second" | "s" => 1_000,
            "minutes" | "minute" | "min" => 60_000,
            "hours" | "hour" | "h" => 3_600_000,
            "days" | "day" | "d" => 86_400_000,
            other => {
                return Err(RasterError::format(format!(
                    "unsupported time unit '{}' in '{}'",
                    other, units
                )))
            }
        };

        let epoch = parse_epoch(epoch.trim())
            .ok_or_else(|| RasterError::format(format!("unparsable time epoch in '{}'", units)))?;

        Ok(Self { unit_millis, epoch })
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Convert an axis value to a timestamp, rounded to the millisecond.
    pub fn decode(&self, value: f64) -> RasterResult<DateTime<Utc>> {
        let millis = value * self.unit_millis as f64;
        if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
            return Err(RasterError::format(format!("time value {} out of range", value)));
        }
        self.epoch
            .checked_add_signed(Duration::milliseconds(millis.round() as i64))
            .ok_or_else(|| RasterError::format(format!("time value {} out of range", value)))
    }

    /// Convert a timestamp to an axis value in these units.
    pub fn encode(&self, datetime: DateTime<Utc>) -> f64 {
        let delta = datetime - self.epoch;
        delta.num_milliseconds() as f64 / self.unit_millis as f64
    }
}

fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    // Some writers append a UTC marker or fractional seconds.
    let s = s.trim_end_matches(" UTC").trim_end_matches('Z');
    for format in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Decode every value of a time axis, requiring non-decreasing order.
pub fn decode_axis(units: &CfTimeUnits, values: &[f64]) -> RasterResult<Vec<DateTime<Utc>>> {
    let times = values
        .iter()
        .map(|v| units.decode(*v))
        .collect::<RasterResult<Vec<_>>>()?;

    if let Some(i) = times.windows(2).position(|w| w[1] < w[0]) {
        return Err(RasterError::format(format!(
            "time axis decreases at index {}: {} -> {}",
            i + 1,
            times[i],
            times[i + 1]
        )));
    }
    Ok(times)
}
