//! Time handling for RFC grids: CF time decoding and DSS time labels.
//!
//! DSS files day boundaries as hour `2400` of the previous day rather than
//! hour `0000` of the next one. The start and end labels apply that rule
//! differently (see [`slice_labels`]), so they are built by separate
//! functions.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use tracing::{debug, instrument};

use crate::error::{GridError, GridResult};
use crate::parameter::DataKind;

/// DSS D/E-part timestamp format, e.g. `21Apr2020:0600`.
pub const DSS_TIME_FORMAT: &str = "%d%b%Y:%H%M";

/// Default accumulation window of RFC precipitation grids.
pub const DEFAULT_WINDOW_HOURS: i64 = 6;

/// Start/end labels for one time slice of a DSS grid record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SliceLabels {
    pub start: String,
    /// Empty for instantaneous data.
    pub end: String,
}

/// Build the DSS start/end labels for the grid valid at `time`.
///
/// - The end label is `time`; at hour 0 it becomes `2400` of the previous day.
///   Instantaneous data has no end label.
/// - The start label is `time - window`. Only instantaneous data moves an
///   hour-0 start onto `2400` of the previous day; cumulative starts are
///   written as they are.
#[instrument(level = "debug")]
pub fn slice_labels(time: DateTime<Utc>, kind: DataKind, window: Duration) -> SliceLabels {
    let end = if kind.is_instantaneous() {
        String::new()
    } else {
        end_label(time)
    };
    let start = start_label(time - window, kind);

    debug!(%time, start = %start, end = %end, "Converted grid time to DSS labels");
    SliceLabels { start, end }
}

fn end_label(time: DateTime<Utc>) -> String {
    if time.hour() == 0 {
        (time - Duration::hours(24))
            .format(DSS_TIME_FORMAT)
            .to_string()
            .replace(":0000", ":2400")
    } else {
        time.format(DSS_TIME_FORMAT).to_string()
    }
}

fn start_label(start: DateTime<Utc>, kind: DataKind) -> String {
    match kind {
        DataKind::Instantaneous if start.hour() == 0 => (start - Duration::hours(24))
            .format(DSS_TIME_FORMAT)
            .to_string()
            .replace(":0000", ":2400"),
        _ => start.format(DSS_TIME_FORMAT).to_string(),
    }
}

/// Decode CF-convention time values (`"<unit> since <reference>"`).
pub fn decode_cf_times(values: &[f64], units: &str) -> GridResult<Vec<DateTime<Utc>>> {
    let (unit, reference) = units
        .split_once(" since ")
        .ok_or_else(|| GridError::InvalidTime(format!("unexpected time units: '{}'", units)))?;

    let seconds_per_unit = match unit.trim().to_lowercase().as_str() {
        "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
        "minutes" | "minute" | "mins" | "min" => 60.0,
        "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
        "days" | "day" | "d" => 86400.0,
        other => {
            return Err(GridError::InvalidTime(format!(
                "unsupported time unit '{}'",
                other
            )))
        }
    };
    let reference = parse_reference_time(reference)?;

    values
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                return Err(GridError::InvalidTime(format!("non-finite time value {}", v)));
            }
            let seconds = (v * seconds_per_unit).round() as i64;
            Ok(reference + Duration::seconds(seconds))
        })
        .collect()
}

fn parse_reference_time(s: &str) -> GridResult<DateTime<Utc>> {
    let trimmed = s.trim().trim_end_matches(" UTC").trim_end_matches('Z');

    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| GridError::InvalidTime(format!("unparseable reference time '{}'", s)))?;
    date.and_hms_opt(0, 0, 0)
        .map(|ndt| Utc.from_utc_datetime(&ndt))
        .ok_or_else(|| GridError::InvalidTime(format!("unparseable reference time '{}'", s)))
}
