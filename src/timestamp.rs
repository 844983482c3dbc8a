use time::macros::format_description;
use time::{Date, Duration, PrimitiveDateTime, Time};

/// A raw timestamp that could not be normalized.
#[derive(thiserror::Error, Debug)]
#[error("invalid timestamp '{value}': {detail}")]
pub struct TimestampError {
    pub value: String,
    pub detail: String,
}

fn invalid(value: &str, detail: impl Into<String>) -> TimestampError {
    TimestampError {
        value: value.to_string(),
        detail: detail.into(),
    }
}

/// Render the canonical hour-aligned form, `YYYY-MM-DD HH:00:00`.
///
/// Fixed width with zero padding, so lexicographic order on the output is
/// chronological order. Both source families funnel through this.
fn format_canonical(dt: PrimitiveDateTime) -> Result<String, TimestampError> {
    dt.format(format_description!("[year]-[month]-[day] [hour]:00:00"))
        .map_err(|e| invalid(&dt.to_string(), e.to_string()))
}

/// Normalize an hour-ending label from a load file.
///
/// `date` is `MM/DD/YYYY`; `hour_ending` is `H:00`/`HH:00` on a 24-hour
/// clock and marks the END of the hourly interval in local time. `1:00`
/// through `23:00` step back one hour to the interval start; the special
/// label `24:00` is the last slot of the same calendar date and maps to
/// `23:00:00` of that date, never to midnight of the next one.
pub fn hour_ending_to_canonical(date: &str, hour_ending: &str) -> Result<String, TimestampError> {
    let day = Date::parse(date.trim(), format_description!("[month]/[day]/[year]"))
        .map_err(|e| invalid(date, e.to_string()))?;

    let label = hour_ending.trim();
    let (hour_str, minute_str) = label
        .split_once(':')
        .ok_or_else(|| invalid(label, "hour-ending is not HH:MM"))?;
    if minute_str != "00" {
        return Err(invalid(label, "hour-ending minutes must be 00"));
    }
    let hour: u8 = hour_str
        .parse()
        .map_err(|_| invalid(label, "hour-ending hour is not a number"))?;
    if !(1..=24).contains(&hour) {
        return Err(invalid(label, "hour-ending hour out of range 1..=24"));
    }

    let slot_start = if hour == 24 { 23 } else { hour - 1 };
    let time = Time::from_hms(slot_start, 0, 0).map_err(|e| invalid(label, e.to_string()))?;
    format_canonical(PrimitiveDateTime::new(day, time))
}

/// Normalize a UTC instant from a weather file.
///
/// `raw` is `YYYY-MM-DD HH:MM:SS` with arbitrary minute/second. The result
/// is the ceiling to the next whole hour; an input already on the boundary
/// still advances by one hour. Rollover across day, month and year bounds
/// is handled.
pub fn round_utc_hour_up(raw: &str) -> Result<String, TimestampError> {
    let dt = PrimitiveDateTime::parse(
        raw.trim(),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .map_err(|e| invalid(raw, e.to_string()))?;

    let rounded = PrimitiveDateTime::new(dt.date(), Time::MIDNIGHT)
        + Duration::hours(i64::from(dt.hour()) + 1);
    format_canonical(rounded)
}
