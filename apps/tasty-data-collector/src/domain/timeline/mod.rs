//! Trading Timeline Buckets
//!
//! Expected candle timestamps for a historical collection run: every
//! non-Saturday day in a date range contributes one timestamp per
//! aggregation interval, counted from UTC midnight. The candle collector
//! uses these buckets to filter stray backfill and group results.

use chrono::{Datelike, NaiveDate, NaiveTime, TimeDelta, Weekday};
use thiserror::Error;

/// Errors from interval parsing and bucket generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    /// The interval string is not of the form `<digits><m|h|d>`.
    #[error("invalid interval format: {0:?}")]
    InvalidInterval(String),
}

/// Parse a dxfeed-style aggregation interval (`"5m"`, `"1h"`, `"1d"`)
/// into a duration.
///
/// # Errors
///
/// Returns [`TimelineError::InvalidInterval`] when the string is not a
/// positive integer followed by one of `m`, `h`, or `d`.
pub fn parse_interval(interval: &str) -> Result<TimeDelta, TimelineError> {
    let invalid = || TimelineError::InvalidInterval(interval.to_string());

    let unit_index = interval
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (digits, unit) = interval.split_at(unit_index);
    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    if amount == 0 {
        return Err(invalid());
    }

    let delta = match unit {
        "m" => TimeDelta::try_minutes(amount),
        "h" => TimeDelta::try_hours(amount),
        "d" => TimeDelta::try_days(amount),
        _ => None,
    };
    delta.ok_or_else(invalid)
}

/// Generate the expected candle timestamps (epoch milliseconds, ascending)
/// for every non-Saturday day in the inclusive date range.
///
/// Each day contributes timestamps at `interval` spacing from UTC midnight
/// up to, but not including, the next midnight.
///
/// # Errors
///
/// Returns [`TimelineError::InvalidInterval`] when the interval does not
/// parse.
pub fn bucket_timestamps(
    start_date: NaiveDate,
    end_date: NaiveDate,
    interval: &str,
) -> Result<Vec<i64>, TimelineError> {
    let step = parse_interval(interval)?;

    let mut timestamps = Vec::new();
    let mut day = start_date;
    while day <= end_date {
        if day.weekday() != Weekday::Sat {
            let day_start = day.and_time(NaiveTime::MIN);
            let Some(day_end) = day_start.checked_add_signed(TimeDelta::days(1)) else {
                break;
            };
            let mut tick = day_start;
            while tick < day_end {
                timestamps.push(tick.and_utc().timestamp_millis());
                let Some(next) = tick.checked_add_signed(step) else {
                    break;
                };
                tick = next;
            }
        }
        let Some(next_day) = day.succ_opt() else {
            break;
        };
        day = next_day;
    }
    Ok(timestamps)
}

// =============================================================================
// Tests
// =============================================================================
