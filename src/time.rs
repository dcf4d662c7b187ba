use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use crate::error::CjlError;

static RELATIVE_RE: OnceLock<Regex> = OnceLock::new();

/// Resolve a start/end expression to epoch milliseconds, anchored to `now`.
/// `now` is passed in rather than read from the wall clock so the function
/// stays deterministic under test.
///
/// Only relative durations (`30m`, `6h`, `2d`) are accepted. Absolute
/// ISO-8601 expressions are rejected as unsupported.
pub fn resolve(expr: Option<&str>, now: DateTime<Utc>) -> Result<Option<i64>, CjlError> {
    let Some(expr) = expr else { return Ok(None) };
    if expr.is_empty() {
        return Ok(None);
    }
    let re = RELATIVE_RE.get_or_init(|| Regex::new(r"^(\d+)(m|h|d)").unwrap());
    let caps = re
        .captures(expr)
        .ok_or_else(|| CjlError::UnsupportedTime(expr.to_string()))?;
    let n: i64 = caps[1]
        .parse()
        .map_err(|_| CjlError::UnsupportedTime(expr.to_string()))?;
    let span = match &caps[2] {
        "m" => Duration::try_minutes(n),
        "h" => Duration::try_hours(n),
        "d" => Duration::try_days(n),
        _ => unreachable!(),
    }
    .ok_or_else(|| CjlError::UnsupportedTime(expr.to_string()))?;
    let stamp = now
        .checked_sub_signed(span)
        .ok_or_else(|| CjlError::UnsupportedTime(expr.to_string()))?;
    Ok(Some(stamp.timestamp_millis()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn resolves_minutes_hours_days() {
        let now = fixed_now();
        assert_eq!(
            resolve(Some("30m"), now).unwrap(),
            Some(now.timestamp_millis() - 30 * 60 * 1000)
        );
        assert_eq!(
            resolve(Some("6h"), now).unwrap(),
            Some(now.timestamp_millis() - 6 * 3600 * 1000)
        );
        assert_eq!(
            resolve(Some("2d"), now).unwrap(),
            Some(now.timestamp_millis() - 2 * 86400 * 1000)
        );
    }

    #[test]
    fn absent_or_empty_means_unbounded() {
        assert_eq!(resolve(None, fixed_now()).unwrap(), None);
        assert_eq!(resolve(Some(""), fixed_now()).unwrap(), None);
    }

    #[test]
    fn rejects_absolute_and_garbage() {
        assert!(resolve(Some("2020-01-01"), fixed_now()).is_err());
        assert!(resolve(Some("yesterday"), fixed_now()).is_err());
        assert!(resolve(Some("h6"), fixed_now()).is_err());
    }

    #[test]
    fn rejects_out_of_range_duration() {
        let huge = format!("{}d", i64::MAX);
        assert!(resolve(Some(&huge), fixed_now()).is_err());
    }
}
