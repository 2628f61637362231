//! UTCTime / GeneralizedTime conversion to and from UNIX timestamps.
//!
//! Calendar validation and arithmetic go through [`der::DateTime`], which
//! covers 1970-01-01T00:00:00Z through 9999-12-31T23:59:59Z.

use std::time::Duration;

use der::DateTime;

use crate::infra::error::{SigningError, SigningResult};

/// 2050-01-01T00:00:00Z, the first instant that must use GeneralizedTime.
const UTC_TIME_END: i64 = 2_524_608_000;

/// Earliest encodable instant.
pub const TIME_MIN: i64 = 0;
/// 9999-12-31T23:59:59Z, the latest encodable instant.
pub const TIME_MAX: i64 = 253_402_300_799;

pub(crate) fn fits_utc_time(timestamp: i64) -> bool {
    (TIME_MIN..UTC_TIME_END).contains(&timestamp)
}

/// True when `timestamp` can be written as a DER Time.
pub fn is_encodable(timestamp: i64) -> bool {
    (TIME_MIN..=TIME_MAX).contains(&timestamp)
}

fn to_date_time(timestamp: i64) -> SigningResult<DateTime> {
    let secs = u64::try_from(timestamp).map_err(|_| {
        SigningError::InvalidInput(format!("timestamp {timestamp} is before 1970"))
    })?;
    DateTime::from_unix_duration(Duration::from_secs(secs))
        .map_err(|e| SigningError::InvalidInput(format!("timestamp {timestamp}: {e}")))
}

/// Convert a UNIX timestamp to `(year, month, day, hour, minute, second)`.
///
/// # Errors
///
/// `InvalidInput` outside [`TIME_MIN`]..=[`TIME_MAX`].
pub fn unix_to_datetime(timestamp: i64) -> SigningResult<(i64, u32, u32, u32, u32, u32)> {
    let dt = to_date_time(timestamp)?;
    Ok((
        i64::from(dt.year()),
        u32::from(dt.month()),
        u32::from(dt.day()),
        u32::from(dt.hour()),
        u32::from(dt.minutes()),
        u32::from(dt.seconds()),
    ))
}

/// Convert a UTC date-time to a UNIX timestamp.
///
/// # Errors
///
/// `MalformedEncoding` for dates that do not exist (including February 29th
/// outside leap years) or lie outside 1970..=9999.
pub fn datetime_to_unix(
    year: i64,
    month: u32,
    day: u32,
    hour: u32,
    min: u32,
    sec: u32,
) -> SigningResult<i64> {
    let invalid = || {
        SigningError::MalformedEncoding(format!(
            "invalid date-time {year:04}-{month:02}-{day:02} {hour:02}:{min:02}:{sec:02}"
        ))
    };
    let narrow = |v: u32| u8::try_from(v).map_err(|_| invalid());
    let dt = DateTime::new(
        u16::try_from(year).map_err(|_| invalid())?,
        narrow(month)?,
        narrow(day)?,
        narrow(hour)?,
        narrow(min)?,
        narrow(sec)?,
    )
    .map_err(|_| invalid())?;
    i64::try_from(dt.unix_duration().as_secs()).map_err(|_| invalid())
}

/// Fields for encoding. Timestamps outside the encodable range are clamped;
/// `Validity::new` and the decoders only produce values inside it.
fn encodable_fields(timestamp: i64) -> (i64, u32, u32, u32, u32, u32) {
    let clamped = timestamp.clamp(TIME_MIN, TIME_MAX);
    if clamped != timestamp {
        log::warn!("Timestamp {timestamp} is not encodable, writing {clamped}");
    }
    unix_to_datetime(clamped).unwrap_or((1970, 1, 1, 0, 0, 0))
}

pub(crate) fn unix_to_utc_time(timestamp: i64) -> String {
    let (year, month, day, hour, minute, second) = encodable_fields(timestamp);
    let yy = year.rem_euclid(100);
    format!("{yy:02}{month:02}{day:02}{hour:02}{minute:02}{second:02}Z")
}

pub(crate) fn unix_to_generalized_time(timestamp: i64) -> String {
    let (year, month, day, hour, minute, second) = encodable_fields(timestamp);
    format!("{year:04}{month:02}{day:02}{hour:02}{minute:02}{second:02}Z")
}

fn digits(s: &str, range: std::ops::Range<usize>) -> SigningResult<u32> {
    let part = s
        .get(range)
        .filter(|p| p.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| SigningError::MalformedEncoding(format!("invalid time string '{s}'")))?;
    part.parse()
        .map_err(|_| SigningError::MalformedEncoding(format!("invalid time string '{s}'")))
}

/// Parse "YYMMDDHHMMSSZ". Years 00-49 map to 20xx, 50-99 to 19xx.
pub(crate) fn parse_utc_time(s: &str) -> SigningResult<i64> {
    let body = s
        .strip_suffix('Z')
        .filter(|b| b.len() == 12)
        .ok_or_else(|| SigningError::MalformedEncoding(format!("UTCTime must be YYMMDDHHMMSSZ, got '{s}'")))?;
    let yy = i64::from(digits(body, 0..2)?);
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
    datetime_to_unix(
        year,
        digits(body, 2..4)?,
        digits(body, 4..6)?,
        digits(body, 6..8)?,
        digits(body, 8..10)?,
        digits(body, 10..12)?,
    )
}

/// Parse "YYYYMMDDHHMMSSZ".
pub(crate) fn parse_generalized_time(s: &str) -> SigningResult<i64> {
    let body = s
        .strip_suffix('Z')
        .filter(|b| b.len() == 14)
        .ok_or_else(|| {
            SigningError::MalformedEncoding(format!(
                "GeneralizedTime must be YYYYMMDDHHMMSSZ, got '{s}'"
            ))
        })?;
    datetime_to_unix(
        i64::from(digits(body, 0..4)?),
        digits(body, 4..6)?,
        digits(body, 6..8)?,
        digits(body, 8..10)?,
        digits(body, 10..12)?,
        digits(body, 12..14)?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_dates() {
        assert_eq!(datetime_to_unix(1970, 1, 1, 0, 0, 0).unwrap(), 0);
        assert_eq!(
            datetime_to_unix(2025, 1, 15, 12, 0, 0).unwrap(),
            1_736_942_400
        );
        assert_eq!(
            unix_to_datetime(1_736_942_400).unwrap(),
            (2025, 1, 15, 12, 0, 0)
        );
        assert_eq!(datetime_to_unix(2050, 1, 1, 0, 0, 0).unwrap(), UTC_TIME_END);
        assert_eq!(datetime_to_unix(9999, 12, 31, 23, 59, 59).unwrap(), TIME_MAX);
    }

    #[test]
    fn test_time_strings() {
        assert_eq!(unix_to_utc_time(1_736_942_400), "250115120000Z");
        assert_eq!(parse_utc_time("250115120000Z").unwrap(), 1_736_942_400);
        assert_eq!(unix_to_generalized_time(2_539_296_000), "20500620000000Z");
        assert_eq!(
            parse_generalized_time("20500620000000Z").unwrap(),
            2_539_296_000
        );
        assert_eq!(parse_utc_time("991231235959Z").unwrap(), 946_684_799);
    }

    #[test]
    fn test_rejects_malformed_time() {
        assert!(parse_utc_time("2501151200Z").is_err());
        assert!(parse_utc_time("250115120000").is_err());
        assert!(parse_utc_time("25011512000+Z").is_err());
        assert!(parse_generalized_time("20251315000000Z").is_err());
    }

    #[test]
    fn test_rejects_days_past_month_end() {
        assert!(matches!(
            parse_utc_time("250231000000Z"),
            Err(SigningError::MalformedEncoding(_))
        ));
        assert!(parse_utc_time("250431000000Z").is_err());
        assert!(parse_generalized_time("21000229000000Z").is_err());
        assert_eq!(
            parse_utc_time("240229000000Z").unwrap(),
            datetime_to_unix(2024, 2, 29, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_range_limits() {
        assert!(parse_utc_time("691231235959Z").is_err());
        assert!(unix_to_datetime(-1).is_err());
        assert!(unix_to_datetime(TIME_MAX + 1).is_err());
        assert!(is_encodable(TIME_MAX));
        assert!(!is_encodable(-1));
    }
}
