use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

/// Date-only layouts tried after ISO 8601, in order. Each is read as midnight UTC.
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y",
];

/// Years a bill date may fall in. Stored dates are four-digit RFC 3339 text,
/// which cannot carry a sign or a fifth digit.
pub const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid date: {0:?}")]
pub struct DateParseError(pub String);

/// Parses the textual date of an uploaded bill into a UTC timestamp.
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DDTHH:MM:SS` (taken as UTC), plain
/// `YYYY-MM-DD`, and the fallback layouts above. Zone-less input is always
/// pinned to UTC so the result never depends on the host time zone. Instants
/// whose UTC year falls outside [`SUPPORTED_YEARS`] are rejected.
pub fn parse_bill_date(s: &str) -> Result<DateTime<Utc>, DateParseError> {
    let s = s.trim();
    match parse_any(s) {
        Some(ts) if is_supported(&ts) => Ok(ts),
        _ => Err(DateParseError(s.to_string())),
    }
}

/// Whether `ts` lies in [`SUPPORTED_YEARS`] once expressed in UTC.
pub fn is_supported(ts: &DateTime<Utc>) -> bool {
    SUPPORTED_YEARS.contains(&ts.year())
}

fn parse_any(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(midnight_utc(date));
    }

    for fmt in FALLBACK_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(midnight_utc(date));
        }
    }

    None
}

/// Canonical `YYYY-MM-DD` rendering, always in UTC.
pub fn display_date(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
