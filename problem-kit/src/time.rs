//! UTC timestamp helpers
//!
//! Timestamps are rendered as ISO-8601 with an explicit `+00:00` offset and microsecond
//! precision when there is a sub-second part: `2025-01-01T12:00:00+00:00`,
//! `2025-01-01T12:00:00.250000+00:00`.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Current time in UTC
pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time in UTC as an ISO-8601 string ending in `+00:00`
pub fn utc_now_str() -> String {
    format_utc(&utc_now())
}

/// Conversion of a timestamp to UTC.
///
/// Naive timestamps carry no offset and are taken to already be UTC. Timestamps with an
/// offset are converted, so the instant is preserved.
pub trait ToUtc {
    fn to_utc(&self) -> DateTime<Utc>;
}

impl ToUtc for NaiveDateTime {
    fn to_utc(&self) -> DateTime<Utc> {
        self.and_utc()
    }
}

impl<Tz: TimeZone> ToUtc for DateTime<Tz> {
    fn to_utc(&self) -> DateTime<Utc> {
        self.with_timezone(&Utc)
    }
}

/// Render any timestamp as a UTC ISO-8601 string.
///
/// ```rust
/// use chrono::{FixedOffset, NaiveDate, TimeZone};
/// use problem_kit::time::dt_to_utc_str;
///
/// let naive = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(12, 0, 0).unwrap();
/// assert_eq!(dt_to_utc_str(&naive), "2025-01-01T12:00:00+00:00");
///
/// let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
/// let aware = eastern.with_ymd_and_hms(2025, 1, 1, 5, 0, 0).unwrap();
/// assert_eq!(dt_to_utc_str(&aware), "2025-01-01T10:00:00+00:00");
/// ```
pub fn dt_to_utc_str<T: ToUtc + ?Sized>(dt: &T) -> String {
    format_utc(&dt.to_utc())
}

fn format_utc(dt: &DateTime<Utc>) -> String {
    let precision = if dt.timestamp_subsec_micros() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    dt.to_rfc3339_opts(precision, false)
}
