//! Time zone and timestamp helpers.
//!
//! - [`to_rfc3339_millis`] / [`parse_ts_to_utc`] are the canonical storage
//!   round-trip for timestamps (RFC3339 UTC text columns).
//! - The service timezone drives VIN-log `processed_date` and the
//!   resolver's "last N calendar days" windows. It defaults to
//!   America/Chicago and can be overridden with `ORDER_ENGINE_TZ`.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;

/// IANA name of the default service timezone.
pub const DEFAULT_SERVICE_TZ: &str = "America/Chicago";

static SERVICE_TZ: Lazy<Tz> = Lazy::new(|| {
    let name =
        std::env::var("ORDER_ENGINE_TZ").unwrap_or_else(|_| DEFAULT_SERVICE_TZ.to_string());
    name.parse().unwrap_or_else(|_| {
        tracing::warn!(%name, "unparseable ORDER_ENGINE_TZ, falling back to default");
        DEFAULT_SERVICE_TZ.parse().expect("default tz is valid")
    })
});

/// The service timezone (resolved once per process).
pub fn service_tz() -> Tz {
    *SERVICE_TZ
}

/// UTC timestamp -> RFC3339 with millisecond precision and `Z` suffix.
///
/// Example: `"2025-01-20T14:30:00.000Z"`.
pub fn to_rfc3339_millis(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// RFC-3339 with offset -> UTC.
///
/// Example:
/// - "2024-03-10T09:30:00-05:00" -> "2024-03-10T14:30:00Z"
pub fn parse_ts_to_utc(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(s).with_context(|| format!("bad rfc3339: {s}"))?;
    Ok(dt.with_timezone(&Utc))
}

/// The calendar date of a UTC instant in the service timezone.
pub fn local_date(dt: DateTime<Utc>) -> NaiveDate {
    dt.with_timezone(&service_tz()).date_naive()
}

/// Parses a stored `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("bad date: {s}"))
}

/// Whole calendar days from `earlier` to `later` (negative when reversed).
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    (later - earlier).num_days()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn rfc3339_roundtrip() {
        let dt = Utc.with_ymd_and_hms(2025, 1, 20, 14, 30, 0).unwrap();
        let s = to_rfc3339_millis(dt);
        assert_eq!(s, "2025-01-20T14:30:00.000Z");
        assert_eq!(parse_ts_to_utc(&s).unwrap(), dt);
    }

    #[test]
    fn parse_offset_to_utc() {
        let got = parse_ts_to_utc("2024-03-10T09:30:00-05:00").expect("parse");
        let want = Utc.with_ymd_and_hms(2024, 3, 10, 14, 30, 0).unwrap();
        assert_eq!(got, want);
    }

    #[test]
    fn calendar_day_arithmetic() {
        let a = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 2, 8).unwrap();
        assert_eq!(days_between(a, b), 7);
        assert_eq!(days_between(b, a), -7);
        assert_eq!(days_between(a, a), 0);
    }

    #[test]
    fn stored_date_roundtrip() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        assert_eq!(parse_date(&d.to_string()).unwrap(), d);
        assert!(parse_date("2025/01/10").is_err());
    }
}
