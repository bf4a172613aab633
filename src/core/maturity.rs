//! Maturity resolution - when does a commission become payable?
//!
//! New records carry a structured `wallet_release_date`. Older writers stored the
//! release date as a free-form string, so the legacy value is parsed as a generic
//! date. A record whose release date cannot be resolved is never treated as matured.

use crate::entities::commission;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parses a release date stored as a string.
///
/// Accepts RFC 3339, RFC 2822, ISO-like naive date-times, plain `YYYY-MM-DD`
/// dates, and integer epoch milliseconds. Naive values are taken as UTC.
#[must_use]
pub fn parse_legacy_release_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    // Epoch milliseconds
    raw.parse::<i64>()
        .ok()
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
}

/// Resolves the instant a commission becomes payable.
///
/// The structured date wins; the legacy string is only consulted when the
/// structured date is absent. Returns `None` when neither yields a valid instant.
#[must_use]
pub fn resolve_maturity(commission: &commission::Model) -> Option<DateTime<Utc>> {
    commission.wallet_release_date.or_else(|| {
        commission
            .wallet_release_legacy
            .as_deref()
            .and_then(parse_legacy_release_date)
    })
}

/// A commission is matured once its release instant is at or before `now`.
#[must_use]
pub fn is_matured(maturity: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    maturity <= now
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::commission_model;
    use chrono::TimeDelta;

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let parsed = parse_legacy_release_date("2025-03-01T10:00:00+05:30").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 1, 4, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_rfc2822() {
        let parsed = parse_legacy_release_date("Sat, 01 Mar 2025 10:00:00 +0000").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_forms_as_utc() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_legacy_release_date("2025-03-01 10:00:00"), Some(expected));
        assert_eq!(parse_legacy_release_date("2025-03-01T10:00:00"), Some(expected));

        let midnight = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_legacy_release_date("2025-03-01"), Some(midnight));
    }

    #[test]
    fn test_parse_epoch_millis() {
        let parsed = parse_legacy_release_date("1740823200000").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert_eq!(parse_legacy_release_date(""), None);
        assert_eq!(parse_legacy_release_date("   "), None);
        assert_eq!(parse_legacy_release_date("next tuesday"), None);
        assert_eq!(parse_legacy_release_date("[object Object]"), None);
        assert_eq!(parse_legacy_release_date("2025-13-45"), None);
    }

    #[test]
    fn test_structured_date_wins_over_legacy() {
        let structured = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut model = commission_model(1, structured);
        model.wallet_release_legacy = Some("2030-01-01".to_string());

        assert_eq!(resolve_maturity(&model), Some(structured));
    }

    #[test]
    fn test_legacy_used_when_structured_missing() {
        let mut model = commission_model(1, Utc::now());
        model.wallet_release_date = None;
        model.wallet_release_legacy = Some("2025-01-01".to_string());

        assert_eq!(
            resolve_maturity(&model),
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );

        model.wallet_release_legacy = None;
        assert_eq!(resolve_maturity(&model), None);
    }

    #[test]
    fn test_maturity_boundary_is_inclusive() {
        let now = Utc::now();
        assert!(is_matured(now, now));
        assert!(is_matured(now - TimeDelta::days(2), now));
        assert!(!is_matured(now + TimeDelta::seconds(1), now));
    }
}
