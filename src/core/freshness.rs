//! Time-to-live check applied before a cached rate is served

use crate::core::error::RateError;
use chrono::{DateTime, Utc};

/// Decides whether a table refreshed at `last_refresh` may still be served at `now`.
///
/// A missing timestamp does not block; the pair lookup reports unavailability
/// instead. An unparseable timestamp is treated as stale.
pub fn check_freshness(
    last_refresh: Option<&str>,
    ttl_seconds: u64,
    now: DateTime<Utc>,
) -> Result<(), RateError> {
    let Some(raw) = last_refresh else {
        return Ok(());
    };

    let stale = || RateError::Stale {
        ttl_seconds,
        last_refresh: raw.to_string(),
    };

    let refreshed = DateTime::parse_from_rfc3339(raw.trim()).map_err(|_| stale())?;
    let age = now.signed_duration_since(refreshed.with_timezone(&Utc));
    if age.num_seconds() > i64::try_from(ttl_seconds).unwrap_or(i64::MAX) {
        return Err(stale());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, SecondsFormat};

    fn ts(dt: DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, false)
    }

    #[test]
    fn test_age_over_ttl_is_stale() {
        let now = Utc::now();
        let refreshed = ts(now - Duration::seconds(301));
        let err = check_freshness(Some(&refreshed), 300, now).unwrap_err();
        match err {
            RateError::Stale {
                ttl_seconds,
                last_refresh,
            } => {
                assert_eq!(ttl_seconds, 300);
                assert_eq!(last_refresh, refreshed);
            }
            other => panic!("Expected stale error, got {other:?}"),
        }
    }

    #[test]
    fn test_age_under_ttl_is_fresh() {
        let now = Utc::now();
        let refreshed = ts(now - Duration::seconds(299));
        assert!(check_freshness(Some(&refreshed), 300, now).is_ok());
    }

    #[test]
    fn test_age_equal_to_ttl_is_fresh() {
        let now = Utc::now();
        let refreshed = ts(now - Duration::seconds(300));
        assert!(check_freshness(Some(&refreshed), 300, now).is_ok());
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let now = Utc::now();
        let refreshed = ts(now - Duration::days(3650));
        assert!(check_freshness(Some(&refreshed), u64::MAX, now).is_ok());
    }

    #[test]
    fn test_zulu_suffix_is_accepted() {
        let now = "2025-10-10T12:01:00Z".parse::<DateTime<Utc>>().unwrap();
        assert!(check_freshness(Some("2025-10-10T12:00:00Z"), 300, now).is_ok());
    }

    #[test]
    fn test_unparseable_timestamp_fails_closed() {
        let result = check_freshness(Some("yesterday-ish"), 300, Utc::now());
        assert!(matches!(result, Err(RateError::Stale { .. })));
    }

    #[test]
    fn test_missing_timestamp_does_not_block() {
        assert!(check_freshness(None, 300, Utc::now()).is_ok());
    }
}
