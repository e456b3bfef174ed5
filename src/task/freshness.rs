/// Cache freshness policy
///
/// Pure decision over a task definition and a point in time. Anything that
/// cannot prove the cache fresh makes it stale.
use chrono::{DateTime, Utc};

use crate::config::TaskDefinition;
use crate::duration::parse_ttl;

/// Why cached output may or may not be served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Forced,
    NeverRun,
    NoTtl,
    InvalidTtl,
    InvalidTimestamp,
    Expired,
}

impl Freshness {
    pub fn is_fresh(self) -> bool {
        self == Self::Fresh
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Forced => "forced",
            Self::NeverRun => "never_run",
            Self::NoTtl => "no_ttl",
            Self::InvalidTtl => "invalid_ttl",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::Expired => "expired",
        }
    }
}

/// Classify the cache state of `task` at `now`.
pub fn freshness(task: &TaskDefinition, now: DateTime<Utc>, force_refresh: bool) -> Freshness {
    if force_refresh {
        return Freshness::Forced;
    }

    let Some(last_fetched) = task.last_fetched.as_deref() else {
        return Freshness::NeverRun;
    };
    let Some(ttl) = task.ttl.as_deref() else {
        return Freshness::NoTtl;
    };

    let Ok(last_fetched) = DateTime::parse_from_rfc3339(last_fetched.trim()) else {
        return Freshness::InvalidTimestamp;
    };
    let Ok(ttl) = parse_ttl(ttl) else {
        return Freshness::InvalidTtl;
    };
    let Ok(ttl) = chrono::Duration::from_std(ttl) else {
        return Freshness::InvalidTtl;
    };

    if now.signed_duration_since(last_fetched.with_timezone(&Utc)) < ttl {
        Freshness::Fresh
    } else {
        Freshness::Expired
    }
}

/// True only when cached output can be proven fresh.
pub fn is_valid(task: &TaskDefinition, now: DateTime<Utc>, force_refresh: bool) -> bool {
    freshness(task, now, force_refresh).is_fresh()
}

/// Format a timestamp the way it is stored in `lastFetched`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task(ttl: Option<&str>, last_fetched: Option<String>) -> TaskDefinition {
        TaskDefinition {
            command: "echo status:ok".to_string(),
            ttl: ttl.map(str::to_string),
            notes: None,
            last_fetched,
        }
    }

    fn ago(now: DateTime<Utc>, minutes: i64) -> Option<String> {
        Some(format_timestamp(now - Duration::minutes(minutes)))
    }

    #[test]
    fn test_fresh_within_ttl() {
        let now = Utc::now();
        let task = task(Some("1h"), ago(now, 45));
        assert_eq!(freshness(&task, now, false), Freshness::Fresh);
        assert!(is_valid(&task, now, false));
    }

    #[test]
    fn test_expired_after_ttl() {
        let now = Utc::now();
        assert_eq!(
            freshness(&task(Some("1h"), ago(now, 90)), now, false),
            Freshness::Expired
        );
    }

    #[test]
    fn test_exact_ttl_boundary_is_expired() {
        let now: DateTime<Utc> = "2025-06-01T12:00:00Z".parse().unwrap();
        let task = task(Some("1h"), Some("2025-06-01T11:00:00Z".to_string()));
        assert_eq!(freshness(&task, now, false), Freshness::Expired);
    }

    #[test]
    fn test_force_refresh_always_stale() {
        let now = Utc::now();
        let task = task(Some("24h"), ago(now, 1));
        assert_eq!(freshness(&task, now, true), Freshness::Forced);
        assert!(!is_valid(&task, now, true));
    }

    #[test]
    fn test_missing_fields_fail_closed() {
        let now = Utc::now();
        assert_eq!(
            freshness(&task(Some("1h"), None), now, false),
            Freshness::NeverRun
        );
        assert_eq!(
            freshness(&task(None, ago(now, 1)), now, false),
            Freshness::NoTtl
        );
    }

    #[test]
    fn test_unparseable_values_fail_closed() {
        let now = Utc::now();
        assert_eq!(
            freshness(&task(Some("not-a-duration"), ago(now, 1)), now, false),
            Freshness::InvalidTtl
        );
        assert_eq!(
            freshness(&task(Some("0s"), ago(now, 1)), now, false),
            Freshness::InvalidTtl
        );
        assert_eq!(
            freshness(&task(Some("1h"), Some("yesterday".to_string())), now, false),
            Freshness::InvalidTimestamp
        );
    }

    #[test]
    fn test_offset_timestamps_are_compared_in_utc() {
        let now: DateTime<Utc> = "2025-06-01T12:00:00Z".parse().unwrap();
        // 13:30 at +02:00 is 11:30 UTC, thirty minutes ago
        let task = task(Some("1h"), Some("2025-06-01T13:30:00+02:00".to_string()));
        assert!(is_valid(&task, now, false));
    }

    #[test]
    fn test_future_timestamp_counts_as_fresh() {
        let now = Utc::now();
        let task = task(Some("1m"), ago(now, -10));
        assert!(is_valid(&task, now, false));
    }
}
