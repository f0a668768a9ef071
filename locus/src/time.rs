//! Time-related utility functions.
//!
//! Fix and remote-position timestamps are wall-clock `DateTime<Utc>` values
//! because they cross process and device boundaries. These helpers turn
//! them into the `std::time::Duration` ages the engine reasons with.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

/// Age of a timestamp at `now`.
///
/// Timestamps in the future (clock skew between devices) have age zero
/// rather than failing.
///
/// # Example
///
/// ```
/// use chrono::{Duration as ChronoDuration, Utc};
/// use locus::time::age_between;
///
/// let now = Utc::now();
/// let then = now - ChronoDuration::seconds(90);
/// assert_eq!(age_between(then, now).as_secs(), 90);
/// ```
pub fn age_between(then: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(then)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Convert milliseconds since the Unix epoch to a UTC timestamp.
///
/// Mobile location APIs report capture time this way. Returns `None` for
/// values chrono cannot represent.
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_between_past() {
        let now = Utc::now();
        let then = now - chrono::Duration::seconds(60);

        assert_eq!(age_between(then, now), Duration::from_secs(60));
    }

    #[test]
    fn age_between_same_instant() {
        let now = Utc::now();
        assert_eq!(age_between(now, now), Duration::ZERO);
    }

    #[test]
    fn age_between_future() {
        let now = Utc::now();
        let future = now + chrono::Duration::seconds(60);

        // Future times have zero age (not an error)
        assert_eq!(age_between(future, now), Duration::ZERO);
    }

    #[test]
    fn from_epoch_millis_roundtrip() {
        let ts = from_epoch_millis(1_700_000_000_123).unwrap();
        assert_eq!(ts.timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn from_epoch_millis_out_of_range() {
        assert!(from_epoch_millis(i64::MAX).is_none());
    }
}
