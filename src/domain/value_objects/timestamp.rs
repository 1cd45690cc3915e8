//! # Timestamp Value Object
//!
//! UTC point in time used for every engine-stamped offer field.
//!
//! # Examples
//!
//! ```
//! use offer_negotiation::domain::value_objects::timestamp::Timestamp;
//!
//! let created = Timestamp::now();
//! let valid_until = created.add_days(7);
//!
//! assert!(valid_until.is_after(&created));
//! assert!(!valid_until.is_expired());
//! ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A UTC timestamp.
///
/// Wraps `chrono::DateTime<Utc>` and serializes as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from Unix milliseconds.
    ///
    /// Returns `None` if the value is out of range.
    #[must_use]
    pub fn from_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    /// Creates a timestamp from Unix seconds.
    ///
    /// Returns `None` if the value is out of range.
    #[must_use]
    pub fn from_secs(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    /// Returns the Unix timestamp in milliseconds.
    #[inline]
    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Returns the Unix timestamp in seconds.
    #[inline]
    #[must_use]
    pub fn timestamp_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Adds seconds to the timestamp (negative values subtract).
    ///
    /// Saturates at the representable range.
    #[must_use]
    pub fn add_secs(&self, secs: i64) -> Self {
        self.saturating_add(Duration::try_seconds(secs), secs.is_negative())
    }

    /// Adds whole days to the timestamp (negative values subtract).
    ///
    /// Saturates at the representable range.
    #[must_use]
    pub fn add_days(&self, days: i64) -> Self {
        self.saturating_add(Duration::try_days(days), days.is_negative())
    }

    fn saturating_add(&self, delta: Option<Duration>, negative: bool) -> Self {
        match delta.and_then(|d| self.0.checked_add_signed(d)) {
            Some(moved) => Self(moved),
            None if negative => Self(DateTime::<Utc>::MIN_UTC),
            None => Self(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Returns true if this timestamp is in the past.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(&Self::now())
    }

    /// Returns true if this timestamp lies before `now`.
    #[inline]
    #[must_use]
    pub fn is_expired_at(&self, now: &Self) -> bool {
        self.0 < now.0
    }

    /// Returns true if this timestamp is before another.
    #[inline]
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self.0 < other.0
    }

    /// Returns true if this timestamp is after another.
    #[inline]
    #[must_use]
    pub fn is_after(&self, other: &Self) -> bool {
        self.0 > other.0
    }

    /// Returns the underlying DateTime.
    #[inline]
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod construction {
        use super::*;

        #[test]
        fn now_creates_current_time() {
            let before = Utc::now();
            let ts = Timestamp::now();
            let after = Utc::now();

            assert!(ts.0 >= before);
            assert!(ts.0 <= after);
        }

        #[test]
        fn from_millis_works() {
            let ts = Timestamp::from_millis(1_704_067_200_000).unwrap();
            assert_eq!(ts.timestamp_millis(), 1_704_067_200_000);
        }

        #[test]
        fn from_secs_works() {
            let ts = Timestamp::from_secs(1_704_067_200).unwrap();
            assert_eq!(ts.timestamp_secs(), 1_704_067_200);
        }
    }

    mod arithmetic {
        use super::*;

        #[test]
        fn add_days_is_whole_days() {
            let ts = Timestamp::from_secs(0).unwrap();
            assert_eq!(ts.add_days(7).timestamp_secs(), 7 * 86_400);
        }

        #[test]
        fn add_negative_secs() {
            let ts = Timestamp::from_secs(1000).unwrap();
            assert_eq!(ts.add_secs(-60).timestamp_secs(), 940);
        }

        #[test]
        fn add_days_saturates_instead_of_overflowing() {
            let now = Timestamp::now();
            assert_eq!(now.add_days(i64::MAX).0, DateTime::<Utc>::MAX_UTC);
            assert_eq!(now.add_days(i64::MIN).0, DateTime::<Utc>::MIN_UTC);
            assert_eq!(now.add_secs(i64::MAX).0, DateTime::<Utc>::MAX_UTC);
        }
    }

    mod comparison {
        use super::*;

        #[test]
        fn is_expired_past() {
            assert!(Timestamp::from_secs(0).unwrap().is_expired());
        }

        #[test]
        fn is_expired_future() {
            assert!(!Timestamp::now().add_secs(3600).is_expired());
        }

        #[test]
        fn is_expired_at_reference_point() {
            let deadline = Timestamp::from_secs(1000).unwrap();
            assert!(!deadline.is_expired_at(&Timestamp::from_secs(1000).unwrap()));
            assert!(deadline.is_expired_at(&Timestamp::from_secs(1001).unwrap()));
        }

        #[test]
        fn before_and_after() {
            let ts1 = Timestamp::from_secs(1000).unwrap();
            let ts2 = Timestamp::from_secs(2000).unwrap();
            assert!(ts1.is_before(&ts2));
            assert!(ts2.is_after(&ts1));
            assert!(ts1 < ts2);
        }
    }

    #[test]
    fn serde_roundtrip_is_rfc3339() {
        let ts = Timestamp::from_millis(1_704_067_200_123).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.contains("2024-01-01T"));
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, back);
    }
}
