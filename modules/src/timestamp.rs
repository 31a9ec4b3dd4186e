use std::convert::TryFrom;
use std::fmt;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_derive::{Deserialize, Serialize};

use crate::proto::RawTimestamp;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// A point in time, in nanoseconds since the Unix epoch.
///
/// The zero value means "not set", which is how packets express the absence of a timestamp
/// timeout.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    nanoseconds: u64,
}

impl Timestamp {
    pub const fn from_nanoseconds(nanoseconds: u64) -> Self {
        Self { nanoseconds }
    }

    pub const fn from_seconds(seconds: u64) -> Self {
        Self {
            nanoseconds: seconds * NANOS_PER_SECOND,
        }
    }

    pub const fn none() -> Self {
        Self { nanoseconds: 0 }
    }

    pub fn now() -> Self {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        Self::from_nanoseconds(u64::try_from(nanos).unwrap_or_default())
    }

    pub fn nanoseconds(&self) -> u64 {
        self.nanoseconds
    }

    pub fn is_set(&self) -> bool {
        self.nanoseconds != 0
    }

    pub fn checked_add(self, duration: Duration) -> Option<Self> {
        let nanos = u64::try_from(duration.as_nanos()).ok()?;
        self.nanoseconds.checked_add(nanos).map(Self::from_nanoseconds)
    }

    pub fn checked_sub(self, duration: Duration) -> Option<Self> {
        let nanos = u64::try_from(duration.as_nanos()).ok()?;
        self.nanoseconds.checked_sub(nanos).map(Self::from_nanoseconds)
    }

    /// Returns `None` if `earlier` is after `self`.
    pub fn duration_since(&self, earlier: &Timestamp) -> Option<Duration> {
        self.nanoseconds
            .checked_sub(earlier.nanoseconds)
            .map(Duration::from_nanos)
    }

    pub fn after(&self, other: &Timestamp) -> bool {
        self.nanoseconds > other.nanoseconds
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_set() {
            return write!(f, "NoTimestamp");
        }
        let nanos = i64::try_from(self.nanoseconds).unwrap_or(i64::MAX);
        write!(f, "{}", Utc.timestamp_nanos(nanos).to_rfc3339())
    }
}

impl From<Timestamp> for RawTimestamp {
    fn from(ts: Timestamp) -> Self {
        RawTimestamp {
            seconds: ts.nanoseconds / NANOS_PER_SECOND,
            nanos: (ts.nanoseconds % NANOS_PER_SECOND) as u32,
        }
    }
}

impl From<RawTimestamp> for Timestamp {
    fn from(raw: RawTimestamp) -> Self {
        Timestamp::from_nanoseconds(
            raw.seconds
                .saturating_mul(NANOS_PER_SECOND)
                .saturating_add(u64::from(raw.nanos)),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Timestamp;

    #[test]
    fn timestamp_arithmetic() {
        let t = Timestamp::from_seconds(10);
        let later = t.checked_add(Duration::from_secs(5)).unwrap();

        assert_eq!(later, Timestamp::from_seconds(15));
        assert_eq!(later.duration_since(&t), Some(Duration::from_secs(5)));
        assert_eq!(t.duration_since(&later), None);
        assert!(later.after(&t));
        assert!(!Timestamp::none().is_set());
        assert_eq!(t.checked_sub(Duration::from_secs(11)), None);
    }

    #[test]
    fn timestamp_display() {
        assert_eq!(Timestamp::none().to_string(), "NoTimestamp");
        assert_eq!(
            Timestamp::from_seconds(0).checked_add(Duration::from_secs(1)).unwrap().to_string(),
            "1970-01-01T00:00:01+00:00"
        );
    }
}
