//! Local zone handling and submission-time adjustment.

use chrono::{DateTime, FixedOffset, NaiveTime, TimeDelta, TimeZone, Utc};

use crate::{AppError, Result};

/// The deployment's canonical local zone, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalZone {
    offset: FixedOffset,
}

impl LocalZone {
    /// Build a zone `minutes` east of UTC.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the offset is out of range.
    pub fn from_offset_minutes(minutes: i32) -> Result<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(|offset| Self { offset })
            .ok_or_else(|| AppError::Config(format!("utc offset out of range: {minutes}m")))
    }

    /// The zone's offset from UTC.
    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Express `instant` in the local zone.
    #[must_use]
    pub fn at(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    /// Local midnight at the start of the day containing `instant`, in UTC.
    #[must_use]
    pub fn day_start(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let midnight = self.at(instant).date_naive().and_time(NaiveTime::MIN);
        self.offset
            .from_local_datetime(&midnight)
            .single()
            .map_or(instant, |local| local.with_timezone(&Utc))
    }
}

/// Unix timestamp of `0001-01-01T00:00:00Z`, the zero time clients send
/// for an unset timestamp.
const ZERO_INSTANT_SECS: i64 = -62_135_596_800;

/// Whether `time` is the zero instant `0001-01-01T00:00:00Z`.
#[must_use]
pub fn is_zero_instant(time: &DateTime<FixedOffset>) -> bool {
    time.timestamp() == ZERO_INSTANT_SECS && time.timestamp_subsec_nanos() == 0
}

/// The declared submission time, defaulting to `now` in the local zone.
///
/// A missing declaration and the zero instant both count as unset.
#[must_use]
pub fn resolve_submit_at(
    declared: Option<DateTime<FixedOffset>>,
    zone: LocalZone,
    now: DateTime<Utc>,
) -> DateTime<FixedOffset> {
    declared
        .filter(|time| !is_zero_instant(time))
        .unwrap_or_else(|| zone.at(now))
}

/// Offset between the declared submission time and `now`, truncated
/// toward zero to whole seconds.
#[must_use]
pub fn compute_adjust(declared: DateTime<FixedOffset>, now: DateTime<Utc>) -> TimeDelta {
    let delta = declared.signed_duration_since(now);
    TimeDelta::seconds(delta.num_seconds())
}
