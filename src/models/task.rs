//! Tracking task model.

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde::{Deserialize, Serialize};

/// A tracking request submitted by a sender.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    /// Content-derived identifier; empty until assigned on submit.
    pub id: String,
    /// Address informed when the pixel is loaded.
    pub notify_to: String,
    /// Free-text annotation echoed back in notifications.
    pub comments: String,
    /// Local wall-clock time the sender claims the message was sent.
    pub submit_at: DateTime<FixedOffset>,
    /// `submit_at` minus the actual submission instant, in whole seconds.
    #[serde(with = "adjust_seconds")]
    pub adjust: TimeDelta,
    /// Number of accepted opens so far.
    pub opentimes: u32,
}

impl Task {
    /// Construct an unsaved task with no identifier and no opens.
    #[must_use]
    pub fn new(
        notify_to: String,
        comments: String,
        submit_at: DateTime<FixedOffset>,
        adjust: TimeDelta,
    ) -> Self {
        Self {
            id: String::new(),
            notify_to,
            comments,
            submit_at,
            adjust,
            opentimes: 0,
        }
    }
}

/// Serialize a [`TimeDelta`] as signed whole seconds.
mod adjust_seconds {
    use chrono::TimeDelta;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(value.num_seconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<TimeDelta, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = i64::deserialize(deserializer)?;
        TimeDelta::try_seconds(seconds)
            .ok_or_else(|| D::Error::custom(format!("adjust out of range: {seconds}")))
    }
}
