//! Open-event notification model.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::identity;

/// What the tracking pixel request revealed about the reader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct OpenEvent {
    /// Client network address.
    pub ip: String,
    /// Client `User-Agent` header.
    pub user_agent: String,
    /// Observation time shifted by the owning task's adjust.
    pub time: DateTime<Utc>,
}

/// A record of one accepted open of a tracked message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Notification {
    /// Content-derived identifier.
    pub id: String,
    /// Task whose pixel was loaded.
    pub task_id: String,
    /// Open event details.
    pub event: OpenEvent,
}

impl Notification {
    /// Build a notification for an open observed at `observed_at`.
    ///
    /// The event time reports the sender's timeline: `observed_at + adjust`.
    #[must_use]
    pub fn new(
        task_id: String,
        ip: String,
        user_agent: String,
        observed_at: DateTime<Utc>,
        adjust: TimeDelta,
    ) -> Self {
        // Validated tasks keep adjust within a year, far from overflow.
        let time = observed_at
            .checked_add_signed(adjust)
            .unwrap_or(observed_at);
        let mut notification = Self {
            id: String::new(),
            task_id,
            event: OpenEvent {
                ip,
                user_agent,
                time,
            },
        };
        notification.id = identity::notification_id(&notification);
        notification
    }
}
