//! Content-derived identifiers for tasks and notifications.
//!
//! An identifier is the SHA-256 digest of a canonical JSON rendering of
//! the entity's semantic fields, hex-encoded and cut to [`ID_LEN`]
//! characters. Identical content always yields the identical identifier.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::notification::Notification;
use crate::models::task::Task;

/// Length of every generated identifier, in hex characters (160 bits).
pub const ID_LEN: usize = 40;

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Fingerprint<'a> {
    Task {
        notify_to: &'a str,
        comments: &'a str,
        submit_at: String,
    },
    Notification {
        task_id: &'a str,
        ip: &'a str,
        user_agent: &'a str,
        time: String,
    },
}

/// Identifier for a task, derived from its address, comments and
/// declared submission time.
#[must_use]
pub fn task_id(task: &Task) -> String {
    digest(&Fingerprint::Task {
        notify_to: &task.notify_to,
        comments: &task.comments,
        submit_at: canonical_time(&task.submit_at),
    })
}

/// Identifier for a notification, derived from its task reference and
/// open event.
#[must_use]
pub fn notification_id(notification: &Notification) -> String {
    digest(&Fingerprint::Notification {
        task_id: &notification.task_id,
        ip: &notification.event.ip,
        user_agent: &notification.event.user_agent,
        time: canonical_time(&notification.event.time.fixed_offset()),
    })
}

/// Render a timestamp as a single canonical instant in UTC so equal
/// instants expressed in different offsets hash alike.
fn canonical_time(time: &DateTime<FixedOffset>) -> String {
    time.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn digest(fingerprint: &Fingerprint<'_>) -> String {
    // Serializing borrowed strings into a Vec cannot fail.
    let canonical = serde_json::to_vec(fingerprint).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(ID_LEN);
    hex
}
