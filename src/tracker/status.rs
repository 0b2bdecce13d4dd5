//! Read-only aggregate view for the status badges.

use chrono::{DateTime, Utc};

use crate::clock::LocalZone;
use crate::models::status::Status;
use crate::persistence::Database;
use crate::Result;

/// Current daily and total counters, with the day starting at local
/// midnight in `zone`.
///
/// # Errors
///
/// Returns `AppError::Db` if the store query fails.
pub async fn snapshot(db: &dyn Database, zone: LocalZone, now: DateTime<Utc>) -> Result<Status> {
    db.status(zone.day_start(now)).await
}
