//! `SQLite` schema bootstrap logic.
//!
//! All definitions use `IF NOT EXISTS` and are safe to re-run on every
//! server startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply the task and notification tables and their indexes.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS task (
    id              TEXT PRIMARY KEY NOT NULL,
    notify_to       TEXT NOT NULL,
    comments        TEXT NOT NULL,
    submit_at       TEXT NOT NULL,
    adjust_seconds  INTEGER NOT NULL,
    opentimes       INTEGER NOT NULL DEFAULT 0 CHECK(opentimes >= 0),
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notification (
    id              TEXT PRIMARY KEY NOT NULL,
    task_id         TEXT NOT NULL,
    ip              TEXT NOT NULL,
    user_agent      TEXT NOT NULL,
    event_time      TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_task_created ON task(created_at);
CREATE INDEX IF NOT EXISTS idx_notification_task ON notification(task_id);
CREATE INDEX IF NOT EXISTS idx_notification_created ON notification(created_at);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
