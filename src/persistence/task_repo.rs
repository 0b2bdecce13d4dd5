//! Task repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

use crate::models::task::Task;
use crate::{AppError, Result};

use super::db::DbPool;

/// Repository wrapper around `SQLite` for task records.
#[derive(Clone)]
pub struct TaskRepo {
    db: Arc<DbPool>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    notify_to: String,
    comments: String,
    submit_at: String,
    adjust_seconds: i64,
    opentimes: i64,
}

impl TaskRow {
    /// Convert a database row into the domain model.
    fn into_task(self) -> Result<Task> {
        let submit_at = DateTime::parse_from_rfc3339(&self.submit_at)
            .map_err(|e| AppError::Db(format!("invalid submit_at: {e}")))?;
        let adjust = TimeDelta::try_seconds(self.adjust_seconds)
            .ok_or_else(|| AppError::Db(format!("invalid adjust: {}", self.adjust_seconds)))?;
        let opentimes = u32::try_from(self.opentimes)
            .map_err(|e| AppError::Db(format!("invalid opentimes: {e}")))?;

        Ok(Task {
            id: self.id,
            notify_to: self.notify_to,
            comments: self.comments,
            submit_at,
            adjust,
            opentimes,
        })
    }
}

/// Timestamp format for `created_at` columns; fixed width so text
/// comparison orders chronologically.
pub(crate) fn created_at_str(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl TaskRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Insert a task unless one with the same identifier already exists.
    ///
    /// Returns `true` when a new row was written.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn create(&self, task: &Task) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO task (id, notify_to, comments, submit_at, adjust_seconds,
             opentimes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&task.id)
        .bind(&task.notify_to)
        .bind(&task.comments)
        .bind(task.submit_at.to_rfc3339())
        .bind(task.adjust.num_seconds())
        .bind(i64::from(task.opentimes))
        .bind(created_at_str(Utc::now()))
        .execute(self.db.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Retrieve a task by its ID.
    ///
    /// Returns `Ok(None)` if the task does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as(
            "SELECT id, notify_to, comments, submit_at, adjust_seconds, opentimes
             FROM task WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(TaskRow::into_task).transpose()
    }

    /// Increment the open count if it is still below `limit`.
    ///
    /// The check and the increment run as one statement, so concurrent
    /// opens cannot push the count past `limit`. Returns the new count,
    /// or `None` if the task is missing or already at the limit.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn increment_opentimes(&self, id: &str, limit: u32) -> Result<Option<u32>> {
        let row: Option<(i64,)> = sqlx::query_as(
            "UPDATE task SET opentimes = opentimes + 1
             WHERE id = ?1 AND opentimes < ?2
             RETURNING opentimes",
        )
        .bind(id)
        .bind(i64::from(limit))
        .fetch_optional(self.db.as_ref())
        .await?;

        row.map(|(count,)| {
            u32::try_from(count).map_err(|e| AppError::Db(format!("invalid opentimes: {e}")))
        })
        .transpose()
    }

    /// Count tasks created at or after `since`, or all tasks when `None`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count_since(&self, since: Option<DateTime<Utc>>) -> Result<u64> {
        let (count,): (i64,) = match since {
            Some(cutoff) => {
                sqlx::query_as("SELECT COUNT(*) FROM task WHERE created_at >= ?1")
                    .bind(created_at_str(cutoff))
                    .fetch_one(self.db.as_ref())
                    .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM task")
                    .fetch_one(self.db.as_ref())
                    .await?
            }
        };

        u64::try_from(count).map_err(|e| AppError::Db(format!("invalid task count: {e}")))
    }
}
