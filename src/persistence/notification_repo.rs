//! Notification repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::notification::{Notification, OpenEvent};
use crate::{AppError, Result};

use super::db::DbPool;
use super::task_repo::created_at_str;

/// Repository wrapper around `SQLite` for notification records.
#[derive(Clone)]
pub struct NotificationRepo {
    db: Arc<DbPool>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: String,
    task_id: String,
    ip: String,
    user_agent: String,
    event_time: String,
}

impl NotificationRow {
    fn into_notification(self) -> Result<Notification> {
        let time = DateTime::parse_from_rfc3339(&self.event_time)
            .map_err(|e| AppError::Db(format!("invalid event_time: {e}")))?
            .with_timezone(&Utc);

        Ok(Notification {
            id: self.id,
            task_id: self.task_id,
            event: OpenEvent {
                ip: self.ip,
                user_agent: self.user_agent,
                time,
            },
        })
    }
}

impl NotificationRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Insert a new notification record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails, including
    /// when the identifier already exists.
    pub async fn create(&self, notification: &Notification) -> Result<Notification> {
        let event_time = notification
            .event
            .time
            .to_rfc3339_opts(SecondsFormat::Nanos, true);

        sqlx::query(
            "INSERT INTO notification (id, task_id, ip, user_agent, event_time, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&notification.id)
        .bind(&notification.task_id)
        .bind(&notification.event.ip)
        .bind(&notification.event.user_agent)
        .bind(&event_time)
        .bind(created_at_str(Utc::now()))
        .execute(self.db.as_ref())
        .await?;

        Ok(notification.clone())
    }

    /// List all notifications for a task, ordered by event time.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_for_task(&self, task_id: &str) -> Result<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(
            "SELECT id, task_id, ip, user_agent, event_time
             FROM notification WHERE task_id = ?1
             ORDER BY event_time ASC",
        )
        .bind(task_id)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter()
            .map(NotificationRow::into_notification)
            .collect()
    }

    /// Count notifications recorded at or after `since`, or all when `None`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn count_since(&self, since: Option<DateTime<Utc>>) -> Result<u64> {
        let (count,): (i64,) = match since {
            Some(cutoff) => {
                sqlx::query_as("SELECT COUNT(*) FROM notification WHERE created_at >= ?1")
                    .bind(created_at_str(cutoff))
                    .fetch_one(self.db.as_ref())
                    .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM notification")
                    .fetch_one(self.db.as_ref())
                    .await?
            }
        };

        u64::try_from(count).map_err(|e| AppError::Db(format!("invalid notification count: {e}")))
    }
}
