//! `SQLite` implementation of the [`Database`] capability.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::notification::Notification;
use crate::models::status::{Counters, Status};
use crate::models::task::Task;

use super::db::DbPool;
use super::notification_repo::NotificationRepo;
use super::task_repo::TaskRepo;
use super::{Database, StoreFuture};

/// Task store backed by the task and notification repositories.
#[derive(Clone)]
pub struct SqliteStore {
    tasks: TaskRepo,
    notifications: NotificationRepo,
}

impl SqliteStore {
    /// Create a store over a shared pool.
    #[must_use]
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            tasks: TaskRepo::new(Arc::clone(&db)),
            notifications: NotificationRepo::new(db),
        }
    }
}

impl Database for SqliteStore {
    fn find_task<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Option<Task>> {
        Box::pin(self.tasks.get_by_id(id))
    }

    fn save_task<'a>(&'a self, task: &'a Task) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            if !self.tasks.create(task).await? {
                tracing::debug!(task_id = %task.id, "task already stored; keeping existing record");
            }
            Ok(())
        })
    }

    fn record_open<'a>(&'a self, id: &'a str, limit: u32) -> StoreFuture<'a, Option<u32>> {
        Box::pin(self.tasks.increment_opentimes(id, limit))
    }

    fn save_notification<'a>(&'a self, notification: &'a Notification) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.notifications.create(notification).await?;
            Ok(())
        })
    }

    fn notifications_for_task<'a>(
        &'a self,
        task_id: &'a str,
    ) -> StoreFuture<'a, Vec<Notification>> {
        Box::pin(self.notifications.list_for_task(task_id))
    }

    fn status(&self, day_start: DateTime<Utc>) -> StoreFuture<'_, Status> {
        Box::pin(async move {
            Ok(Status {
                daily: Counters {
                    task_submit: self.tasks.count_since(Some(day_start)).await?,
                    notification: self.notifications.count_since(Some(day_start)).await?,
                },
                total: Counters {
                    task_submit: self.tasks.count_since(None).await?,
                    notification: self.notifications.count_since(None).await?,
                },
            })
        })
    }
}
