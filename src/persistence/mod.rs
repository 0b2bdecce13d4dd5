//! Persistence layer modules.
//!
//! The core reaches storage only through the [`Database`] trait;
//! [`store::SqliteStore`] is the production implementation.

pub mod db;
pub mod notification_repo;
pub mod schema;
pub mod store;
pub mod task_repo;

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};

use crate::models::notification::Notification;
use crate::models::status::Status;
use crate::models::task::Task;
use crate::Result;

/// Boxed future returned by [`Database`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Storage capability consumed by the submit and open flows.
///
/// Implementations must make each operation atomic per key; the core
/// performs no cross-operation locking.
pub trait Database: Send + Sync {
    /// Fetch a task by identifier.
    ///
    /// Returns `Ok(None)` when no such task exists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the lookup fails.
    fn find_task<'a>(&'a self, id: &'a str) -> StoreFuture<'a, Option<Task>>;

    /// Persist a newly submitted task.
    ///
    /// Saving a task whose identifier already exists keeps the stored record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the write fails.
    fn save_task<'a>(&'a self, task: &'a Task) -> StoreFuture<'a, ()>;

    /// Atomically increment a task's open count if it is below `limit`.
    ///
    /// Returns the new count, or `Ok(None)` when the task is missing or
    /// already at the limit.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    fn record_open<'a>(&'a self, id: &'a str, limit: u32) -> StoreFuture<'a, Option<u32>>;

    /// Persist a notification.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the write fails.
    fn save_notification<'a>(&'a self, notification: &'a Notification) -> StoreFuture<'a, ()>;

    /// All notifications recorded for a task, oldest event first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    fn notifications_for_task<'a>(&'a self, task_id: &'a str)
        -> StoreFuture<'a, Vec<Notification>>;

    /// Task and notification counts since `day_start` and overall.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    fn status(&self, day_start: DateTime<Utc>) -> StoreFuture<'_, Status>;
}
