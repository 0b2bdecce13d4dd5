//! Open-event dispatch.
//!
//! Each pixel load becomes a detached tokio task that looks up the task,
//! enforces the open limit, records a [`Notification`] and tells the
//! sender through the [`Notifier`]. Nothing here reports back to the
//! HTTP caller; every outcome is logged and returned for observation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info_span, warn, Instrument};

use crate::clock::LocalZone;
use crate::models::notification::Notification;
use crate::models::task::Task;
use crate::notify::{NotificationContent, Notifier};
use crate::persistence::Database;
use crate::{AppError, Result};

/// Longest task identifier that is looked up at all.
pub const MAX_TASK_ID_LEN: usize = 40;

/// What a pixel request carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    /// Task identifier from the track-link.
    pub task_id: String,
    /// Client network address.
    pub ip: String,
    /// Client `User-Agent` header.
    pub user_agent: String,
}

/// Terminal state of one open event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Identifier too long; no lookup attempted.
    Ignored,
    /// No task with this identifier.
    TaskMissing,
    /// Task reached its open limit.
    Limited,
    /// The store failed before a notification could be built.
    StoreFailed,
    /// Provider accepted the notification.
    Dispatched,
    /// Provider unreachable or did not accept the notification.
    DispatchFailed,
}

/// Runs the open-event state machine against shared collaborators.
pub struct OpenDispatcher {
    db: Arc<dyn Database>,
    notifier: Arc<dyn Notifier>,
    open_limit: u32,
    zone: LocalZone,
}

impl OpenDispatcher {
    /// Create a dispatcher allowing `open_limit` accepted opens per task.
    #[must_use]
    pub fn new(
        db: Arc<dyn Database>,
        notifier: Arc<dyn Notifier>,
        open_limit: u32,
        zone: LocalZone,
    ) -> Self {
        Self {
            db,
            notifier,
            open_limit,
            zone,
        }
    }

    /// Whether `task_id` is short enough to be looked up.
    #[must_use]
    pub fn accepts(task_id: &str) -> bool {
        task_id.len() <= MAX_TASK_ID_LEN
    }

    /// Handle `request` on a detached task, observed now.
    ///
    /// Returns `None` without spawning when the identifier is rejected.
    /// Dropping the handle does not cancel the work.
    pub fn spawn(self: &Arc<Self>, request: OpenRequest) -> Option<JoinHandle<DispatchOutcome>> {
        if !Self::accepts(&request.task_id) {
            debug!(len = request.task_id.len(), "task id too long; ignoring open");
            return None;
        }
        let dispatcher = Arc::clone(self);
        Some(tokio::spawn(async move {
            dispatcher.handle(request, Utc::now()).await
        }))
    }

    /// Run the full state machine for one open observed at `observed_at`.
    pub async fn handle(&self, request: OpenRequest, observed_at: DateTime<Utc>) -> DispatchOutcome {
        let span = info_span!("open", task_id = %request.task_id);
        self.run(request, observed_at).instrument(span).await
    }

    async fn run(&self, request: OpenRequest, observed_at: DateTime<Utc>) -> DispatchOutcome {
        if !Self::accepts(&request.task_id) {
            return DispatchOutcome::Ignored;
        }

        let task = match self.admit(&request.task_id).await {
            Ok(task) => task,
            Err(AppError::NotFound(msg)) => {
                warn!(%msg, "task not found");
                return DispatchOutcome::TaskMissing;
            }
            Err(AppError::LimitExceeded(msg)) => {
                warn!(%msg, "task opened too many times");
                return DispatchOutcome::Limited;
            }
            Err(err) => {
                error!(%err, "admit open failed");
                return DispatchOutcome::StoreFailed;
            }
        };

        let notification = Notification::new(
            task.id.clone(),
            request.ip,
            request.user_agent,
            observed_at,
            task.adjust,
        );

        if let Err(err) = self.db.save_notification(&notification).await {
            error!(notification_id = %notification.id, %err, "save notification failed");
        }

        debug!(notify_to = %task.notify_to, "send notification");
        let content = NotificationContent::new(&notification, &task.comments, self.zone);
        match self.notifier.send(&task.notify_to, &content).await {
            Err(err) => {
                error!(%err, "send notification failed");
                DispatchOutcome::DispatchFailed
            }
            Ok(delivery) if !delivery.is_accepted() => {
                error!(
                    notify_to = %task.notify_to,
                    comments = %task.comments,
                    submit_at = %task.submit_at,
                    adjust_seconds = task.adjust.num_seconds(),
                    opentimes = task.opentimes,
                    status = delivery.status,
                    body = %delivery.body,
                    "notification not accepted by provider"
                );
                DispatchOutcome::DispatchFailed
            }
            Ok(_) => {
                debug!(notification_id = %notification.id, "send notification done");
                DispatchOutcome::Dispatched
            }
        }
    }

    /// Look up the task and claim one open slot on it.
    async fn admit(&self, task_id: &str) -> Result<Task> {
        let task = self
            .db
            .find_task(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task {task_id}")))?;

        if task.opentimes >= self.open_limit {
            return Err(AppError::LimitExceeded(format!(
                "opentimes {} reached limit {}",
                task.opentimes, self.open_limit
            )));
        }

        // The conditional update settles concurrent opens past the check above.
        let opentimes = self
            .db
            .record_open(&task.id, self.open_limit)
            .await?
            .ok_or_else(|| {
                AppError::LimitExceeded(format!("limit {} reached concurrently", self.open_limit))
            })?;
        debug!(opentimes, "open recorded");

        Ok(task)
    }
}
