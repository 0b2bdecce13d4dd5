//! Task submission flow.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{self, LocalZone};
use crate::identity;
use crate::models::task::Task;
use crate::persistence::Database;
use crate::validation::TaskValidator;
use crate::Result;

/// Caller-supplied submission payload.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SubmitRequest {
    /// Address to notify when the pixel is loaded.
    pub notify_to: String,
    /// Free-text annotation.
    #[serde(default)]
    pub comments: String,
    /// Claimed local send time; defaults to now in the local zone.
    #[serde(default)]
    pub local_time: Option<DateTime<FixedOffset>>,
}

/// Identifier and track-link of an accepted task.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Submitted {
    /// Task identifier.
    pub task_id: String,
    /// URL serving the tracking pixel.
    pub track_link: String,
}

/// Validates, identifies and stores submitted tasks.
pub struct Submitter {
    db: Arc<dyn Database>,
    validator: TaskValidator,
    zone: LocalZone,
    link_prefix: String,
}

impl Submitter {
    /// Create a submitter writing to `db` and linking under `link_prefix`.
    #[must_use]
    pub fn new(
        db: Arc<dyn Database>,
        validator: TaskValidator,
        zone: LocalZone,
        link_prefix: impl Into<String>,
    ) -> Self {
        Self {
            db,
            validator,
            zone,
            link_prefix: link_prefix.into(),
        }
    }

    /// Accept a task submitted at `now`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the task is unacceptable, in which
    /// case nothing is stored, or `AppError::Db` if persisting it fails.
    pub async fn submit(&self, request: SubmitRequest, now: DateTime<Utc>) -> Result<Submitted> {
        let submit_at = clock::resolve_submit_at(request.local_time, self.zone, now);
        let adjust = clock::compute_adjust(submit_at, now);

        let mut task = Task::new(
            request.notify_to.trim().to_owned(),
            request.comments,
            submit_at,
            adjust,
        );
        self.validator.validate(&task)?;
        task.id = identity::task_id(&task);

        debug!(
            task_id = %task.id,
            notify_to = %task.notify_to,
            comments = %task.comments,
            "submit task"
        );
        debug!(submit_at = %task.submit_at, adjust_seconds = task.adjust.num_seconds(), "task timing");

        self.db.save_task(&task).await?;

        Ok(Submitted {
            track_link: self.track_link(&task.id),
            task_id: task.id,
        })
    }

    /// Track-link serving the pixel for `task_id`.
    #[must_use]
    pub fn track_link(&self, task_id: &str) -> String {
        format!("{}/t/{task_id}", self.link_prefix.trim_end_matches('/'))
    }
}
