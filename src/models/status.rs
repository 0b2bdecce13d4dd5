//! Aggregate counters backing the status badges.

use serde::{Deserialize, Serialize};

/// Task and notification counts over one window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Counters {
    /// Tasks submitted.
    pub task_submit: u64,
    /// Notifications recorded.
    pub notification: u64,
}

/// Counters for the current local day and for all time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Status {
    /// Since local midnight.
    pub daily: Counters,
    /// Since the store was created.
    pub total: Counters,
}
