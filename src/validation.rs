//! Acceptability checks for submitted tasks.

use chrono::TimeDelta;
use regex::Regex;

use crate::config::ValidationConfig;
use crate::models::task::Task;
use crate::{AppError, Result};

const ADDRESS_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Task validator built once at startup from [`ValidationConfig`].
#[derive(Debug, Clone)]
pub struct TaskValidator {
    policy: ValidationConfig,
    address: Regex,
}

impl TaskValidator {
    /// Compile the validator for `policy`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the address pattern fails to compile.
    pub fn new(policy: ValidationConfig) -> Result<Self> {
        let address = Regex::new(ADDRESS_PATTERN)
            .map_err(|err| AppError::Config(format!("invalid address pattern: {err}")))?;
        Ok(Self { policy, address })
    }

    /// Whether `task` may be persisted.
    #[must_use]
    pub fn is_valid(&self, task: &Task) -> bool {
        self.validate(task).is_ok()
    }

    /// Check `task` against the address, comment and adjust bounds.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` naming the first failed check.
    pub fn validate(&self, task: &Task) -> Result<()> {
        let address = task.notify_to.trim();
        if address.is_empty() {
            return Err(AppError::Validation("notify_to is required".into()));
        }
        if address.len() > self.policy.max_address_len {
            return Err(AppError::Validation(format!(
                "notify_to exceeds {} bytes",
                self.policy.max_address_len
            )));
        }
        if !self.address.is_match(address) {
            return Err(AppError::Validation(format!(
                "notify_to is not an email address: {address}"
            )));
        }

        if task.comments.chars().count() > self.policy.max_comments_chars {
            return Err(AppError::Validation(format!(
                "comments exceed {} characters",
                self.policy.max_comments_chars
            )));
        }
        if task
            .comments
            .chars()
            .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
        {
            return Err(AppError::Validation(
                "comments contain control characters".into(),
            ));
        }

        let max_adjust = TimeDelta::try_days(self.policy.max_adjust_days).unwrap_or(TimeDelta::MAX);
        if task.adjust.abs() > max_adjust {
            return Err(AppError::Validation(format!(
                "local_time is more than {} days from now",
                self.policy.max_adjust_days
            )));
        }

        Ok(())
    }
}
