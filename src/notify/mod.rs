//! Outbound notification delivery.
//!
//! The [`Notifier`] trait decouples the open dispatcher from the mail
//! provider. [`sendgrid::SendGridNotifier`] talks to the `SendGrid` v3 API;
//! [`log::LogNotifier`] only writes the message to the log.

pub mod log;
pub mod sendgrid;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::clock::LocalZone;
use crate::config::{NotifierConfig, NotifierProvider};
use crate::models::notification::Notification;
use crate::Result;

/// Status code a provider returns once it has accepted a message.
pub const ACCEPTED: u16 = 202;

/// The provider's reply to a send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// HTTP status code.
    pub status: u16,
    /// Response body, kept for diagnostics.
    pub body: String,
}

impl Delivery {
    /// Whether the provider accepted the message for delivery.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.status == ACCEPTED
    }
}

/// Subject and plain-text body of an open notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    /// Mail subject line.
    pub subject: String,
    /// Plain-text mail body.
    pub body: String,
}

impl NotificationContent {
    /// Render the message telling a sender their email was opened.
    ///
    /// The event time is shown in the deployment's local zone.
    #[must_use]
    pub fn new(notification: &Notification, comments: &str, zone: LocalZone) -> Self {
        let subject = if comments.trim().is_empty() {
            "Your email was opened".to_owned()
        } else {
            format!("Your email \"{}\" was opened", comments.trim())
        };

        let opened_at = zone
            .at(notification.event.time)
            .format("%Y-%m-%d %H:%M:%S %:z");
        let body = format!(
            "Your tracked email was opened.\n\n\
             Comments: {comments}\n\
             Opened at: {opened_at}\n\
             IP address: {ip}\n\
             User agent: {ua}\n\
             Task: {task_id}\n",
            ip = notification.event.ip,
            ua = notification.event.user_agent,
            task_id = notification.task_id,
        );

        Self { subject, body }
    }
}

/// Delivery capability used to inform senders about opens.
pub trait Notifier: Send + Sync {
    /// Send `content` to `destination`.
    ///
    /// A returned [`Delivery`] may still carry a non-accepted status.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Dispatch` if the request cannot be delivered
    /// to the provider at all.
    fn send<'a>(
        &'a self,
        destination: &'a str,
        content: &'a NotificationContent,
    ) -> Pin<Box<dyn Future<Output = Result<Delivery>> + Send + 'a>>;
}

/// Build the notifier selected by `config`.
///
/// # Errors
///
/// Returns `AppError::Config` if the provider's HTTP client cannot be built.
pub fn from_config(config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
    match config.provider {
        NotifierProvider::Log => Ok(Arc::new(log::LogNotifier)),
        NotifierProvider::Sendgrid => Ok(Arc::new(sendgrid::SendGridNotifier::new(config)?)),
    }
}
