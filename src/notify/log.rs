//! Notifier that writes messages to the log instead of sending them.

use std::future::Future;
use std::pin::Pin;

use tracing::info;

use super::{Delivery, NotificationContent, Notifier, ACCEPTED};
use crate::Result;

/// Local-only notifier; every message is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send<'a>(
        &'a self,
        destination: &'a str,
        content: &'a NotificationContent,
    ) -> Pin<Box<dyn Future<Output = Result<Delivery>> + Send + 'a>> {
        Box::pin(async move {
            info!(
                to = destination,
                subject = %content.subject,
                body = %content.body,
                "notification (log provider)"
            );
            Ok(Delivery {
                status: ACCEPTED,
                body: String::new(),
            })
        })
    }
}
