//! `SendGrid` v3 mail-send client.

use std::future::Future;
use std::pin::Pin;

use serde_json::json;
use tracing::debug;

use super::{Delivery, NotificationContent, Notifier};
use crate::config::NotifierConfig;
use crate::{AppError, Result};

/// Notifier posting plain-text mail through the `SendGrid` API.
///
/// No timeout is applied: a slow provider only holds up the detached
/// dispatch task that called it.
pub struct SendGridNotifier {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from_address: String,
    from_name: String,
}

impl SendGridNotifier {
    /// Build a client from notifier settings with the API key loaded.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the API key is missing or the HTTP
    /// client cannot be built.
    pub fn new(config: &NotifierConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(AppError::Config("sendgrid api key is not loaded".into()));
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from_address: config.from_address.clone(),
            from_name: config.from_name.clone(),
        })
    }

    fn payload(&self, destination: &str, content: &NotificationContent) -> serde_json::Value {
        json!({
            "personalizations": [{ "to": [{ "email": destination }] }],
            "from": { "email": self.from_address, "name": self.from_name },
            "subject": content.subject,
            "content": [{ "type": "text/plain", "value": content.body }],
        })
    }
}

impl Notifier for SendGridNotifier {
    fn send<'a>(
        &'a self,
        destination: &'a str,
        content: &'a NotificationContent,
    ) -> Pin<Box<dyn Future<Output = Result<Delivery>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(&self.payload(destination, content))
                .send()
                .await
                .map_err(|err| AppError::Dispatch(format!("sendgrid request failed: {err}")))?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|err| AppError::Dispatch(format!("sendgrid response unreadable: {err}")))?;
            debug!(status, "sendgrid replied");

            Ok(Delivery { status, body })
        })
    }
}
