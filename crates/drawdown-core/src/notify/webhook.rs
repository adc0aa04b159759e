//! Webhook notifier -- hands outbound messages to an HTTP relay.
//!
//! The relay receives `{"to": <destination>, "message": <text>}` and is
//! responsible for the actual delivery (e.g. mailing an SMS gateway).

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::json;
use tracing::{debug, warn};

use super::Notifier;
use crate::alert::AlertZone;
use crate::error::NotifyError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WebhookNotifier {
    webhook_url: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("falling back to default HTTP client: {e}");
                Client::new()
            });
        Self {
            webhook_url: webhook_url.into(),
            client,
        }
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }
}

impl Notifier for WebhookNotifier {
    /// Webhooks carry no audio.
    fn play_cue(&self, _zone: AlertZone) {}

    fn notify(&self, message: &str, destination: &str) -> Result<(), NotifyError> {
        if self.webhook_url.is_empty() {
            return Err(NotifyError::NotConfigured("webhook URL is empty".into()));
        }

        let body = json!({ "to": destination, "message": message });
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .map_err(|source| NotifyError::Transport {
                destination: destination.to_string(),
                source,
            })?;

        let status = resp.status();
        if status.is_success() {
            debug!(destination, status = status.as_u16(), "notification delivered");
            Ok(())
        } else {
            let text = resp.text().unwrap_or_default();
            Err(NotifyError::Rejected {
                destination: destination.to_string(),
                status: status.as_u16(),
                body: text,
            })
        }
    }
}
