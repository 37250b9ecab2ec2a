//! Chat webhook notifier (Discord-compatible embeds)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::io::HttpClient;
use crate::notifier::{AlertMessage, Notifier};

/// Upper bound on a single webhook delivery
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct WebhookPayload {
    embeds: Vec<WebhookEmbed>,
}

#[derive(Debug, Serialize)]
struct WebhookEmbed {
    title: String,
    description: String,
    color: u32,
    timestamp: String,
}

/// Webhook notification sender
pub struct WebhookNotifier {
    url: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The URL embeds the webhook token, keep it out of logs.
        f.debug_struct("WebhookNotifier").finish_non_exhaustive()
    }
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            url: url.into(),
            http,
        }
    }

    fn payload(alert: &AlertMessage) -> WebhookPayload {
        WebhookPayload {
            embeds: vec![WebhookEmbed {
                title: alert.display_title(),
                description: alert.body.clone(),
                color: alert.level.color(),
                timestamp: alert.timestamp.to_rfc3339(),
            }],
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn type_name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, alert: &AlertMessage) -> crate::Result<()> {
        let body = serde_json::to_value(Self::payload(alert))?;

        tracing::debug!(
            "Sending webhook alert: title='{}', level={}",
            alert.title,
            alert.level
        );

        let response = self
            .http
            .post_json(&self.url, &body, WEBHOOK_TIMEOUT)
            .await?;

        if !response.is_success() {
            return Err(crate::HostwatchError::Notifier(format!(
                "Webhook returned status {}: {}",
                response.status, response.body
            )));
        }

        tracing::debug!("Webhook alert sent successfully");
        Ok(())
    }
}
