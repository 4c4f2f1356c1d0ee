//! Webhook delivery: POSTs the message as a small JSON payload.

use std::time::Duration;

use super::Notifier;

pub struct WebhookNotifier {
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> Self {
        WebhookNotifier { url, timeout }
    }
}

impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn send(&self, subject: &str, body: &str) -> Result<(), Box<dyn std::error::Error>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;

        let payload = serde_json::json!({
            "subject": subject,
            "body": body,
        });

        client
            .post(&self.url)
            .json(&payload)
            .send()?
            .error_for_status()?;

        Ok(())
    }
}
