//! Email transports.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

const RESEND_URL: &str = "https://api.resend.com/emails";

/// One outbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
    /// Optional `Reply-To`.
    pub reply_to: Option<String>,
}

/// Email delivery failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// The HTTP exchange failed.
    #[error("email request failed: {0}")]
    Request(String),

    /// The provider refused the message.
    #[error("email rejected: {0}")]
    Rejected(String),
}

/// Sends a single email.
#[async_trait]
pub trait NotificationSender: Send + Sync + std::fmt::Debug {
    /// Delivers `message`.
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// Sender used when no email provider is configured: logs the message and
/// reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            bytes = message.html.len(),
            "email provider not configured; message logged only"
        );
        tracing::debug!(html = %message.html, "email body");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

/// Resend HTTP API sender.
#[derive(Clone)]
pub struct ResendSender {
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for ResendSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendSender")
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl ResendSender {
    /// Creates a sender that sends as `from`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Request`] if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Request(e.to_string()))?;
        Ok(Self {
            api_key: api_key.into(),
            from: from.into(),
            client,
        })
    }
}

#[async_trait]
impl NotificationSender for ResendSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let payload = ResendPayload {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
            reply_to: message.reply_to.as_deref(),
        };

        let response = self
            .client
            .post(RESEND_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected(format!(
            "HTTP {status}: {}",
            body.chars().take(200).collect::<String>()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_sender_always_succeeds() {
        let message = EmailMessage {
            to: "ada@example.com".to_string(),
            subject: "hello".to_string(),
            html: "<p>hi</p>".to_string(),
            reply_to: None,
        };
        assert_eq!(LogSender.send(&message).await, Ok(()));
    }

    #[test]
    fn payload_omits_empty_reply_to() {
        let payload = ResendPayload {
            from: "Studio <bookings@resend.dev>",
            to: ["ada@example.com"],
            subject: "s",
            html: "h",
            reply_to: None,
        };
        let json = serde_json::to_value(&payload).unwrap_or_default();
        assert_eq!(json["to"], serde_json::json!(["ada@example.com"]));
        assert!(json.get("reply_to").is_none());
    }
}
