//! Chat webhook notifier.
//!
//! Payloads follow the incoming-webhook attachment shape accepted by both
//! Slack and Mattermost: a `username`, an `icon_emoji` and a list of
//! attachments carrying a title, a color and short key/value fields.

use async_trait::async_trait;
use log::{debug, error};
use serde::Serialize;

use crate::error::Error;

/// One key/value cell inside an attachment.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Field {
    pub title: String,
    pub value: String,
    pub short: bool,
}

impl Field {
    pub fn short(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            short: true,
        }
    }
}

/// A rendered message fragment.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fields: Vec<Field>,
}

/// The webhook payload. Built per event or per status check, never persisted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Message {
    pub username: String,
    pub icon_emoji: String,
    pub attachments: Vec<Attachment>,
}

/// Delivery seam. The production impl posts to the configured webhook; tests
/// substitute a recording fake.
#[async_trait]
pub trait Notify: Send + Sync {
    /// Deliver one message. No retry; a non-success response is an error.
    async fn send(&self, message: &Message) -> Result<(), Error>;

    /// Status-colored convenience message.
    async fn send_status(&self, text: &str, fields: Vec<Field>) -> Result<(), Error> {
        self.send(&Message {
            username: self.username().to_string(),
            icon_emoji: self.icon_emoji().to_string(),
            attachments: vec![Attachment {
                text: Some(text.to_string()),
                color: Some("good".into()),
                fields,
                ..Default::default()
            }],
        })
        .await
    }

    /// Best-effort error report. Never fails: a notifier that cannot deliver
    /// its own failure report would otherwise loop forever.
    async fn send_error(&self, description: &str) {
        let message = Message {
            username: self.username().to_string(),
            icon_emoji: self.icon_emoji().to_string(),
            attachments: vec![Attachment {
                title: Some("Error".into()),
                text: Some(description.to_string()),
                color: Some("danger".into()),
                ..Default::default()
            }],
        };
        if let Err(e) = self.send(&message).await {
            error!("Failed to deliver error report: {}", e);
        }
    }

    fn username(&self) -> &str;
    fn icon_emoji(&self) -> &str;
}

/// Posts JSON payloads to a single incoming-webhook URL.
pub struct WebhookNotifier {
    http: reqwest::Client,
    webhook_url: String,
    username: String,
    icon_emoji: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: String, username: String, icon_emoji: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url,
            username,
            icon_emoji,
        }
    }
}

#[async_trait]
impl Notify for WebhookNotifier {
    async fn send(&self, message: &Message) -> Result<(), Error> {
        debug!("Posting webhook message from '{}'", message.username);
        self.http
            .post(&self.webhook_url)
            .json(message)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| Error::Delivery(e.to_string()))?;
        Ok(())
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn icon_emoji(&self) -> &str {
        &self.icon_emoji
    }
}
