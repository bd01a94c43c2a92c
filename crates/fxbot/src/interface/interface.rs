//! Chat transport trait and core response types
//!
//! Defines the platform-agnostic surface the bot and the alert scheduler use
//! to talk to users.

use crate::error::Result;
use crate::models::ChatId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Platform identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BotPlatform {
    /// Interactive console
    Cli,

    /// Telegram bot
    Telegram,
}

/// Bot response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotResponse {
    /// Message text, used as the caption when an image is attached
    pub content: String,

    /// Response type
    pub response_type: ResponseType,

    /// Attachments (charts)
    pub attachments: Vec<Attachment>,

    /// Keyboard options offered to the user
    pub actions: Vec<SuggestedAction>,
}

/// Type of bot response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    /// Plain text
    Text,

    /// Error message
    Error,
}

/// Attachment in a bot response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment type
    pub attachment_type: AttachmentType,

    /// Raw bytes
    pub content: Vec<u8>,

    /// File name
    pub filename: Option<String>,

    /// MIME type
    pub mime_type: String,
}

/// Type of attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentType {
    /// Image file
    Image,

    /// Chart/graph
    Chart,
}

impl Attachment {
    /// PNG chart attachment
    pub fn chart_png(content: Vec<u8>) -> Self {
        Self {
            attachment_type: AttachmentType::Chart,
            content,
            filename: Some("chart.png".to_string()),
            mime_type: "image/png".to_string(),
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(
            self.attachment_type,
            AttachmentType::Image | AttachmentType::Chart
        )
    }
}

/// Option offered to the user as a one-tap reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedAction {
    /// Button label
    pub label: String,

    /// Text sent back when the option is chosen
    pub action: String,
}

impl BotResponse {
    /// Create a simple text response
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            response_type: ResponseType::Text,
            attachments: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Create an error response
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Error,
            ..Self::text(content)
        }
    }

    /// Add an attachment
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Add a keyboard option whose reply text equals its label
    pub fn with_option(self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.with_action(label.clone(), label)
    }

    /// Add a keyboard option
    pub fn with_action(mut self, label: impl Into<String>, action: impl Into<String>) -> Self {
        self.actions.push(SuggestedAction {
            label: label.into(),
            action: action.into(),
        });
        self
    }

    /// First image attachment, if any
    pub fn image(&self) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.is_image())
    }
}

/// Outbound side of a chat platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Platform this transport delivers to
    fn platform(&self) -> BotPlatform;

    /// Deliver `response` to `chat_id`
    async fn send(&self, chat_id: ChatId, response: BotResponse) -> Result<()>;
}

impl std::fmt::Display for BotPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotPlatform::Cli => write!(f, "CLI"),
            BotPlatform::Telegram => write!(f, "Telegram"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bot_response_creation() {
        let response = BotResponse::text("Hello, world!");
        assert_eq!(response.response_type, ResponseType::Text);
        assert_eq!(response.content, "Hello, world!");
        assert!(response.image().is_none());
        assert_eq!(BotResponse::error("x").response_type, ResponseType::Error);
    }

    #[test]
    fn test_bot_response_builder() {
        let response = BotResponse::text("Choose a receipt type")
            .with_option("GST Only")
            .with_action("Both", "GST and Service Charge");

        assert_eq!(response.actions.len(), 2);
        assert_eq!(response.actions[0].label, "GST Only");
        assert_eq!(response.actions[0].action, "GST Only");
        assert_eq!(response.actions[1].action, "GST and Service Charge");
    }

    #[test]
    fn test_chart_attachment() {
        let response = BotResponse::text("caption").with_attachment(Attachment::chart_png(vec![1, 2]));
        let image = response.image().unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.content, vec![1, 2]);
    }
}
