//! Inbound message type shared by every platform

use crate::models::{ChatId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn text(chat_id: ChatId, user_id: UserId, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id,
            user_id,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn is_command(&self) -> bool {
        self.content.trim_start().starts_with('/')
    }

    /// Command name without the slash or any `@botname` suffix, plus the rest of the text
    pub fn parse_command(&self) -> Option<(String, String)> {
        let content = self.content.trim().strip_prefix('/')?;

        let (head, rest) = match content.find(char::is_whitespace) {
            Some(pos) => (&content[..pos], content[pos..].trim()),
            None => (content, ""),
        };
        let name = head.split('@').next().unwrap_or(head);
        if name.is_empty() {
            return None;
        }

        Some((name.to_lowercase(), rest.to_string()))
    }
}
