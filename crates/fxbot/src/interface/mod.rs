//! Bot platform interfaces
//!
//! Platform-agnostic message, response and session types

pub mod formatter;
pub mod interface;
pub mod message;
pub mod session;

pub use formatter::{Formatter, FormatterFactory};
pub use interface::{
    Attachment, AttachmentType, BotPlatform, BotResponse, ChatTransport, ResponseType,
    SuggestedAction,
};
pub use message::Message;
pub use session::{SessionManager, UserSession};

#[cfg(test)]
pub use interface::MockChatTransport;
