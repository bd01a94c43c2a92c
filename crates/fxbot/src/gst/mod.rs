//! GST and service-charge calculator
//!
//! A multi-turn conversation collects the receipt type, the calculation
//! direction, the cost and (when needed) a service-charge rate, then hands
//! them to the pure [`Calculator`].

pub mod calculator;
pub mod conversation;

pub use calculator::{Calculator, Direction, ReceiptType};
pub use conversation::{ConversationState, GstConversation, GstSession};
