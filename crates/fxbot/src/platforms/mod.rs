//! Platform-specific transports

pub mod cli;
pub mod dispatch;
pub mod telegram;

pub use cli::{CliTransport, run_repl};
pub use dispatch::{ChatDispatcher, handle_message};
pub use telegram::{TelegramClient, TelegramConfig, Update, run_polling, serve_webhook, webhook_router};
