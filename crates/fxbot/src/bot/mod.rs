//! Exchange Rate Bot
//!
//! Routes inbound chat messages to rate lookups, alert registration and the
//! GST calculator conversation.
//!
//! # Example
//!
//! ```rust,ignore
//! use fxbot::bot::RateBot;
//! use fxbot::interface::Message;
//!
//! let bot = RateBot::new(provider, scheduler, CalculatorConfig::default());
//! if let Some(reply) = bot.handle(&Message::text(chat, user, "/getrate SGD-JPY")).await {
//!     transport.send(chat, reply).await?;
//! }
//! ```

pub mod commands;

use crate::alerts::AlertScheduler;
use crate::api::{RateProvider, latest_rate, validate_pair};
use crate::config::CalculatorConfig;
use crate::error::{BotError, Result};
use crate::gst::GstConversation;
use crate::interface::{BotResponse, Message};
use crate::models::CurrencyPair;
use std::sync::Arc;
use tracing::{debug, warn};

pub use commands::{Command, help_text};

/// Message handler shared by every platform
#[derive(Clone)]
pub struct RateBot {
    provider: Arc<dyn RateProvider>,
    scheduler: Arc<AlertScheduler>,
    gst: GstConversation,
}

impl RateBot {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        scheduler: Arc<AlertScheduler>,
        calculator: CalculatorConfig,
    ) -> Self {
        Self {
            provider,
            scheduler,
            gst: GstConversation::new(calculator),
        }
    }

    pub fn scheduler(&self) -> &Arc<AlertScheduler> {
        &self.scheduler
    }

    pub fn conversations(&self) -> &GstConversation {
        &self.gst
    }

    /// Reply to `message`, `None` when it should be ignored
    pub async fn handle(&self, message: &Message) -> Option<BotResponse> {
        if !message.is_command() {
            return self.gst.handle(message.user_id, &message.content).await;
        }

        match Command::parse(&message.content) {
            Ok(command) => Some(self.execute(message, command).await),
            Err(BotError::CommandNotRecognized(cmd)) => {
                debug!(chat_id = message.chat_id, cmd, "Ignoring unknown command");
                None
            }
            Err(e) => Some(BotResponse::error(e.user_message())),
        }
    }

    async fn execute(&self, message: &Message, command: Command) -> BotResponse {
        let chat_id = message.chat_id;
        let result = match command {
            Command::GetRate { pair } => self.get_rate(&pair).await,
            Command::AddRateAlert { pair, schedule } => self
                .scheduler
                .add_daily(chat_id, pair, schedule)
                .await
                .map(|sub| {
                    BotResponse::text(format!(
                        "Daily alert set for {} at {} every day.",
                        sub.pair,
                        schedule.at.format("%H:%M")
                    ))
                }),
            Command::ConditionalRateAlert { pair, target } => self
                .scheduler
                .add_conditional(chat_id, pair, target)
                .await
                .map(|sub| {
                    BotResponse::text(format!(
                        "Alert set. I will let you know when {} goes above {target:.4}.",
                        sub.pair
                    ))
                }),
            Command::StartGst => Ok(self.gst.start(message.user_id).await),
            Command::Cancel => Ok(self.gst.cancel(message.user_id).await),
            Command::Help => Ok(BotResponse::text(help_text())),
        };

        result.unwrap_or_else(|e| {
            if matches!(
                e,
                BotError::ApiError(_)
                    | BotError::NetworkError(_)
                    | BotError::JsonError(_)
                    | BotError::Other(_)
            ) {
                warn!(chat_id, error = %e, "Command failed");
            }
            BotResponse::error(e.user_message())
        })
    }

    async fn get_rate(&self, pair: &CurrencyPair) -> Result<BotResponse> {
        validate_pair(self.provider.as_ref(), pair).await?;
        let rate = latest_rate(self.provider.as_ref(), pair).await?;
        Ok(BotResponse::text(format!(
            "Exchange rate of {pair} is 1 {} - {rate:.4} {}",
            pair.from, pair.to
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockRateProvider, RateMap};
    use crate::config::AlertConfig;
    use crate::interface::{MockChatTransport, ResponseType};
    use crate::store::MemoryRateStore;
    use std::collections::HashSet;
    use std::time::Duration;

    fn bot_with(provider: MockRateProvider) -> RateBot {
        let provider: Arc<dyn RateProvider> = Arc::new(provider);
        let mut transport = MockChatTransport::new();
        transport.expect_send().returning(|_, _| Ok(()));
        let scheduler = AlertScheduler::new(
            Arc::clone(&provider),
            Arc::new(MemoryRateStore::new()),
            Arc::new(transport),
            AlertConfig {
                check_interval: Duration::from_secs(3600),
                ..Default::default()
            },
        );
        RateBot::new(provider, Arc::new(scheduler), CalculatorConfig::default())
    }

    fn rate_provider() -> MockRateProvider {
        let mut provider = MockRateProvider::new();
        provider.expect_supported_currencies().returning(|| {
            Ok(["SGD", "JPY", "USD"]
                .iter()
                .map(|c| (*c).to_string())
                .collect::<HashSet<_>>())
        });
        provider
            .expect_latest()
            .returning(|_, _| Ok(RateMap::from([("JPY".to_string(), 110.123_456)])));
        provider
    }

    fn msg(text: &str) -> Message {
        Message::text(100, 200, text)
    }

    #[tokio::test]
    async fn test_getrate() {
        let bot = bot_with(rate_provider());
        let reply = bot.handle(&msg("/getrate sgd-jpy")).await.unwrap();
        assert_eq!(reply.content, "Exchange rate of SGD-JPY is 1 SGD - 110.1235 JPY");
    }

    #[tokio::test]
    async fn test_getrate_unknown_currency() {
        let bot = bot_with(rate_provider());

        let reply = bot.handle(&msg("/getrate XXX-JPY")).await.unwrap();
        assert_eq!(reply.response_type, ResponseType::Error);
        assert_eq!(reply.content, "[FROM] Currency is not found, please try again.");

        let reply = bot.handle(&msg("/getrate SGD-XXX")).await.unwrap();
        assert_eq!(reply.content, "[TO] Currency is not found, please try again.");
    }

    #[tokio::test]
    async fn test_unknown_command_ignored() {
        let bot = bot_with(MockRateProvider::new());
        assert!(bot.handle(&msg("/convert 10 SGD")).await.is_none());
        assert!(bot.handle(&msg("hello there")).await.is_none());
    }

    #[tokio::test]
    async fn test_alert_registration_replies() {
        let bot = bot_with(rate_provider());

        let reply = bot
            .handle(&msg("/addratealert SGD-JPY/DAILY 09:30"))
            .await
            .unwrap();
        assert_eq!(reply.content, "Daily alert set for SGD-JPY at 09:30 every day.");

        let reply = bot
            .handle(&msg("/conditionalratealert SGD-JPY/120"))
            .await
            .unwrap();
        assert!(reply.content.contains("goes above 120.0000"));

        assert_eq!(bot.scheduler().subscriptions(100).await.len(), 2);
        bot.scheduler().shutdown().await;
    }

    #[tokio::test]
    async fn test_bad_schedule_reply() {
        let bot = bot_with(MockRateProvider::new());
        let reply = bot
            .handle(&msg("/addratealert SGD-JPY/WEEKLY 09:30"))
            .await
            .unwrap();
        assert_eq!(reply.content, "Frequency not found. Only DAILY is applicable for now");
    }

    #[tokio::test]
    async fn test_gst_flow_through_bot() {
        let bot = bot_with(MockRateProvider::new());

        let reply = bot.handle(&msg("/start_gst")).await.unwrap();
        assert_eq!(reply.actions.len(), 3);
        bot.handle(&msg("GST Only")).await.unwrap();
        bot.handle(&msg("Forwards")).await.unwrap();
        let result = bot.handle(&msg("100")).await.unwrap();
        assert!(result.content.contains("Result: 9.00"));

        // Conversation has ended, plain text is ignored again
        assert!(bot.handle(&msg("100")).await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_gst() {
        let bot = bot_with(MockRateProvider::new());
        bot.handle(&msg("/start_gst")).await.unwrap();
        let reply = bot.handle(&msg("/cancel@fx_rate_bot")).await.unwrap();
        assert_eq!(reply.content, "GST calculation cancelled.");
        assert!(!bot.conversations().is_active(200).await);
    }

    #[tokio::test]
    async fn test_help() {
        let bot = bot_with(MockRateProvider::new());
        let reply = bot.handle(&msg("/start")).await.unwrap();
        assert!(reply.content.contains("/getrate"));
    }
}
