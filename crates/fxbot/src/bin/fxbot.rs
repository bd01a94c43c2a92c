//! Exchange Rate Bot
//!
//! # Usage
//!
//! ```bash
//! export FREECURRENCY_API_KEY="..."
//! export TELEGRAM_BOT_TOKEN="..."
//!
//! # Webhook mode, Telegram calls https://$DOMAIN/$TELEGRAM_BOT_TOKEN
//! DOMAIN="https://bot.example.com" cargo run --bin fxbot -- serve
//!
//! # Long polling, no public URL needed
//! cargo run --bin fxbot -- poll
//!
//! # Local console
//! cargo run --bin fxbot -- repl
//! ```

use clap::{Parser, Subcommand};
use fxbot::platforms::telegram::{self, TelegramClient, TelegramConfig};
use fxbot::platforms::{CliTransport, run_repl};
use fxbot::{
    AlertScheduler, BotConfig, FreeCurrencyClient, MemoryRateStore, PgRateStore, RateBot,
    RateProvider, RateStore,
};
use fxbot::interface::ChatTransport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "fxbot")]
#[command(about = "Exchange-rate alerts and GST calculator bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Serve Telegram updates through a webhook
    Serve,
    /// Fetch Telegram updates with long polling
    Poll,
    /// Chat with the bot on the console
    Repl,
}

async fn build_store(config: &BotConfig) -> anyhow::Result<Arc<dyn RateStore>> {
    match &config.database {
        Some(db) => Ok(Arc::new(PgRateStore::connect(db).await?)),
        None => {
            warn!("PGHOST not set, last rates are kept in memory only");
            Ok(Arc::new(MemoryRateStore::new()))
        }
    }
}

fn build_bot(
    config: &BotConfig,
    provider: Arc<dyn RateProvider>,
    store: Arc<dyn RateStore>,
    transport: Arc<dyn ChatTransport>,
) -> RateBot {
    let scheduler = AlertScheduler::new(
        Arc::clone(&provider),
        store,
        transport,
        config.alerts.clone(),
    );
    RateBot::new(provider, Arc::new(scheduler), config.calculator.clone())
}

/// Drop idle calculator sessions in the background
fn spawn_session_sweeper(bot: &RateBot) {
    let conversations = bot.conversations().clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(300));
        loop {
            ticker.tick().await;
            let removed = conversations.cleanup_expired().await;
            if removed > 0 {
                info!(removed, "Expired calculator sessions removed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fxbot_utils::init_tracing();
    let cli = Cli::parse();

    let config = BotConfig::from_env()?;
    let provider: Arc<dyn RateProvider> = Arc::new(FreeCurrencyClient::new(&config.provider)?);
    let store = build_store(&config).await?;

    let bot = match cli.command {
        Commands::Serve | Commands::Poll => {
            let telegram_config = TelegramConfig::from_env()?;
            let client = TelegramClient::new(&telegram_config)?;
            let bot = build_bot(&config, provider, store, Arc::new(client.clone()));
            spawn_session_sweeper(&bot);

            if matches!(cli.command, Commands::Serve) {
                telegram::serve_webhook(&telegram_config, bot.clone(), client, shutdown_signal())
                    .await?;
            } else {
                telegram::run_polling(bot.clone(), client, shutdown_signal()).await?;
            }
            bot
        }
        Commands::Repl => {
            let transport = Arc::new(CliTransport::new());
            let bot = build_bot(&config, provider, store, transport.clone());
            tokio::select! {
                result = run_repl(bot.clone(), &transport) => result?,
                () = shutdown_signal() => {}
            }
            bot
        }
    };

    let stopped = bot.scheduler().shutdown().await;
    info!(stopped, "Bye");
    Ok(())
}
