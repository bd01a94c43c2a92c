//! Console transport and REPL

use crate::bot::RateBot;
use crate::error::{BotError, Result};
use crate::interface::{BotPlatform, BotResponse, ChatTransport, Formatter, FormatterFactory, Message};
use crate::models::{ChatId, UserId};
use async_trait::async_trait;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Chat and user id used for the local console session
pub const CONSOLE_CHAT_ID: ChatId = 0;
pub const CONSOLE_USER_ID: UserId = 0;

/// Prints responses to stdout, alerts included
pub struct CliTransport {
    formatter: Box<dyn Formatter>,
}

impl Default for CliTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl CliTransport {
    pub fn new() -> Self {
        Self {
            formatter: FormatterFactory::create(BotPlatform::Cli),
        }
    }

    pub fn render(&self, response: &BotResponse) -> String {
        self.formatter.format_response(response)
    }
}

#[async_trait]
impl ChatTransport for CliTransport {
    fn platform(&self) -> BotPlatform {
        BotPlatform::Cli
    }

    async fn send(&self, chat_id: ChatId, response: BotResponse) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "\n[chat {chat_id}] {}\n", self.render(&response))
            .map_err(|e| BotError::TransportError(e.to_string()))?;
        Ok(())
    }
}

/// Whether a console line ends the session
fn is_exit(line: &str) -> bool {
    matches!(line, "/exit" | "/quit" | "exit" | "quit")
}

/// Read lines from stdin and answer them until EOF or `/exit`
pub async fn run_repl(bot: RateBot, transport: &CliTransport) -> Result<()> {
    println!("Exchange Rate Bot console. Type /help for commands, /exit to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!(">>> ");
        std::io::stdout()
            .flush()
            .map_err(|e| BotError::TransportError(e.to_string()))?;

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| BotError::TransportError(e.to_string()))?
        else {
            println!("\nGoodbye!");
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit(input) {
            println!("Goodbye!");
            break;
        }

        let message = Message::text(CONSOLE_CHAT_ID, CONSOLE_USER_ID, input);
        match bot.handle(&message).await {
            Some(reply) => println!("{}\n", transport.render(&reply)),
            None => println!("(no reply)\n"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words() {
        assert!(is_exit("/exit"));
        assert!(is_exit("quit"));
        assert!(!is_exit("/getrate SGD-JPY"));
    }

    #[tokio::test]
    async fn test_cli_transport_renders_options() {
        let transport = CliTransport::new();
        assert_eq!(transport.platform(), BotPlatform::Cli);

        let text = transport.render(&BotResponse::text("Pick").with_option("Forwards"));
        assert_eq!(text, "Pick\n[Forwards]");
        assert!(transport.send(1, BotResponse::text("hi")).await.is_ok());
    }
}
