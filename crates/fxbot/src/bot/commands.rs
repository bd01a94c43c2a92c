//! Command parsing for the exchange-rate bot

use crate::alerts::DailySchedule;
use crate::error::{BotError, Result};
use crate::models::CurrencyPair;

/// Parsed command from user input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Latest rate of a pair
    GetRate { pair: CurrencyPair },
    /// Daily chart report
    AddRateAlert {
        pair: CurrencyPair,
        schedule: DailySchedule,
    },
    /// Notify when the rate reaches a target
    ConditionalRateAlert { pair: CurrencyPair, target: f64 },
    /// Begin the GST calculator
    StartGst,
    /// Stop the GST calculator
    Cancel,
    /// Show help
    Help,
}

impl Command {
    /// Parse a command from user input
    ///
    /// A `@botname` suffix on the command word is ignored.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let body = input
            .strip_prefix('/')
            .ok_or_else(|| BotError::CommandNotRecognized(input.to_string()))?;

        let (head, args) = match body.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (body, ""),
        };
        let cmd = head.split('@').next().unwrap_or(head).to_lowercase();

        match cmd.as_str() {
            "getrate" => Ok(Command::GetRate {
                pair: parse_pair(args, "/getrate SGD-JPY")?,
            }),
            "addratealert" => {
                let (pair, schedule) = split_pair_arg(args, "/addratealert SGD-JPY/DAILY 09:30")?;
                Ok(Command::AddRateAlert {
                    pair: parse_pair(pair, "/addratealert SGD-JPY/DAILY 09:30")?,
                    schedule: DailySchedule::parse(schedule)?,
                })
            }
            "conditionalratealert" => {
                let (pair, target) =
                    split_pair_arg(args, "/conditionalratealert SGD-JPY/110.5")?;
                Ok(Command::ConditionalRateAlert {
                    pair: parse_pair(pair, "/conditionalratealert SGD-JPY/110.5")?,
                    target: parse_target(target)?,
                })
            }
            "start_gst" => Ok(Command::StartGst),
            "cancel" => Ok(Command::Cancel),
            "start" | "help" => Ok(Command::Help),
            _ => Err(BotError::CommandNotRecognized(cmd)),
        }
    }
}

fn usage(example: &str) -> BotError {
    BotError::InvalidCommand(format!("Usage: {example}"))
}

fn parse_pair(text: &str, example: &str) -> Result<CurrencyPair> {
    if text.trim().is_empty() {
        return Err(usage(example));
    }
    CurrencyPair::parse(text)
}

/// Split `FROM-TO/REST` at the first slash
fn split_pair_arg<'a>(args: &'a str, example: &str) -> Result<(&'a str, &'a str)> {
    args.split_once('/')
        .map(|(pair, rest)| (pair, rest.trim()))
        .ok_or_else(|| usage(example))
}

fn parse_target(text: &str) -> Result<f64> {
    match text.trim().parse::<f64>() {
        Ok(target) if target.is_finite() && target > 0.0 => Ok(target),
        _ => Err(BotError::InvalidNumericInput(format!(
            "Target rate must be a positive number, got \"{}\"",
            text.trim()
        ))),
    }
}

/// Command list shown for /start and /help
pub fn help_text() -> String {
    "Exchange Rate Bot\n\
     /getrate FROM-TO - Latest rate, e.g. /getrate SGD-JPY\n\
     /addratealert FROM-TO/DAILY HH:MM - Daily chart report at a local time\n\
     /conditionalratealert FROM-TO/TARGET - Alert when the rate goes above TARGET\n\
     /start_gst - GST and service charge calculator\n\
     /cancel - Stop the calculator\n\
     /help - Show this help"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn test_parse_getrate() {
        let cmd = Command::parse("/getrate SGD-jpy ").unwrap();
        assert_eq!(
            cmd,
            Command::GetRate {
                pair: CurrencyPair::new("SGD", "JPY")
            }
        );

        let cmd = Command::parse("/getrate@fx_rate_bot usd-eur").unwrap();
        assert_eq!(
            cmd,
            Command::GetRate {
                pair: CurrencyPair::new("USD", "EUR")
            }
        );
    }

    #[test]
    fn test_parse_getrate_missing_arg() {
        match Command::parse("/getrate") {
            Err(BotError::InvalidCommand(msg)) => assert!(msg.contains("Usage")),
            other => panic!("Expected InvalidCommand, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_addratealert() {
        let cmd = Command::parse("/addratealert SGD-JPY/DAILY 09:30").unwrap();
        assert_eq!(
            cmd,
            Command::AddRateAlert {
                pair: CurrencyPair::new("SGD", "JPY"),
                schedule: DailySchedule {
                    at: NaiveTime::from_hms_opt(9, 30, 0).unwrap()
                },
            }
        );
    }

    #[test]
    fn test_parse_addratealert_bad_schedule() {
        assert!(matches!(
            Command::parse("/addratealert SGD-JPY/WEEKLY 09:30"),
            Err(BotError::ScheduleSpecInvalid(_))
        ));
        assert!(matches!(
            Command::parse("/addratealert SGD-JPY DAILY 09:30"),
            Err(BotError::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_parse_conditional() {
        let cmd = Command::parse("/conditionalratealert sgd-jpy/110.5").unwrap();
        assert_eq!(
            cmd,
            Command::ConditionalRateAlert {
                pair: CurrencyPair::new("SGD", "JPY"),
                target: 110.5
            }
        );

        assert!(matches!(
            Command::parse("/conditionalratealert SGD-JPY/high"),
            Err(BotError::InvalidNumericInput(_))
        ));
        assert!(matches!(
            Command::parse("/conditionalratealert SGD-JPY/-3"),
            Err(BotError::InvalidNumericInput(_))
        ));
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("/start_gst").unwrap(), Command::StartGst);
        assert_eq!(Command::parse("/cancel").unwrap(), Command::Cancel);
        assert_eq!(Command::parse("/help").unwrap(), Command::Help);
        assert_eq!(Command::parse("/start").unwrap(), Command::Help);
    }

    #[test]
    fn test_parse_unknown() {
        assert!(matches!(
            Command::parse("/analyze AAPL"),
            Err(BotError::CommandNotRecognized(_))
        ));
        assert!(matches!(
            Command::parse("hello"),
            Err(BotError::CommandNotRecognized(_))
        ));
    }

    #[test]
    fn test_help_lists_commands() {
        let help = help_text();
        for cmd in ["/getrate", "/addratealert", "/conditionalratealert", "/start_gst", "/cancel"] {
            assert!(help.contains(cmd));
        }
    }
}
