//! Core data types shared across the bot

use crate::error::{BotError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chat identifier used by the transport
pub type ChatId = i64;

/// User identifier used to key conversation sessions
pub type UserId = i64;

/// A `FROM-TO` currency pair with normalized codes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub from: String,
    pub to: String,
}

impl CurrencyPair {
    /// Create a pair, trimming and upper-casing both codes
    pub fn new(from: impl AsRef<str>, to: impl AsRef<str>) -> Self {
        Self {
            from: normalize_code(from.as_ref()),
            to: normalize_code(to.as_ref()),
        }
    }

    /// Parse `"FROM-TO"`
    pub fn parse(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split('-').collect();
        let [from, to] = parts.as_slice() else {
            return Err(BotError::InvalidCommand(format!(
                "Expected a currency pair like SGD-JPY, got \"{}\"",
                text.trim()
            )));
        };

        let pair = Self::new(from, to);
        if pair.from.is_empty() || pair.to.is_empty() {
            return Err(BotError::InvalidCommand(
                "Both currencies of the pair are required, e.g. SGD-JPY".to_string(),
            ));
        }
        Ok(pair)
    }
}

impl FromStr for CurrencyPair {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let pair = CurrencyPair::parse("SGD-jpy ").unwrap();
        assert_eq!(pair, CurrencyPair::new("SGD", "JPY"));
        assert_eq!(pair.from, "SGD");
        assert_eq!(pair.to, "JPY");

        let pair: CurrencyPair = " usd - eur".parse().unwrap();
        assert_eq!(pair.to_string(), "USD-EUR");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(CurrencyPair::parse("SGDJPY").is_err());
        assert!(CurrencyPair::parse("SGD-").is_err());
        assert!(CurrencyPair::parse(" -JPY").is_err());
    }

    #[test]
    fn test_parse_rejects_extra_separators() {
        for text in ["SGD-JPY-EUR", "SGD--JPY", "SGD-JPY-"] {
            match CurrencyPair::parse(text) {
                Err(BotError::InvalidCommand(msg)) => {
                    assert!(msg.starts_with("Expected a currency pair like SGD-JPY"), "{text}");
                }
                other => panic!("Expected usage error for {text}, got {other:?}"),
            }
        }
    }
}
