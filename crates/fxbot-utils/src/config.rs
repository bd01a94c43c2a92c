//! Environment-variable helpers for configuration loading

use std::str::FromStr;
use thiserror::Error;

/// Errors raised while reading configuration from the environment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// Required variable is not set (or is empty)
    #[error("{0} not set")]
    Missing(String),

    /// Variable is set but could not be parsed
    #[error("{name}: invalid value {value:?}")]
    Invalid {
        name: String,
        value: String,
    },
}

/// Read a variable, falling back to `default` when unset or empty
pub fn env_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

/// Read a required variable
pub fn env_required(name: &str) -> Result<String, EnvError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(EnvError::Missing(name.to_string())),
    }
}

/// Read and parse a variable, falling back to `default` when unset or empty
pub fn env_parse_or<T: FromStr>(name: &str, default: T) -> Result<T, EnvError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            value.trim().parse().map_err(|_| EnvError::Invalid {
                name: name.to_string(),
                value,
            })
        }
        _ => Ok(default),
    }
}
