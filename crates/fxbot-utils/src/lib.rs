//! Shared utilities for fxbot
//!
//! This crate provides the logging setup and the environment-variable helpers
//! used by the bot's configuration layer.

pub mod config;
pub mod logging;

pub use config::{EnvError, env_or, env_parse_or, env_required};
pub use logging::init_tracing;
