//! Configuration for the interview turn engine
//!
//! Settings are layered from defaults, an optional file, and `INTERVIEW__*`
//! environment variables. Constants live in [`constants`] so crates can use
//! them without loading anything.

pub mod constants;
mod settings;

pub use settings::{
    EndpointSettings, InterviewConfig, LoggingSettings, ProtocolSettings, SessionSettings,
    TimeoutSettings,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
