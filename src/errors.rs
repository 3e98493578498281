// src/errors.rs

//! Crate-wide error type for everything that can stop the daemon from
//! starting: configuration, tasker construction and scheduler registration.
//!
//! Errors raised while a run is in flight never escape as this type; they
//! are resolved into a pass/fail outcome by the engine (see
//! [`crate::exec::RunError`] and [`crate::engine::ChainError`]).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrontaskError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("program list is empty")]
    NoPrograms,

    #[error("cron expression is empty")]
    EmptyCronExpression,

    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidCronExpression { expression: String, reason: String },

    #[error("invalid timezone '{tz}': {reason}")]
    InvalidTimezone { tz: String, reason: String },

    #[error("cron expression '{0}' has no upcoming fire time")]
    NoUpcomingFire(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CrontaskError>;
