// src/config/mod.rs

//! Configuration loading and validation for crontask.
//!
//! Responsibilities:
//! - Define the file-backed data model (`model.rs`).
//! - Load a config file from disk, TOML or JSON (`loader.rs`).
//! - Build a config from environment variables for the legacy
//!   single-command mode (`env.rs`).
//! - Validate invariants and produce a [`TaskerConfig`] (`validate.rs`).

pub mod env;
pub mod loader;
pub mod model;
pub mod validate;

pub use env::{config_from_env, config_from_lookup};
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, LogSection, NotifySection, ProgramConfig, RawConfigFile, UserSection};
pub use validate::validate_tasker_config;

pub use crate::types::TaskerConfig;
