// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `crontask`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "crontask",
    version,
    about = "Run a chain of programs on a cron schedule, one run at a time.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML, or JSON if it ends in `.json`).
    ///
    /// Default: `Crontask.toml` in the current working directory. Ignored
    /// when a command is given. Earlier releases read `./config.json`; pass
    /// it explicitly to keep using it. Cron times follow the host's local
    /// timezone unless `tz` is set (earlier releases assumed
    /// `Asia/Shanghai`).
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CRONTASK_LOG`, then `[log].level`, then `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the chain and the next fire times, but don't
    /// execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Run the chain once (with hooks) and exit; no scheduling.
    #[arg(long)]
    pub once: bool,

    /// Legacy env mode: the single program to run, followed by its
    /// arguments. Schedule and options come from environment variables.
    #[arg(
        value_name = "CMD",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
