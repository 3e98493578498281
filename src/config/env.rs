// src/config/env.rs

//! Legacy single-command mode: the command comes from the CLI and
//! everything else from environment variables.
//!
//! | variable                 | meaning                            | default       |
//! |--------------------------|------------------------------------|---------------|
//! | `CRONTASK_EXPRESSION`    | cron expression                    | `*/1 * * * *` |
//! | `RUN_WHEN_START`         | run once before the first tick     | `false`       |
//! | `REDIRECT_CMD_STDOUT`    | rotating file for the command's stdout | inherit   |
//! | `REDIRECT_CMD_STDERR`    | rotating file for the command's stderr | inherit   |
//! | `TZ`                     | IANA timezone for the expression   | local time    |
//! | `ENABLE_USER_GROUP_SPEC` | run the command as `UID`/`GID`     | `false`       |

use crate::config::model::{ConfigFile, LogSection};
use crate::config::validate::validate_tasker_config;
use crate::errors::{CrontaskError, Result};
use crate::types::{Credential, DEFAULT_TASK_NAME, ProgramSpec, TaskerConfig};

pub const KEY_CRON_EXPRESSION: &str = "CRONTASK_EXPRESSION";
pub const KEY_RUN_WHEN_START: &str = "RUN_WHEN_START";
pub const KEY_REDIRECT_STDOUT: &str = "REDIRECT_CMD_STDOUT";
pub const KEY_REDIRECT_STDERR: &str = "REDIRECT_CMD_STDERR";
pub const KEY_TZ: &str = "TZ";
pub const KEY_ENABLE_USER_GROUP: &str = "ENABLE_USER_GROUP_SPEC";
pub const KEY_UID: &str = "UID";
pub const KEY_GID: &str = "GID";

pub const DEFAULT_ENV_EXPRESSION: &str = "*/1 * * * *";

/// Build a config for `command` (program followed by its arguments) from
/// the process environment.
pub fn config_from_env(command: &[String]) -> Result<ConfigFile> {
    config_from_lookup(command, |key| std::env::var(key).ok())
}

/// Same as [`config_from_env`], reading variables through `lookup`.
pub fn config_from_lookup<F>(command: &[String], lookup: F) -> Result<ConfigFile>
where
    F: Fn(&str) -> Option<String>,
{
    let Some((cmd, args)) = command.split_first() else {
        return Err(CrontaskError::ConfigError(
            "env mode needs a command to run".to_string(),
        ));
    };

    let get = |key: &str| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let program = ProgramSpec::new(DEFAULT_TASK_NAME, cmd.clone(), args.iter().cloned());
    let expression = get(KEY_CRON_EXPRESSION).unwrap_or_else(|| DEFAULT_ENV_EXPRESSION.to_string());

    let mut tasker = TaskerConfig::new(expression, vec![program]);
    tasker.timezone = get(KEY_TZ);
    tasker.run_at_startup = parse_flag(KEY_RUN_WHEN_START, get(KEY_RUN_WHEN_START))?;
    tasker.stdout_redirect = get(KEY_REDIRECT_STDOUT).map(Into::into);
    tasker.stderr_redirect = get(KEY_REDIRECT_STDERR).map(Into::into);

    if parse_flag(KEY_ENABLE_USER_GROUP, get(KEY_ENABLE_USER_GROUP))? {
        tasker.credential = Some(Credential {
            uid: parse_id(KEY_UID, get(KEY_UID))?,
            gid: parse_id(KEY_GID, get(KEY_GID))?,
        });
    }

    validate_tasker_config(&tasker)?;

    let log = LogSection {
        level: Some("debug".to_string()),
        ..LogSection::default()
    };
    Ok(ConfigFile::new_unchecked(tasker, log))
}

fn parse_flag(key: &str, value: Option<String>) -> Result<bool> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CrontaskError::ConfigError(format!(
            "{key}: expected a boolean, got '{other}'"
        ))),
    }
}

fn parse_id(key: &str, value: Option<String>) -> Result<u32> {
    let value = value.ok_or_else(|| {
        CrontaskError::ConfigError(format!("{key} is required when {KEY_ENABLE_USER_GROUP} is set"))
    })?;
    value
        .parse::<u32>()
        .map_err(|e| CrontaskError::ConfigError(format!("{key}: invalid id '{value}': {e}")))
}
