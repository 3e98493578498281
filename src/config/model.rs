// src/config/model.rs

use serde::Deserialize;

use crate::exec::RotationPolicy;
use crate::types::TaskerConfig;

/// Top-level configuration as read from a file.
///
/// ```toml
/// task_name = "nightly-backup"
/// tz = "Asia/Shanghai"
/// crontask_expression = "30 2 * * *"
/// run_when_start = false
/// redirect_stdout = "/var/log/backup/stdout.log"
///
/// [[programs]]
/// remark = "dump"
/// cmd = "/usr/local/bin/dump-db"
/// args = ["--all"]
///
/// [notify.fail]
/// cmd = "/usr/local/bin/alert"
/// args = ["$TASK run $RUNID failed after $RUNTIME: $ERRMSG"]
///
/// [log]
/// level = "info"
/// ```
///
/// The same keys are accepted in JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub task_name: String,

    /// IANA timezone for the cron expression; host local time if unset.
    #[serde(default)]
    pub tz: Option<String>,

    #[serde(default)]
    pub crontask_expression: String,

    /// The chain, run in order.
    #[serde(default)]
    pub programs: Vec<ProgramConfig>,

    #[serde(default)]
    pub run_when_start: bool,

    #[serde(default)]
    pub redirect_stdout: Option<String>,

    #[serde(default)]
    pub redirect_stderr: Option<String>,

    #[serde(default)]
    pub notify: NotifySection,

    /// Run every program as this user/group.
    #[serde(default)]
    pub user: Option<UserSection>,

    #[serde(default)]
    pub log: LogSection,
}

/// One `[[programs]]` entry or a notify hook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgramConfig {
    #[serde(default)]
    pub remark: String,

    #[serde(default)]
    pub work_dir: String,

    pub cmd: String,

    #[serde(default)]
    pub args: Vec<String>,
}

impl ProgramConfig {
    /// The remark, or `fallback` when none was given.
    pub fn effective_remark(&self, fallback: &str) -> String {
        if self.remark.trim().is_empty() {
            fallback.to_string()
        } else {
            self.remark.clone()
        }
    }
}

/// `[notify]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifySection {
    #[serde(default)]
    pub succ: Option<ProgramConfig>,

    #[serde(default)]
    pub fail: Option<ProgramConfig>,

    #[serde(default)]
    pub finish: Option<ProgramConfig>,
}

/// `[user]` section.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UserSection {
    pub uid: u32,
    pub gid: u32,
}

/// `[log]` section: the daemon's own logging.
#[derive(Debug, Clone, Deserialize)]
pub struct LogSection {
    /// error, warn, info, debug or trace.
    #[serde(default)]
    pub level: Option<String>,

    /// Also write logs to this rotating file.
    #[serde(default)]
    pub file: Option<String>,

    /// Write logs to stderr.
    #[serde(default = "default_console")]
    pub console: bool,

    #[serde(default = "default_file_size_mb")]
    pub file_size_mb: u64,

    #[serde(default = "default_file_count")]
    pub file_count: usize,

    #[serde(default = "default_keep_days")]
    pub keep_days: u32,
}

fn default_console() -> bool {
    true
}

fn default_file_size_mb() -> u64 {
    10
}

fn default_file_count() -> usize {
    5
}

fn default_keep_days() -> u32 {
    7
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: None,
            file: None,
            console: default_console(),
            file_size_mb: default_file_size_mb(),
            file_count: default_file_count(),
            keep_days: default_keep_days(),
        }
    }
}

impl LogSection {
    pub fn rotation_policy(&self) -> RotationPolicy {
        RotationPolicy {
            max_size_bytes: self.file_size_mb.saturating_mul(1024 * 1024),
            max_backups: self.file_count,
            max_age_days: self.keep_days,
        }
    }
}

/// Validated configuration, split into what the tasker consumes and what
/// the daemon's logging setup consumes.
///
/// Produced by validation (`TryFrom<RawConfigFile>`) or the env-mode
/// builder.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub tasker: TaskerConfig,
    pub log: LogSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(tasker: TaskerConfig, log: LogSection) -> Self {
        Self { tasker, log }
    }
}
