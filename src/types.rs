// src/types.rs

//! Plain data shared by the config layer and the engine.

use std::path::PathBuf;

/// Identifier of one admitted run. The first run of a tasker is `1`.
pub type RunId = u64;

/// Task name used in logs and hook arguments when none is configured.
pub const DEFAULT_TASK_NAME: &str = "default";

/// One external command of the chain (or a notification hook).
///
/// `remark` is a human label for logs and templating; it is not required to
/// be unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSpec {
    pub remark: String,
    /// Working directory; empty means "inherit the daemon's".
    pub workdir: String,
    pub command: String,
    pub args: Vec<String>,
}

impl ProgramSpec {
    pub fn new(
        remark: impl Into<String>,
        command: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            remark: remark.into(),
            workdir: String::new(),
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_workdir(mut self, workdir: impl Into<String>) -> Self {
        self.workdir = workdir.into();
        self
    }
}

/// User/group the spawned processes run as.
///
/// Daemon-wide: applies to every chain step and every hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credential {
    pub uid: u32,
    pub gid: u32,
}

/// Outcome-driven notification programs. Each one is independent; up to
/// two fire per run (finish plus one of success/failure).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyHooks {
    pub on_success: Option<ProgramSpec>,
    pub on_failure: Option<ProgramSpec>,
    pub on_finish: Option<ProgramSpec>,
}

impl NotifyHooks {
    pub fn is_empty(&self) -> bool {
        self.on_success.is_none() && self.on_failure.is_none() && self.on_finish.is_none()
    }
}

/// Validated configuration consumed by [`crate::engine::Tasker`].
///
/// Read-only for the lifetime of the tasker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskerConfig {
    pub task_name: String,
    pub programs: Vec<ProgramSpec>,
    pub cron_expression: String,
    /// IANA name, e.g. `Asia/Shanghai`. `None` uses the host's local time.
    pub timezone: Option<String>,
    pub run_at_startup: bool,
    pub stdout_redirect: Option<PathBuf>,
    pub stderr_redirect: Option<PathBuf>,
    pub hooks: NotifyHooks,
    pub credential: Option<Credential>,
}

impl TaskerConfig {
    /// Minimal config: one chain and an expression, everything else off.
    pub fn new(cron_expression: impl Into<String>, programs: Vec<ProgramSpec>) -> Self {
        Self {
            task_name: DEFAULT_TASK_NAME.to_string(),
            programs,
            cron_expression: cron_expression.into(),
            timezone: None,
            run_at_startup: false,
            stdout_redirect: None,
            stderr_redirect: None,
            hooks: NotifyHooks::default(),
            credential: None,
        }
    }
}
