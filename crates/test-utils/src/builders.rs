#![allow(dead_code)]

use std::path::PathBuf;

use crontask::types::{Credential, ProgramSpec, TaskerConfig};

/// Shorthand for a program without a working directory.
pub fn program(remark: &str, cmd: &str, args: &[&str]) -> ProgramSpec {
    ProgramSpec::new(remark, cmd, args.iter().copied())
}

/// Builder for `TaskerConfig` to simplify test setup.
pub struct TaskerConfigBuilder {
    config: TaskerConfig,
}

impl TaskerConfigBuilder {
    /// Every-minute expression, no programs yet.
    pub fn new() -> Self {
        Self {
            config: TaskerConfig::new("* * * * *", Vec::new()),
        }
    }

    pub fn task_name(mut self, name: &str) -> Self {
        self.config.task_name = name.to_string();
        self
    }

    pub fn expression(mut self, expr: &str) -> Self {
        self.config.cron_expression = expr.to_string();
        self
    }

    pub fn timezone(mut self, tz: &str) -> Self {
        self.config.timezone = Some(tz.to_string());
        self
    }

    pub fn with_program(mut self, program: ProgramSpec) -> Self {
        self.config.programs.push(program);
        self
    }

    /// Append a step whose remark equals its command.
    pub fn step(self, cmd: &str) -> Self {
        self.with_program(program(cmd, cmd, &[]))
    }

    pub fn run_at_startup(mut self, val: bool) -> Self {
        self.config.run_at_startup = val;
        self
    }

    pub fn redirect_stdout(mut self, path: &str) -> Self {
        self.config.stdout_redirect = Some(PathBuf::from(path));
        self
    }

    pub fn redirect_stderr(mut self, path: &str) -> Self {
        self.config.stderr_redirect = Some(PathBuf::from(path));
        self
    }

    pub fn on_success(mut self, hook: ProgramSpec) -> Self {
        self.config.hooks.on_success = Some(hook);
        self
    }

    pub fn on_failure(mut self, hook: ProgramSpec) -> Self {
        self.config.hooks.on_failure = Some(hook);
        self
    }

    pub fn on_finish(mut self, hook: ProgramSpec) -> Self {
        self.config.hooks.on_finish = Some(hook);
        self
    }

    pub fn credential(mut self, uid: u32, gid: u32) -> Self {
        self.config.credential = Some(Credential { uid, gid });
        self
    }

    pub fn build(self) -> TaskerConfig {
        self.config
    }
}

impl Default for TaskerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
