// src/config/validate.rs

use std::path::PathBuf;

use crate::config::model::{ConfigFile, ProgramConfig, RawConfigFile};
use crate::errors::{CrontaskError, Result};
use crate::types::{Credential, DEFAULT_TASK_NAME, NotifyHooks, ProgramSpec, TaskerConfig};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CrontaskError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let tasker = tasker_config_from_raw(&raw);
        validate_tasker_config(&tasker)?;
        validate_hooks(&tasker.hooks)?;
        Ok(ConfigFile::new_unchecked(tasker, raw.log))
    }
}

/// Invariants every tasker relies on: a non-empty chain, a non-empty cron
/// expression, and a command for every step.
pub fn validate_tasker_config(cfg: &TaskerConfig) -> Result<()> {
    if cfg.programs.is_empty() {
        return Err(CrontaskError::NoPrograms);
    }
    if cfg.cron_expression.trim().is_empty() {
        return Err(CrontaskError::EmptyCronExpression);
    }
    for (idx, program) in cfg.programs.iter().enumerate() {
        if program.command.trim().is_empty() {
            return Err(CrontaskError::ConfigError(format!(
                "program {} ('{}') has an empty cmd",
                idx, program.remark
            )));
        }
    }
    Ok(())
}

fn validate_hooks(hooks: &NotifyHooks) -> Result<()> {
    let named = [
        ("notify.succ", &hooks.on_success),
        ("notify.fail", &hooks.on_failure),
        ("notify.finish", &hooks.on_finish),
    ];
    for (section, hook) in named {
        if let Some(hook) = hook {
            if hook.command.trim().is_empty() {
                return Err(CrontaskError::ConfigError(format!(
                    "[{section}] has an empty cmd"
                )));
            }
        }
    }
    Ok(())
}

fn tasker_config_from_raw(raw: &RawConfigFile) -> TaskerConfig {
    let task_name = match raw.task_name.trim() {
        "" => DEFAULT_TASK_NAME.to_string(),
        name => name.to_string(),
    };

    let programs = raw
        .programs
        .iter()
        .enumerate()
        .map(|(idx, p)| program_spec(p, &format!("step-{idx}")))
        .collect();

    TaskerConfig {
        task_name,
        programs,
        cron_expression: raw.crontask_expression.trim().to_string(),
        timezone: non_blank(raw.tz.as_deref()),
        run_at_startup: raw.run_when_start,
        stdout_redirect: non_blank(raw.redirect_stdout.as_deref()).map(PathBuf::from),
        stderr_redirect: non_blank(raw.redirect_stderr.as_deref()).map(PathBuf::from),
        hooks: NotifyHooks {
            on_success: raw.notify.succ.as_ref().map(|p| program_spec(p, "notify-succ")),
            on_failure: raw.notify.fail.as_ref().map(|p| program_spec(p, "notify-fail")),
            on_finish: raw.notify.finish.as_ref().map(|p| program_spec(p, "notify-finish")),
        },
        credential: raw.user.map(|u| Credential {
            uid: u.uid,
            gid: u.gid,
        }),
    }
}

fn program_spec(p: &ProgramConfig, fallback_remark: &str) -> ProgramSpec {
    ProgramSpec {
        remark: p.effective_remark(fallback_remark),
        workdir: p.work_dir.clone(),
        command: p.cmd.clone(),
        args: p.args.clone(),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
