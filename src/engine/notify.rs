// src/engine/notify.rs

//! Outcome-based notification hooks.
//!
//! After a run, `on_finish` always fires (if configured), followed by
//! `on_failure` or `on_success` depending on the chain result. Hook
//! arguments may reference these placeholders:
//!
//! | token      | value                                 |
//! |------------|---------------------------------------|
//! | `$RUNID`   | decimal run id                        |
//! | `$TASK`    | task name                             |
//! | `$SUCC`    | `true` / `false`                      |
//! | `$RUNTIME` | chain wall time as `<N>ms`            |
//! | `$ERRMSG`  | chain error message, empty on success |
//!
//! Substitution is literal and single-pass: substituted values are never
//! expanded again.

use std::fmt;
use std::time::Duration;

use tracing::{error, info};

use super::ChainError;
use crate::exec::SubprocessRunner;
use crate::types::{NotifyHooks, ProgramSpec, RunId};

pub const RUN_ID_TOKEN: &str = "$RUNID";
pub const TASK_NAME_TOKEN: &str = "$TASK";
pub const SUCCESS_TOKEN: &str = "$SUCC";
pub const RUN_TIME_TOKEN: &str = "$RUNTIME";
pub const ERROR_MESSAGE_TOKEN: &str = "$ERRMSG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Finish,
    Failure,
    Success,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookKind::Finish => "on_finish",
            HookKind::Failure => "on_failure",
            HookKind::Success => "on_success",
        };
        f.write_str(name)
    }
}

/// Values available to hook argument templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVars {
    pub run_id: RunId,
    pub task_name: String,
    pub success: bool,
    pub elapsed: Duration,
    pub error_message: String,
}

impl TemplateVars {
    pub fn new(
        run_id: RunId,
        task_name: impl Into<String>,
        elapsed: Duration,
        error: Option<&ChainError>,
    ) -> Self {
        Self {
            run_id,
            task_name: task_name.into(),
            success: error.is_none(),
            elapsed,
            error_message: error.map(ToString::to_string).unwrap_or_default(),
        }
    }
}

/// Rewrite every placeholder occurrence in every argument, keeping order.
pub fn render_args(args: &[String], vars: &TemplateVars) -> Vec<String> {
    let run_id = vars.run_id.to_string();
    let success = vars.success.to_string();
    let run_time = format!("{}ms", vars.elapsed.as_millis());
    // No token is a prefix of another, so first match wins unambiguously.
    let table: [(&str, &str); 5] = [
        (RUN_ID_TOKEN, &run_id),
        (TASK_NAME_TOKEN, &vars.task_name),
        (SUCCESS_TOKEN, &success),
        (RUN_TIME_TOKEN, &run_time),
        (ERROR_MESSAGE_TOKEN, &vars.error_message),
    ];
    args.iter().map(|arg| substitute(arg, &table)).collect()
}

fn substitute(arg: &str, table: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;

    'scan: while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        for (token, value) in table {
            if let Some(after) = tail.strip_prefix(token) {
                out.push_str(value);
                rest = after;
                continue 'scan;
            }
        }
        out.push('$');
        rest = &tail[1..];
    }

    out.push_str(rest);
    out
}

/// Runs the selected hooks through the same runner as the chain.
///
/// Hook failures are logged and otherwise ignored: the run outcome is
/// already fixed when hooks fire.
#[derive(Debug, Clone)]
pub struct NotifyDispatcher {
    hooks: NotifyHooks,
    runner: SubprocessRunner,
}

impl NotifyDispatcher {
    pub fn new(hooks: NotifyHooks, runner: SubprocessRunner) -> Self {
        Self { hooks, runner }
    }

    /// Hooks that fire for the given outcome, in dispatch order.
    pub fn select(&self, failed: bool) -> Vec<(HookKind, &ProgramSpec)> {
        let mut selected = Vec::with_capacity(2);
        if let Some(p) = &self.hooks.on_finish {
            selected.push((HookKind::Finish, p));
        }
        if failed {
            if let Some(p) = &self.hooks.on_failure {
                selected.push((HookKind::Failure, p));
            }
        } else if let Some(p) = &self.hooks.on_success {
            selected.push((HookKind::Success, p));
        }
        selected
    }

    /// Run the hooks selected by `error`. Returns the kinds that were
    /// attempted, whether or not they succeeded.
    pub async fn dispatch(
        &self,
        run_id: RunId,
        task_name: &str,
        elapsed: Duration,
        error: Option<&ChainError>,
    ) -> Vec<HookKind> {
        let vars = TemplateVars::new(run_id, task_name, elapsed, error);
        let mut fired = Vec::new();

        for (kind, hook) in self.select(error.is_some()) {
            let program = ProgramSpec {
                args: render_args(&hook.args, &vars),
                ..hook.clone()
            };
            fired.push(kind);

            match self.runner.run(run_id, &program).await {
                Ok(()) => info!(run_id, hook = %kind, remark = %program.remark, "notify succeeded"),
                Err(e) => error!(
                    run_id,
                    hook = %kind,
                    remark = %program.remark,
                    error = %e,
                    "run notify failed"
                ),
            }
        }

        fired
    }
}
