// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod schedule;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::Utc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, config_from_env, default_config_path, load_and_validate};
use crate::engine::{Tasker, TriggerOutcome};
use crate::schedule::CronSchedule;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file or legacy env mode)
/// - logging
/// - the tasker and its cron schedule
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_config(&args)?;
    logging::init_logging(args.log_level, &cfg.log)?;
    info!(task = %cfg.tasker.task_name, steps = cfg.tasker.programs.len(), "config init succ");

    if args.dry_run {
        print_dry_run(&cfg)?;
        return Ok(());
    }

    let tasker = Arc::new(Tasker::new(cfg.tasker)?);

    if args.once {
        return match tasker.on_trigger().await {
            TriggerOutcome::Finished { succeeded: true, .. } => Ok(()),
            TriggerOutcome::Finished { run_id, .. } => bail!("run {run_id} failed"),
            TriggerOutcome::Skipped => bail!("run was skipped"),
        };
    }

    tokio::select! {
        res = Arc::clone(&tasker).run() => res?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!(running = tasker.is_running(), "shutdown requested; exiting");
        }
    }
    Ok(())
}

fn load_config(args: &CliArgs) -> Result<ConfigFile> {
    if !args.command.is_empty() {
        return Ok(config_from_env(&args.command)?);
    }
    let path = args
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    Ok(load_and_validate(&path)?)
}

/// Simple dry-run output: print the chain, hooks and next fire times.
fn print_dry_run(cfg: &ConfigFile) -> Result<()> {
    let t = &cfg.tasker;
    let schedule = CronSchedule::new(&t.cron_expression, t.timezone.as_deref())?;

    println!("crontask dry-run");
    println!("  task_name = {}", t.task_name);
    println!("  expression = {}", schedule.expression());
    println!("  tz = {}", t.timezone.as_deref().unwrap_or("(local)"));
    println!("  run_when_start = {}", t.run_at_startup);
    if let Some(ref p) = t.stdout_redirect {
        println!("  redirect_stdout = {}", p.display());
    }
    if let Some(ref p) = t.stderr_redirect {
        println!("  redirect_stderr = {}", p.display());
    }
    if let Some(cred) = t.credential {
        println!("  user = {}:{}", cred.uid, cred.gid);
    }
    println!();

    println!("programs ({}):", t.programs.len());
    for (idx, p) in t.programs.iter().enumerate() {
        println!("  {idx}. {}", p.remark);
        println!("      cmd: {} {:?}", p.command, p.args);
        if !p.workdir.is_empty() {
            println!("      work_dir: {}", p.workdir);
        }
    }

    let hooks = [
        ("on_finish", &t.hooks.on_finish),
        ("on_failure", &t.hooks.on_failure),
        ("on_success", &t.hooks.on_success),
    ];
    for (name, hook) in hooks {
        if let Some(h) = hook {
            println!("{name}: {} {:?}", h.command, h.args);
        }
    }
    println!();

    println!("next fire times:");
    for at in schedule.upcoming(Utc::now(), 5) {
        println!("  - {at}");
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
