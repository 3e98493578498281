// src/engine/tasker.rs

//! The tasker: turns schedule ticks into serialized chain runs.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::chain::ChainExecutor;
use super::guard::RunGuard;
use super::notify::NotifyDispatcher;
use super::RunContext;
use crate::config::validate_tasker_config;
use crate::errors::{CrontaskError, Result};
use crate::exec::{
    OutputResolver, ProcessSpawner, RotatingFileFactory, RotatingWriterFactory, SubprocessRunner,
    TokioProcessSpawner,
};
use crate::schedule::{CronSchedule, Schedule};
use crate::types::{RunId, TaskerConfig};

/// What happened to one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A run was already in flight; the trigger was dropped.
    Skipped,
    Finished {
        run_id: RunId,
        succeeded: bool,
        elapsed: Duration,
    },
}

pub struct Tasker {
    config: TaskerConfig,
    schedule: Box<dyn Schedule>,
    guard: RunGuard,
    last_id: AtomicU64,
    chain: ChainExecutor,
    notifier: NotifyDispatcher,
}

impl Tasker {
    /// Build a tasker with the production collaborators: cron schedule,
    /// tokio process spawner and rotating files on disk.
    pub fn new(config: TaskerConfig) -> Result<Self> {
        validate_tasker_config(&config)?;
        let schedule = CronSchedule::new(&config.cron_expression, config.timezone.as_deref())?;
        Self::with_components(
            config,
            Box::new(schedule),
            Arc::new(TokioProcessSpawner),
            Arc::new(RotatingFileFactory),
        )
    }

    /// Build a tasker around caller-supplied collaborators.
    pub fn with_components(
        config: TaskerConfig,
        schedule: Box<dyn Schedule>,
        spawner: Arc<dyn ProcessSpawner>,
        writers: Arc<dyn RotatingWriterFactory>,
    ) -> Result<Self> {
        validate_tasker_config(&config)?;

        let output = OutputResolver::new(
            config.stdout_redirect.clone(),
            config.stderr_redirect.clone(),
            writers,
        );
        let runner = SubprocessRunner::new(spawner, output, config.credential);
        let chain = ChainExecutor::new(runner.clone(), config.task_name.clone());
        let notifier = NotifyDispatcher::new(config.hooks.clone(), runner);

        Ok(Self {
            config,
            schedule,
            guard: RunGuard::new(),
            last_id: AtomicU64::new(0),
            chain,
            notifier,
        })
    }

    pub fn config(&self) -> &TaskerConfig {
        &self.config
    }

    pub fn task_name(&self) -> &str {
        &self.config.task_name
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    /// Id of the most recently admitted run, `0` before the first one.
    pub fn last_run_id(&self) -> RunId {
        self.last_id.load(Ordering::Acquire)
    }

    /// Handle one trigger: run the chain and its hooks if no run is in
    /// flight, otherwise drop the trigger.
    ///
    /// The caller is blocked for the whole run.
    pub async fn on_trigger(&self) -> TriggerOutcome {
        let Some(_permit) = self.guard.acquire() else {
            warn!(
                task = %self.task_name(),
                skipped_id = self.last_run_id() + 1,
                "previous task still running, skip current task"
            );
            return TriggerOutcome::Skipped;
        };

        let run_id = self.last_id.fetch_add(1, Ordering::AcqRel) + 1;
        let ctx = RunContext::new(run_id, self.config.task_name.clone());
        info!(task = %ctx.task_name, run_id, started_at = %ctx.started_at, "run started");

        let outcome = self.chain.run_chain(run_id, &self.config.programs).await;
        self.notifier
            .dispatch(run_id, &ctx.task_name, outcome.elapsed, outcome.error.as_ref())
            .await;

        TriggerOutcome::Finished {
            run_id,
            succeeded: outcome.is_success(),
            elapsed: outcome.elapsed,
        }
    }

    /// Run forever: optionally once at startup, then at every schedule tick.
    ///
    /// Each tick is delivered on its own tokio task, so a run that outlasts
    /// the interval makes the next tick overlap (and be skipped by the
    /// guard). Returns an error only if the schedule never fires. If a
    /// finite schedule runs out, returns `Ok` once every tick it delivered
    /// has finished, hooks included.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let first = self.schedule.next_after(Utc::now()).ok_or_else(|| {
            CrontaskError::NoUpcomingFire(self.config.cron_expression.clone())
        })?;
        info!(
            task = %self.task_name(),
            expression = %self.config.cron_expression,
            next = %first,
            "scheduler registered"
        );

        let mut next = first;
        if self.config.run_at_startup {
            info!(task = %self.task_name(), "run when start");
            self.on_trigger().await;
            // Ticks that passed during the startup run are not caught up.
            if next <= Utc::now() {
                next = match self.schedule.next_after(Utc::now()) {
                    Some(n) => n,
                    None => return Ok(()),
                };
            }
        }

        let mut ticks = JoinSet::new();
        loop {
            sleep_until(next).await;
            while ticks.try_join_next().is_some() {}

            let tasker = Arc::clone(&self);
            ticks.spawn(async move {
                tasker.on_trigger().await;
            });

            // Never fire the same instant twice, and never catch up on
            // ticks missed while the clock jumped.
            let after = next.max(Utc::now());
            next = match self.schedule.next_after(after) {
                Some(n) => n,
                None => break,
            };
            debug!(task = %self.task_name(), next = %next, "next trigger scheduled");
        }

        info!(
            task = %self.task_name(),
            in_flight = ticks.len(),
            "schedule exhausted, waiting for delivered triggers"
        );
        while let Some(res) = ticks.join_next().await {
            if let Err(e) = res {
                warn!(task = %self.task_name(), error = %e, "trigger task failed");
            }
        }
        Ok(())
    }
}

async fn sleep_until(at: DateTime<Utc>) {
    let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    tokio::time::sleep(wait).await;
}

impl fmt::Debug for Tasker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tasker")
            .field("config", &self.config)
            .field("guard", &self.guard)
            .field("last_id", &self.last_id)
            .finish_non_exhaustive()
    }
}
