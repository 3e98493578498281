// src/engine/mod.rs

//! Execution engine.
//!
//! - [`guard`] is the single-flight run guard.
//! - [`chain`] runs the program chain fail-fast.
//! - [`notify`] selects and runs the outcome hooks.
//! - [`tasker`] ties them to a [`crate::schedule::Schedule`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::exec::RunError;
use crate::types::RunId;

pub mod chain;
pub mod guard;
pub mod notify;
pub mod tasker;

pub use chain::ChainExecutor;
pub use guard::{RunGuard, RunPermit};
pub use notify::{HookKind, NotifyDispatcher, TemplateVars, render_args};
pub use tasker::{Tasker, TriggerOutcome};

/// Per-run context, alive for one chain execution and its hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub task_name: String,
}

impl RunContext {
    pub fn new(run_id: RunId, task_name: impl Into<String>) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            task_name: task_name.into(),
        }
    }
}

/// A chain step failed; later steps were not run.
#[derive(Error, Debug)]
#[error("step:{step} exec failed, err:[{source}]")]
pub struct ChainError {
    /// Zero-based index of the failing step.
    pub step: usize,
    pub remark: String,
    #[source]
    pub source: RunError,
}

/// Timing of one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub remark: String,
    pub elapsed: Duration,
    pub succeeded: bool,
}

/// Result of one chain execution.
#[derive(Debug)]
pub struct ChainOutcome {
    /// Wall-clock time of the whole chain.
    pub elapsed: Duration,
    /// Steps that were actually started, in order.
    pub steps: Vec<StepReport>,
    pub error: Option<ChainError>,
}

impl ChainOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
