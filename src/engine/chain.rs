// src/engine/chain.rs

//! Fail-fast program chain executor.

use std::time::Instant;

use tracing::{error, info};

use super::{ChainError, ChainOutcome, StepReport};
use crate::exec::SubprocessRunner;
use crate::types::{ProgramSpec, RunId};

/// Runs the steps of a chain strictly in order, stopping at the first
/// failure.
#[derive(Debug, Clone)]
pub struct ChainExecutor {
    runner: SubprocessRunner,
    task_name: String,
}

impl ChainExecutor {
    pub fn new(runner: SubprocessRunner, task_name: impl Into<String>) -> Self {
        Self {
            runner,
            task_name: task_name.into(),
        }
    }

    pub async fn run_chain(&self, run_id: RunId, programs: &[ProgramSpec]) -> ChainOutcome {
        let started = Instant::now();
        let mut steps = Vec::with_capacity(programs.len());

        for (step, program) in programs.iter().enumerate() {
            let step_started = Instant::now();
            let result = self.runner.run(run_id, program).await;
            let elapsed = step_started.elapsed();

            steps.push(StepReport {
                remark: program.remark.clone(),
                elapsed,
                succeeded: result.is_ok(),
            });

            match result {
                Ok(()) => {
                    info!(
                        task = %self.task_name,
                        run_id,
                        step,
                        remark = %program.remark,
                        cost = ?elapsed,
                        "step succeeded"
                    );
                }
                Err(source) => {
                    error!(
                        task = %self.task_name,
                        run_id,
                        step,
                        remark = %program.remark,
                        cost = ?elapsed,
                        error = %source,
                        "step failed, skip remaining steps"
                    );
                    let outcome = ChainOutcome {
                        elapsed: started.elapsed(),
                        steps,
                        error: Some(ChainError {
                            step,
                            remark: program.remark.clone(),
                            source,
                        }),
                    };
                    error!(
                        task = %self.task_name,
                        run_id,
                        failed_step = step,
                        total_steps = programs.len(),
                        cost = ?outcome.elapsed,
                        "task exec failed"
                    );
                    return outcome;
                }
            }
        }

        let elapsed = started.elapsed();
        info!(
            task = %self.task_name,
            run_id,
            total_steps = programs.len(),
            cost = ?elapsed,
            "task exec succ"
        );
        ChainOutcome {
            elapsed,
            steps,
            error: None,
        }
    }
}
