// src/exec/runner.rs

//! Runs a single program spec and contains faults.

use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, Mutex, Once, PoisonError};

use tokio::task::JoinError;
use tracing::{debug, error};

use super::RunError;
use super::backend::{ProcessSpawner, SpawnRequest};
use super::output::OutputResolver;
use crate::types::{Credential, ProgramSpec, RunId};

/// Where a contained panic was raised, recorded by the panic hook while the
/// panicking thread is still inside the faulting frame.
#[derive(Debug)]
struct FaultSite {
    location: Option<String>,
    backtrace: Backtrace,
}

type FaultSlot = Arc<Mutex<Option<FaultSite>>>;

tokio::task_local! {
    static FAULT_SITE: FaultSlot;
}

static PANIC_HOOK: Once = Once::new();

/// Chain a panic hook that records the first panic site of a runner task.
/// Panics outside runner tasks only reach the previous hook.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            let _ = FAULT_SITE.try_with(|slot| {
                let mut site = slot.lock().unwrap_or_else(PoisonError::into_inner);
                if site.is_none() {
                    *site = Some(FaultSite {
                        location: info.location().map(ToString::to_string),
                        backtrace: Backtrace::force_capture(),
                    });
                }
            });
            previous(info);
        }));
    });
}

/// Resolves sinks, applies the daemon-wide credential and spawns one
/// program, waiting for it to exit.
///
/// Sink resolution and the spawn/wait run on their own tokio task. A panic
/// anywhere in there is caught at this boundary and reported as
/// [`RunError::Fault`], so one bad step can never take down the trigger
/// loop.
#[derive(Clone)]
pub struct SubprocessRunner {
    spawner: Arc<dyn ProcessSpawner>,
    output: Arc<OutputResolver>,
    credential: Option<Credential>,
}

impl SubprocessRunner {
    pub fn new(
        spawner: Arc<dyn ProcessSpawner>,
        output: OutputResolver,
        credential: Option<Credential>,
    ) -> Self {
        install_panic_hook();
        Self {
            spawner,
            output: Arc::new(output),
            credential,
        }
    }

    pub async fn run(&self, run_id: RunId, program: &ProgramSpec) -> Result<(), RunError> {
        debug!(
            run_id,
            remark = %program.remark,
            cmd = %program.command,
            args = ?program.args,
            "starting program"
        );

        let spawner = Arc::clone(&self.spawner);
        let output = Arc::clone(&self.output);
        let credential = self.credential;
        let owned = program.clone();

        let slot = FaultSlot::default();
        let handle = tokio::spawn(FAULT_SITE.scope(Arc::clone(&slot), async move {
            let request = SpawnRequest {
                stdout: output.resolve_stdout()?,
                stderr: output.resolve_stderr()?,
                workdir: owned.workdir,
                command: owned.command,
                args: owned.args,
                credential,
            };
            spawner.spawn(request).await
        }));

        match handle.await {
            Ok(result) => result,
            Err(join_err) => {
                let site = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
                Err(contain_fault(run_id, program, join_err, site))
            }
        }
    }
}

impl fmt::Debug for SubprocessRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubprocessRunner")
            .field("output", &self.output)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

fn contain_fault(
    run_id: RunId,
    program: &ProgramSpec,
    join_err: JoinError,
    site: Option<FaultSite>,
) -> RunError {
    let message = if join_err.is_panic() {
        panic_message(join_err.into_panic())
    } else {
        join_err.to_string()
    };
    let (location, stack) = match site {
        Some(site) => (site.location, site.backtrace.to_string()),
        None => (None, "unavailable".to_string()),
    };
    error!(
        run_id,
        remark = %program.remark,
        panic = %message,
        location = location.as_deref().unwrap_or("unknown"),
        stack = %stack,
        "run program caused panic"
    );
    RunError::Fault { message, location }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
