use std::collections::HashMap;
use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crontask::exec::{OutputSink, ProcessSpawner, RunError, SpawnRequest};
use crontask::types::Credential;

/// How a scripted command ends.
#[derive(Debug, Clone, Default)]
pub enum Action {
    #[default]
    Succeed,
    /// Non-zero exit with this code.
    Exit(i32),
    /// The executable cannot be started.
    SpawnError,
    /// Panic inside the spawner, as a stand-in for an unexpected runtime
    /// fault.
    Panic(String),
}

/// Scripted behaviour for one command name.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub delay: Option<Duration>,
    pub stdout: Option<Vec<u8>>,
    pub stderr: Option<Vec<u8>>,
    pub action: Action,
}

impl Script {
    pub fn succeed() -> Self {
        Self::default()
    }

    pub fn exit(code: i32) -> Self {
        Self {
            action: Action::Exit(code),
            ..Self::default()
        }
    }

    pub fn spawn_error() -> Self {
        Self {
            action: Action::SpawnError,
            ..Self::default()
        }
    }

    pub fn panic(msg: &str) -> Self {
        Self {
            action: Action::Panic(msg.to_string()),
            ..Self::default()
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn stdout(mut self, bytes: &[u8]) -> Self {
        self.stdout = Some(bytes.to_vec());
        self
    }

    pub fn stderr(mut self, bytes: &[u8]) -> Self {
        self.stderr = Some(bytes.to_vec());
        self
    }
}

/// What the fake saw for one spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnCall {
    pub command: String,
    pub args: Vec<String>,
    pub workdir: String,
    pub stdout_inherited: bool,
    pub stderr_inherited: bool,
    pub credential: Option<Credential>,
}

/// A fake process spawner that:
/// - records every spawn request
/// - behaves per command according to its `Script` (default: succeed)
/// - tracks how many spawns are in flight at once.
#[derive(Default)]
pub struct FakeSpawner {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<SpawnCall>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeSpawner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the behaviour of `command`.
    pub fn on(&self, command: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(command.to_string(), script);
    }

    pub fn calls(&self) -> Vec<SpawnCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }

    /// Highest number of spawns that were in flight simultaneously.
    pub fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn script_for(&self, command: &str) -> Script {
        self.scripts
            .lock()
            .unwrap()
            .get(command)
            .cloned()
            .unwrap_or_default()
    }
}

struct ActiveSlot<'a>(&'a AtomicUsize);

impl Drop for ActiveSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn write_sink(sink: OutputSink, bytes: Option<&[u8]>) {
    if let (OutputSink::Writer(mut w), Some(bytes)) = (sink, bytes) {
        w.write_all(bytes).unwrap();
        w.flush().unwrap();
    }
}

impl ProcessSpawner for FakeSpawner {
    fn spawn(
        &self,
        request: SpawnRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), RunError>> + Send + '_>> {
        Box::pin(async move {
            let script = self.script_for(&request.command);

            self.calls.lock().unwrap().push(SpawnCall {
                command: request.command.clone(),
                args: request.args.clone(),
                workdir: request.workdir.clone(),
                stdout_inherited: request.stdout.is_inherit(),
                stderr_inherited: request.stderr.is_inherit(),
                credential: request.credential,
            });

            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);
            let _slot = ActiveSlot(&self.active);

            if let Some(delay) = script.delay {
                tokio::time::sleep(delay).await;
            }

            write_sink(request.stdout, script.stdout.as_deref());
            write_sink(request.stderr, script.stderr.as_deref());

            match script.action {
                Action::Succeed => Ok(()),
                Action::Exit(code) => Err(RunError::Exit {
                    command: request.command,
                    code: Some(code),
                }),
                Action::SpawnError => Err(RunError::Spawn {
                    command: request.command,
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "No such file or directory",
                    ),
                }),
                Action::Panic(msg) => panic!("{msg}"),
            }
        })
    }
}
