// src/exec/backend.rs

//! Pluggable process spawner.
//!
//! The runner talks to a `ProcessSpawner` instead of `tokio::process`
//! directly, so tests can record invocations and script failures or
//! panics without forking anything.

use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::RunError;
use super::output::OutputSink;
use crate::types::Credential;

/// Everything needed to start one process.
#[derive(Debug)]
pub struct SpawnRequest {
    pub workdir: String,
    pub command: String,
    pub args: Vec<String>,
    pub stdout: OutputSink,
    pub stderr: OutputSink,
    pub credential: Option<Credential>,
}

/// Spawns a process and waits for it to exit.
///
/// Resolves to `Ok(())` only on a zero exit status.
pub trait ProcessSpawner: Send + Sync {
    fn spawn(
        &self,
        request: SpawnRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), RunError>> + Send + '_>>;
}

/// Production spawner backed by `tokio::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessSpawner;

impl ProcessSpawner for TokioProcessSpawner {
    fn spawn(
        &self,
        request: SpawnRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), RunError>> + Send + '_>> {
        Box::pin(spawn_and_wait(request))
    }
}

async fn spawn_and_wait(request: SpawnRequest) -> Result<(), RunError> {
    let SpawnRequest {
        workdir,
        command,
        args,
        stdout,
        stderr,
        credential,
    } = request;

    let mut cmd = Command::new(&command);
    cmd.args(&args);
    if !workdir.is_empty() {
        cmd.current_dir(&workdir);
    }
    apply_credential(&mut cmd, credential);

    let (stdout_stdio, stdout_writer) = stdout.into_stdio();
    let (stderr_stdio, stderr_writer) = stderr.into_stdio();
    cmd.stdin(Stdio::null()).stdout(stdout_stdio).stderr(stderr_stdio);

    let mut child = cmd.spawn().map_err(|source| RunError::Spawn {
        command: command.clone(),
        source,
    })?;
    debug!(command = %command, pid = child.id(), "process started");

    let stdout_pump = pump(child.stdout.take(), stdout_writer, "stdout");
    let stderr_pump = pump(child.stderr.take(), stderr_writer, "stderr");

    let status = child.wait().await.map_err(|source| RunError::Wait {
        command: command.clone(),
        source,
    })?;

    // Drain the pipes fully before reporting, so redirected output is
    // complete when the next step starts.
    for handle in [stdout_pump, stderr_pump].into_iter().flatten() {
        if let Err(e) = handle.await {
            warn!(command = %command, error = %e, "output pump task failed");
        }
    }

    info!(
        command = %command,
        exit_code = status.code().unwrap_or(-1),
        success = status.success(),
        "process exited"
    );

    if status.success() {
        Ok(())
    } else {
        Err(RunError::Exit {
            command,
            code: status.code(),
        })
    }
}

/// Chunks buffered between a pipe reader and its blocking sink writer.
const PUMP_QUEUE: usize = 16;

/// Copy a child pipe into its sink chunk by chunk while the child runs.
///
/// The pipe is read on the runtime; the sink is written on a blocking
/// thread, since it is a plain `std::io::Write`.
fn pump<R>(
    reader: Option<R>,
    writer: Option<Box<dyn Write + Send>>,
    stream: &'static str,
) -> Option<JoinHandle<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (mut reader, writer) = (reader?, writer?);
    let (tx, rx) = mpsc::channel::<Vec<u8>>(PUMP_QUEUE);
    let sink = tokio::task::spawn_blocking(move || write_chunks(rx, writer, stream));

    Some(tokio::spawn(async move {
        let mut buf = vec![0u8; 8 * 1024];
        let mut forwarding = true;
        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!(stream, error = %e, "reading child output failed");
                    break;
                }
            };
            // Keep draining if the writer is gone so the child never blocks
            // on a full pipe.
            if forwarding && tx.send(buf[..n].to_vec()).await.is_err() {
                forwarding = false;
            }
        }
        drop(tx);
        if let Err(e) = sink.await {
            warn!(stream, error = %e, "output writer task failed");
        }
    }))
}

fn write_chunks(mut rx: mpsc::Receiver<Vec<u8>>, mut writer: Box<dyn Write + Send>, stream: &str) {
    let mut sink_ok = true;
    while let Some(chunk) = rx.blocking_recv() {
        if sink_ok {
            if let Err(e) = writer.write_all(&chunk) {
                warn!(stream, error = %e, "writing child output failed; discarding the rest");
                sink_ok = false;
            }
        }
    }
    if let Err(e) = writer.flush() {
        warn!(stream, error = %e, "flushing child output failed");
    }
}

#[cfg(unix)]
fn apply_credential(cmd: &mut Command, credential: Option<Credential>) {
    if let Some(cred) = credential {
        cmd.uid(cred.uid).gid(cred.gid);
    }
}

#[cfg(not(unix))]
fn apply_credential(_cmd: &mut Command, credential: Option<Credential>) {
    if credential.is_some() {
        warn!("user/group switching is only supported on unix; ignoring credential");
    }
}
