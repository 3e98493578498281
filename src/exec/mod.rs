// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `ProcessSpawner` trait and the production
//!   `TokioProcessSpawner`; tests swap in a fake that never forks.
//! - [`output`] decides where a subprocess's stdout/stderr go.
//! - [`rotate`] is the size/age/count based rotating file writer used for
//!   redirected output and the daemon's own log file.
//! - [`runner`] runs one program spec and contains any fault raised while
//!   doing so.

pub mod backend;
pub mod output;
pub mod rotate;
pub mod runner;

use std::path::PathBuf;

use thiserror::Error;

pub use backend::{ProcessSpawner, SpawnRequest, TokioProcessSpawner};
pub use output::{OutputResolver, OutputSink, REDIRECT_POLICY};
pub use rotate::{RotatingFile, RotatingFileFactory, RotatingWriterFactory, RotationPolicy};
pub use runner::SubprocessRunner;

/// Failure of a single subprocess invocation.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("spawn '{command}' failed: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("wait for '{command}' failed: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {}", describe_exit(.code))]
    Exit { command: String, code: Option<i32> },

    #[error("open output sink {path:?} failed: {source}")]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A panic contained at the runner boundary. `location` is the
    /// `file:line:col` it was raised at, when known.
    #[error("runtime fault: {message}")]
    Fault {
        message: String,
        location: Option<String>,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (killed by signal)".to_string(),
    }
}
