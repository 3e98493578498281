// src/exec/output.rs

//! Output stream resolution for subprocesses.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use super::RunError;
use super::rotate::{RotatingWriterFactory, RotationPolicy};

/// Rotation policy for redirected subprocess output.
pub const REDIRECT_POLICY: RotationPolicy = RotationPolicy {
    max_size_bytes: 10 * 1024 * 1024,
    max_backups: 5,
    max_age_days: 7,
};

/// Destination for one stream of a subprocess.
pub enum OutputSink {
    /// The daemon's own stdout/stderr, handed to the child as-is.
    Inherit,
    /// Bytes are pumped from a pipe into this writer as the child runs.
    Writer(Box<dyn Write + Send>),
}

impl OutputSink {
    pub fn is_inherit(&self) -> bool {
        matches!(self, OutputSink::Inherit)
    }

    /// Split into the `Stdio` to hand to the child and the writer (if any)
    /// that the piped stream must be copied into.
    pub fn into_stdio(self) -> (Stdio, Option<Box<dyn Write + Send>>) {
        match self {
            OutputSink::Inherit => (Stdio::inherit(), None),
            OutputSink::Writer(w) => (Stdio::piped(), Some(w)),
        }
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSink::Inherit => f.write_str("Inherit"),
            OutputSink::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

/// Chooses between the inherited stream and a rotating file per stream.
///
/// Resolution is done fresh for every subprocess; writer handles are never
/// cached across invocations.
pub struct OutputResolver {
    stdout_path: Option<PathBuf>,
    stderr_path: Option<PathBuf>,
    writers: Arc<dyn RotatingWriterFactory>,
}

impl OutputResolver {
    pub fn new(
        stdout_path: Option<PathBuf>,
        stderr_path: Option<PathBuf>,
        writers: Arc<dyn RotatingWriterFactory>,
    ) -> Self {
        Self {
            stdout_path,
            stderr_path,
            writers,
        }
    }

    pub fn resolve_stdout(&self) -> Result<OutputSink, RunError> {
        self.resolve(self.stdout_path.as_deref())
    }

    pub fn resolve_stderr(&self) -> Result<OutputSink, RunError> {
        self.resolve(self.stderr_path.as_deref())
    }

    fn resolve(&self, path: Option<&Path>) -> Result<OutputSink, RunError> {
        let Some(path) = path else {
            return Ok(OutputSink::Inherit);
        };
        self.writers
            .open(path, REDIRECT_POLICY)
            .map(OutputSink::Writer)
            .map_err(|source| RunError::Sink {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl fmt::Debug for OutputResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputResolver")
            .field("stdout_path", &self.stdout_path)
            .field("stderr_path", &self.stderr_path)
            .finish_non_exhaustive()
    }
}
