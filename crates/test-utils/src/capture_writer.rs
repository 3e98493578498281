use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crontask::exec::{RotatingWriterFactory, RotationPolicy};

type Buffers = Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>;

/// In-memory stand-in for the rotating file factory.
///
/// Every `open` is recorded; bytes written through any handle for a path
/// accumulate in one buffer per path.
#[derive(Default)]
pub struct CaptureWriterFactory {
    opened: Mutex<Vec<(PathBuf, RotationPolicy)>>,
    buffers: Buffers,
}

impl CaptureWriterFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Paths opened so far, with the policy requested, in order.
    pub fn opened(&self) -> Vec<(PathBuf, RotationPolicy)> {
        self.opened.lock().unwrap().clone()
    }

    /// Everything written for `path`, lossily decoded.
    pub fn contents(&self, path: impl AsRef<Path>) -> String {
        self.buffers
            .lock()
            .unwrap()
            .get(path.as_ref())
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }
}

impl RotatingWriterFactory for CaptureWriterFactory {
    fn open(&self, path: &Path, policy: RotationPolicy) -> io::Result<Box<dyn Write + Send>> {
        self.opened
            .lock()
            .unwrap()
            .push((path.to_path_buf(), policy));
        Ok(Box::new(CaptureWriter {
            path: path.to_path_buf(),
            buffers: Arc::clone(&self.buffers),
        }))
    }
}

struct CaptureWriter {
    path: PathBuf,
    buffers: Buffers,
}

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffers
            .lock()
            .unwrap()
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A factory whose `open` always fails, for sink error paths.
#[derive(Debug, Default)]
pub struct FailingWriterFactory;

impl RotatingWriterFactory for FailingWriterFactory {
    fn open(&self, path: &Path, _policy: RotationPolicy) -> io::Result<Box<dyn Write + Send>> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("cannot open {}", path.display()),
        ))
    }
}
