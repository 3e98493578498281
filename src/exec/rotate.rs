// src/exec/rotate.rs

//! Rotating file writer.
//!
//! The active file keeps its configured name. When a write would push it
//! past `max_size_bytes`, it is renamed to `<stem>-<UTC timestamp>.<ext>` and
//! a fresh file is opened in its place. After every rotation old backups are
//! pruned by count (`max_backups`) and by age (`max_age_days`); a zero value
//! disables that limit. Backups are never compressed.

use std::fmt::Debug;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tracing::{debug, warn};

const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub max_size_bytes: u64,
    pub max_backups: usize,
    pub max_age_days: u32,
}

/// Opens a writer bound to `path` that rotates according to `policy`.
///
/// Rotation state lives in the returned writer, so every call yields an
/// independent handle.
pub trait RotatingWriterFactory: Send + Sync {
    fn open(&self, path: &Path, policy: RotationPolicy) -> io::Result<Box<dyn Write + Send>>;
}

/// Factory producing [`RotatingFile`]s on the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct RotatingFileFactory;

impl RotatingWriterFactory for RotatingFileFactory {
    fn open(&self, path: &Path, policy: RotationPolicy) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(RotatingFile::open(path, policy)?))
    }
}

#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    policy: RotationPolicy,
    file: File,
    size: u64,
}

impl RotatingFile {
    /// Open (or create) `path` in append mode, creating parent directories.
    pub fn open(path: impl AsRef<Path>, policy: RotationPolicy) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = open_append(&path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            path,
            policy,
            file,
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        let backup = self.next_backup_path();
        fs::rename(&self.path, &backup)?;
        debug!(path = ?self.path, backup = ?backup, "rotated log file");

        self.file = open_append(&self.path)?;
        self.size = 0;

        if let Err(e) = self.prune() {
            warn!(path = ?self.path, error = %e, "failed to prune rotated log files");
        }
        Ok(())
    }

    fn next_backup_path(&self) -> PathBuf {
        let (stem, ext) = split_name(&self.path);
        let stamp = Utc::now().format(BACKUP_TIME_FORMAT).to_string();
        let dir = self.dir();

        let mut candidate = dir.join(backup_name(&stem, &stamp, ext.as_deref()));
        let mut n = 1;
        while candidate.exists() {
            let stamp = format!("{stamp}-{n}");
            candidate = dir.join(backup_name(&stem, &stamp, ext.as_deref()));
            n += 1;
        }
        candidate
    }

    fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Backups of this file, newest first.
    pub fn backups(&self) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .backups_with_mtime()?
            .into_iter()
            .map(|(path, _)| path)
            .collect())
    }

    fn backups_with_mtime(&self) -> io::Result<Vec<(PathBuf, SystemTime)>> {
        let (stem, ext) = split_name(&self.path);
        let prefix = format!("{stem}-");
        let suffix = ext.map(|e| format!(".{e}")).unwrap_or_default();

        let mut found = Vec::new();
        for entry in fs::read_dir(self.dir())? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(rest) = name.strip_prefix(&prefix) else { continue };
            if !rest.ends_with(&suffix) || !rest.starts_with(|c: char| c.is_ascii_digit()) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            found.push((entry.path(), modified));
        }

        found.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
        Ok(found)
    }

    fn prune(&self) -> io::Result<()> {
        let cutoff = match self.policy.max_age_days {
            0 => None,
            days => SystemTime::now().checked_sub(Duration::from_secs(u64::from(days) * SECS_PER_DAY)),
        };

        for (idx, (path, modified)) in self.backups_with_mtime()?.into_iter().enumerate() {
            let over_count = self.policy.max_backups > 0 && idx >= self.policy.max_backups;
            let too_old = cutoff.is_some_and(|cutoff| modified < cutoff);
            if over_count || too_old {
                match fs::remove_file(&path) {
                    Ok(()) => debug!(backup = ?path, "removed old log backup"),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let incoming = buf.len() as u64;
        if self.size > 0 && self.size + incoming > self.policy.max_size_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.size += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn split_name(path: &Path) -> (String, Option<String>) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    (stem, ext)
}

fn backup_name(stem: &str, stamp: &str, ext: Option<&str>) -> String {
    match ext {
        Some(ext) => format!("{stem}-{stamp}.{ext}"),
        None => format!("{stem}-{stamp}"),
    }
}
