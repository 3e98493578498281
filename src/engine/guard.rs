// src/engine/guard.rs

//! Single-flight run guard.
//!
//! States are `Idle` and `Running`. A trigger is admitted only on the
//! `Idle -> Running` transition; a trigger arriving while `Running` is
//! dropped, never queued. The `running` flag is read lock-free on the fast
//! path and only ever written while `lock` is held, after a re-check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct RunGuard {
    running: AtomicBool,
    lock: Mutex<()>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Try the `Idle -> Running` transition. Returns `false` if a run is
    /// already in flight (including when another caller won the race).
    pub fn try_admit(&self) -> bool {
        if self.running.load(Ordering::Acquire) {
            return false;
        }
        let _held = self.lock();
        if self.running.load(Ordering::Acquire) {
            return false;
        }
        self.running.store(true, Ordering::Release);
        true
    }

    /// `Running -> Idle`.
    pub fn release(&self) {
        let _held = self.lock();
        self.running.store(false, Ordering::Release);
    }

    /// Scoped form of [`try_admit`](Self::try_admit): the returned permit
    /// releases the guard when dropped, on every exit path including
    /// unwinding.
    pub fn acquire(&self) -> Option<RunPermit<'_>> {
        self.try_admit().then(|| RunPermit { guard: self })
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // Unit mutex: poisoning carries no state.
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof that the holder owns the `Running` state.
#[derive(Debug)]
#[must_use = "dropping the permit immediately releases the guard"]
pub struct RunPermit<'a> {
    guard: &'a RunGuard,
}

impl Drop for RunPermit<'_> {
    fn drop(&mut self) {
        self.guard.release();
    }
}
