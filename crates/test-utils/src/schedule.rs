use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crontask::schedule::Schedule;

/// Fires every `every`, for at most `fires` ticks, then never again.
#[derive(Debug)]
pub struct IntervalSchedule {
    every: chrono::Duration,
    remaining: AtomicUsize,
}

impl IntervalSchedule {
    pub fn new(every: Duration, fires: usize) -> Self {
        Self {
            every: chrono::Duration::from_std(every).expect("interval out of range"),
            remaining: AtomicUsize::new(fires),
        }
    }
}

impl Schedule for IntervalSchedule {
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()?;
        Some(after + self.every)
    }
}

/// A schedule with no fire times at all.
#[derive(Debug, Default)]
pub struct NeverSchedule;

impl Schedule for NeverSchedule {
    fn next_after(&self, _after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        None
    }
}
