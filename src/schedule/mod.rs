// src/schedule/mod.rs

//! Time-based trigger sources.
//!
//! The tasker only needs to know when the next trigger is due; the
//! concrete cron parsing lives in [`cron`].

pub mod cron;

use chrono::{DateTime, Utc};

pub use self::cron::CronSchedule;

/// Something that can answer "when is the next trigger after `after`?".
pub trait Schedule: Send + Sync {
    /// Next fire instant strictly after `after`, or `None` if the schedule
    /// never fires again.
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>>;
}
