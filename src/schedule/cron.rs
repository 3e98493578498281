// src/schedule/cron.rs

//! Cron expressions via the `cron` crate, evaluated in a configurable
//! timezone.
//!
//! Accepted forms:
//! - standard 5 fields (`min hour dom month dow`), normalised by firing at
//!   second `0`;
//! - 6 or 7 fields with a leading seconds field (and optional year);
//! - `@hourly`, `@daily` and the other `@` shorthands.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;

use super::Schedule;
use crate::errors::{CrontaskError, Result};

#[derive(Debug, Clone, Copy)]
enum Zone {
    Local,
    Named(Tz),
}

#[derive(Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: ::cron::Schedule,
    zone: Zone,
}

impl CronSchedule {
    /// Parse `expression` and resolve `timezone` (IANA name). A missing or
    /// blank timezone means the host's local time.
    pub fn new(expression: &str, timezone: Option<&str>) -> Result<Self> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(CrontaskError::EmptyCronExpression);
        }

        let schedule = ::cron::Schedule::from_str(&normalize_expression(expression)).map_err(|e| {
            CrontaskError::InvalidCronExpression {
                expression: expression.to_string(),
                reason: e.to_string(),
            }
        })?;

        let zone = match timezone.map(str::trim).filter(|tz| !tz.is_empty()) {
            None => Zone::Local,
            Some(name) => Zone::Named(name.parse::<Tz>().map_err(|e| {
                CrontaskError::InvalidTimezone {
                    tz: name.to_string(),
                    reason: e.to_string(),
                }
            })?),
        };

        Ok(Self {
            expression: expression.to_string(),
            schedule,
            zone,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The next `count` fire times after `after`.
    pub fn upcoming(&self, after: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let mut out = Vec::with_capacity(count);
        let mut cursor = after;
        while out.len() < count {
            match self.next_after(cursor) {
                Some(next) => {
                    out.push(next);
                    cursor = next;
                }
                None => break,
            }
        }
        out
    }
}

impl Schedule for CronSchedule {
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.zone {
            Zone::Local => self
                .schedule
                .after(&after.with_timezone(&Local))
                .next()
                .map(|t| t.with_timezone(&Utc)),
            Zone::Named(tz) => self
                .schedule
                .after(&after.with_timezone(&tz))
                .next()
                .map(|t| t.with_timezone(&Utc)),
        }
    }
}

impl fmt::Debug for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CronSchedule")
            .field("expression", &self.expression)
            .field("zone", &self.zone)
            .finish()
    }
}

/// The `cron` crate always expects a seconds field; classic crontab lines
/// do not have one.
fn normalize_expression(expression: &str) -> String {
    if expression.starts_with('@') {
        return expression.to_string();
    }
    if expression.split_whitespace().count() == 5 {
        format!("0 {expression}")
    } else {
        expression.to_string()
    }
}
