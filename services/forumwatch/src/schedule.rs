//! Mapping from a check interval to a wall-clock aligned tick schedule

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::records::validate_interval;

/// When periodic checks fire.
///
/// Intervals of an hour or more are truncated to whole hours, so 61 and
/// 119 minutes both tick hourly. Firing instants are aligned like a `*/n`
/// cron field: minute steps restart at the top of every hour and hour steps
/// restart at midnight UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    EveryMinutes(u32),
    EveryHours(u32),
}

impl Schedule {
    pub fn from_interval(minutes: u32) -> crate::Result<Self> {
        validate_interval(minutes)?;
        if minutes >= 60 {
            Ok(Schedule::EveryHours(minutes / 60))
        } else {
            Ok(Schedule::EveryMinutes(minutes))
        }
    }

    /// Nominal spacing between ticks
    pub fn period(&self) -> Duration {
        match self {
            Schedule::EveryMinutes(step) => Duration::from_secs(u64::from(*step) * 60),
            Schedule::EveryHours(step) => Duration::from_secs(u64::from(*step) * 3600),
        }
    }

    /// The first firing instant strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let secs = now.timestamp();
        let (unit, step, cycle) = match self {
            Schedule::EveryMinutes(step) => (60, i64::from(*step), 60),
            Schedule::EveryHours(step) => (3600, i64::from(*step), 24),
        };

        let mut candidate = secs - secs.rem_euclid(unit) + unit;
        while (candidate / unit).rem_euclid(cycle) % step != 0 {
            candidate += unit;
        }

        DateTime::from_timestamp(candidate, 0)
            .unwrap_or_else(|| now + chrono::Duration::seconds(unit * step))
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::EveryMinutes(step) => write!(f, "*/{} * * * *", step),
            Schedule::EveryHours(step) => write!(f, "0 */{} * * *", step),
        }
    }
}
