//! Job definitions — the data model for scheduled broadcasts.
//!
//! Jobs are declarative (time, guard, message) tuples registered at startup.
//! The motivational slots are a fixed table of (time, message-index) pairs,
//! so every slot carries its own message binding.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use signalpost_core::messages;

/// A fixed hour:minute trigger, daily recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTime {
    pub hour: u32,
    pub minute: u32,
}

impl DailyTime {
    pub const fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    /// True when `t` falls inside this trigger's minute window.
    pub fn matches(&self, t: NaiveTime) -> bool {
        t.hour() == self.hour && t.minute() == self.minute
    }
}

impl std::fmt::Display for DailyTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Predicate evaluated at firing time; the broadcast only runs when it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobGuard {
    /// Fire unconditionally.
    Always,
    /// Fire only on weekdays that are not configured holidays.
    BusinessDay,
    /// Fire only when today's list was published (daily-post marker).
    PostedToday,
}

/// A scheduled broadcast.
#[derive(Debug, Clone)]
pub struct BroadcastJob {
    /// Stable id — also the key of the persisted firing slot.
    pub id: String,
    pub at: DailyTime,
    pub guard: JobGuard,
    /// The fixed text this job broadcasts.
    pub message: String,
    pub enabled: bool,
}

impl BroadcastJob {
    pub fn new(id: &str, at: DailyTime, guard: JobGuard, message: &str) -> Self {
        Self {
            id: id.to_string(),
            at,
            guard,
            message: message.to_string(),
            enabled: true,
        }
    }
}

/// Trigger time of the end-of-list closing broadcast.
pub const CLOSING_TIME: DailyTime = DailyTime::new(16, 5);

/// Trigger time of the night pre-list notice.
pub const NIGHT_NOTICE_TIME: DailyTime = DailyTime::new(22, 45);

/// Motivational slots: (hour, minute, message index). Seven slots cycle
/// through the five-message set.
pub const MOTIVATIONAL_SLOTS: [(u32, u32, usize); 7] = [
    (6, 0, 0),
    (8, 0, 1),
    (12, 0, 2),
    (16, 0, 3),
    (18, 0, 4),
    (21, 0, 0),
    (22, 0, 1),
];

/// The full job table registered at startup.
pub fn default_jobs() -> Vec<BroadcastJob> {
    let mut jobs = vec![
        BroadcastJob::new(
            "closing",
            CLOSING_TIME,
            JobGuard::PostedToday,
            messages::CLOSING_MESSAGE,
        ),
        BroadcastJob::new(
            "night-notice",
            NIGHT_NOTICE_TIME,
            JobGuard::BusinessDay,
            messages::NIGHT_PRELIST_MESSAGE,
        ),
    ];
    for (hour, minute, index) in MOTIVATIONAL_SLOTS {
        jobs.push(BroadcastJob::new(
            &format!("motivational-{hour:02}{minute:02}"),
            DailyTime::new(hour, minute),
            JobGuard::BusinessDay,
            messages::MOTIVATIONAL_MESSAGES[index % messages::MOTIVATIONAL_MESSAGES.len()],
        ));
    }
    jobs
}
