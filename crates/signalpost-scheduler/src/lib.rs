//! # SignalPost Scheduler
//!
//! Recurring daily broadcast jobs with business-day awareness.
//!
//! ## Architecture
//! ```text
//! SchedulerEngine (tokio interval)
//!   ├── closing job    16:05 — guard: list posted today
//!   ├── night notice   22:45 — guard: business day
//!   └── motivational   06:00 08:00 12:00 16:00 18:00 21:00 22:00
//!                             — guard: business day, message bound by index
//!   on fire → claim (job, day) slot in the store → Transport::send
//! ```
//!
//! The engine is an injected instance owned by the composition root, not a
//! global. `tick_at` takes the wall-clock time explicitly so tests drive a
//! virtual clock; the background loop feeds it the real one. Firing slots
//! are persisted, so a restart inside the trigger minute cannot double-fire.

pub mod engine;
pub mod jobs;

pub use engine::{SchedulerEngine, spawn_scheduler};
pub use jobs::{BroadcastJob, DailyTime, JobGuard, default_jobs};
