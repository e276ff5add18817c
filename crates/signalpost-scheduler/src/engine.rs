//! Scheduler engine — the loop that checks and fires broadcast jobs.
//!
//! Each tick walks the job table once: trigger-minute match, guard, then a
//! persisted (job, day) claim before dispatch. Claiming before sending keeps
//! delivery at-most-once — a transport failure is logged and the slot stays
//! consumed for the day.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime, Utc};

use signalpost_core::{BusinessCalendar, Transport};
use signalpost_store::SignalStore;

use crate::jobs::{BroadcastJob, JobGuard};

/// The scheduler engine. Owned by the composition root and shared with the
/// background loop; the job table is fixed after registration.
pub struct SchedulerEngine {
    jobs: Vec<BroadcastJob>,
    store: Arc<SignalStore>,
    calendar: BusinessCalendar,
    transport: Arc<dyn Transport>,
    channel_id: i64,
}

impl SchedulerEngine {
    pub fn new(
        store: Arc<SignalStore>,
        calendar: BusinessCalendar,
        transport: Arc<dyn Transport>,
        channel_id: i64,
    ) -> Self {
        Self {
            jobs: Vec::new(),
            store,
            calendar,
            transport,
            channel_id,
        }
    }

    /// Register a job. All registration happens before the loop starts.
    pub fn register(&mut self, job: BroadcastJob) {
        tracing::info!("📅 Job registered: '{}' at {}", job.id, job.at);
        self.jobs.push(job);
    }

    pub fn register_all(&mut self, jobs: impl IntoIterator<Item = BroadcastJob>) {
        for job in jobs {
            self.register(job);
        }
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Evaluate one tick at the given wall-clock time. Returns the ids of
    /// the jobs that broadcast. Tests call this directly with virtual times;
    /// the background loop feeds it `Local::now()`.
    pub async fn tick_at(&self, now: NaiveDateTime) -> Vec<String> {
        let today = now.date();
        let mut fired = Vec::new();

        for job in &self.jobs {
            if !job.enabled || !job.at.matches(now.time()) {
                continue;
            }

            let guard_ok = match job.guard {
                JobGuard::Always => true,
                JobGuard::BusinessDay => self.calendar.is_business_day(today),
                JobGuard::PostedToday => match self.store.is_posted(today) {
                    Ok(posted) => posted,
                    Err(e) => {
                        tracing::error!("⚠️ Guard check failed for '{}': {e}", job.id);
                        continue;
                    }
                },
            };
            if !guard_ok {
                tracing::debug!("Job '{}' skipped: guard not satisfied", job.id);
                continue;
            }

            // One firing per trigger per day, restart-safe.
            match self.store.claim_job_firing(&job.id, today, Utc::now()) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!("Job '{}' already fired on {today}", job.id);
                    continue;
                }
                Err(e) => {
                    tracing::error!("⚠️ Could not claim firing slot for '{}': {e}", job.id);
                    continue;
                }
            }

            // Transport failure is isolated: log, no retry, next job runs.
            match self.transport.send(self.channel_id, &job.message).await {
                Ok(()) => {
                    tracing::info!("📣 Job '{}' broadcast at {}", job.id, job.at);
                    fired.push(job.id.clone());
                }
                Err(e) => {
                    tracing::error!("⚠️ Broadcast failed for '{}': {e}", job.id);
                }
            }
        }

        fired
    }
}

/// Spawn the scheduler loop as a background tokio task. The returned handle
/// stops the loop when aborted; jobs never block inbound command handling.
pub fn spawn_scheduler(
    engine: Arc<SchedulerEngine>,
    check_interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(
            "⏰ Scheduler started: {} jobs, check every {check_interval_secs}s",
            engine.job_count()
        );
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(check_interval_secs));
        loop {
            interval.tick().await;
            engine.tick_at(Local::now().naive_local()).await;
        }
    })
}
