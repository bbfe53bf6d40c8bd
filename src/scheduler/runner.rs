use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::db::Repository;
use crate::error::Result;
use crate::models::{ReportKind, ScheduleConfig};
use crate::orchestrator::Orchestrator;

use super::timekey::{minute_key, run_key};

pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Inactive,
    // A generation is already in flight.
    Busy,
    // This minute already fired.
    AlreadyRan,
    Idle,
    Fired(ReportKind),
}

pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    repository: Repository,
    config: watch::Receiver<ScheduleConfig>,
    interval: Duration,
    clock: Clock,
}

impl Scheduler {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        repository: Repository,
        config: watch::Receiver<ScheduleConfig>,
        interval: Duration,
    ) -> Self {
        Self {
            orchestrator,
            repository,
            config,
            interval,
            clock: Arc::new(Local::now),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub async fn tick(&self) -> Result<TickOutcome> {
        let now = (self.clock)();
        self.tick_at(now).await
    }

    pub async fn tick_at(&self, now: DateTime<Local>) -> Result<TickOutcome> {
        let config = self.config.borrow().clone();
        if !config.active {
            return Ok(TickOutcome::Inactive);
        }

        // Morning is checked first, so it wins when both times are equal.
        let minute = minute_key(&now);
        let kind = if minute == config.morning_time {
            ReportKind::Morning
        } else if minute == config.evening_time {
            ReportKind::Evening
        } else {
            return Ok(TickOutcome::Idle);
        };

        // The slot is held from here on, so nothing can start a run
        // between recording the run key and generating.
        let Some(slot) = self.orchestrator.try_begin() else {
            return Ok(TickOutcome::Busy);
        };

        let run_key = run_key(&now);
        if self.repository.last_run_key().await?.as_deref() == Some(run_key.as_str()) {
            return Ok(TickOutcome::AlreadyRan);
        }

        self.repository.set_last_run_key(&run_key).await?;
        info!("Scheduled {} report due ({})", kind, run_key);

        self.orchestrator.run_in(slot, kind, false, now).await;
        Ok(TickOutcome::Fired(kind))
    }

    pub fn spawn(self) -> SchedulerHandle {
        SchedulerHandle {
            handle: tokio::spawn(self.run_loop()),
        }
    }

    async fn run_loop(self) {
        let mut config = self.config.clone();

        loop {
            let current = config.borrow_and_update().clone();
            if !current.active {
                debug!("scheduler paused");
                if config.changed().await.is_err() {
                    return;
                }
                continue;
            }

            info!(
                "scheduler armed: morning {} / evening {}, every {:?}",
                current.morning_time, current.evening_time, self.interval
            );
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match self.tick().await {
                            Ok(outcome) => debug!("scheduler tick: {:?}", outcome),
                            Err(e) => warn!("scheduler tick failed: {}", e),
                        }
                    }
                    changed = config.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        // Re-arm with the new settings.
                        break;
                    }
                }
            }
        }
    }
}

pub struct SchedulerHandle {
    handle: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn shutdown(&self) {
        self.handle.abort();
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
