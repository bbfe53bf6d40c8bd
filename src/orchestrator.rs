use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tokio::sync::{watch, Mutex, MutexGuard, RwLock};

use crate::activity_log::ActivityLog;
use crate::ai::{GeneratedReport, GenerationError, ReportGenerator};
use crate::db::Repository;
use crate::models::{Report, ReportKind, ReportStatus, ScheduleConfig};
use crate::scheduler::timekey::day_key;
use crate::services::Mailer;

// Newest reports kept in the session feed
const FEED_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    // Another generation was already in flight.
    Skipped,
    Completed(Report),
    Failed(Report),
}

#[derive(Debug, Default)]
struct ReportBoard {
    current: Option<Report>,
    feed: Vec<Report>,
}

impl ReportBoard {
    fn surface(&mut self, report: Report) {
        self.feed.insert(0, report.clone());
        self.feed.truncate(FEED_CAPACITY);
        self.current = Some(report);
    }

    fn replace(&mut self, report: &Report) {
        if let Some(slot) = self.feed.iter_mut().find(|r| r.id == report.id) {
            *slot = report.clone();
        }
        if let Some(current) = self.current.as_mut().filter(|r| r.id == report.id) {
            *current = report.clone();
        }
    }
}

pub struct RunSlot<'a> {
    _guard: MutexGuard<'a, ()>,
}

pub struct Orchestrator {
    generator: Arc<dyn ReportGenerator>,
    mailer: Arc<dyn Mailer>,
    repository: Repository,
    log: Arc<ActivityLog>,
    schedule: watch::Receiver<ScheduleConfig>,
    timeout: Duration,
    in_flight: Mutex<()>,
    board: RwLock<ReportBoard>,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn ReportGenerator>,
        mailer: Arc<dyn Mailer>,
        repository: Repository,
        log: Arc<ActivityLog>,
        schedule: watch::Receiver<ScheduleConfig>,
        timeout: Duration,
    ) -> Self {
        Self {
            generator,
            mailer,
            repository,
            log,
            schedule,
            timeout,
            in_flight: Mutex::new(()),
            board: RwLock::new(ReportBoard::default()),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    pub fn try_begin(&self) -> Option<RunSlot<'_>> {
        self.in_flight
            .try_lock()
            .ok()
            .map(|guard| RunSlot { _guard: guard })
    }

    pub async fn run(&self, kind: ReportKind, manual: bool) -> RunOutcome {
        self.run_at(kind, manual, Local::now()).await
    }

    pub async fn run_at(&self, kind: ReportKind, manual: bool, now: DateTime<Local>) -> RunOutcome {
        let Some(slot) = self.try_begin() else {
            tracing::debug!("Generation already in flight, ignoring {} request", kind);
            return RunOutcome::Skipped;
        };
        self.run_in(slot, kind, manual, now).await
    }

    // The slot is released when the run ends.
    pub async fn run_in(
        &self,
        _slot: RunSlot<'_>,
        kind: ReportKind,
        manual: bool,
        now: DateTime<Local>,
    ) -> RunOutcome {
        let report = Report::generating(kind, day_key(&now), now.with_timezone(&Utc));
        self.board.write().await.surface(report.clone());

        let trigger = if manual { "manual" } else { "scheduled" };
        self.log
            .info(format!(
                "Starting {} {} report generation",
                trigger,
                kind.label().to_lowercase()
            ))
            .await;

        let result = match tokio::time::timeout(self.timeout, self.generator.generate(kind)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::timeout(self.timeout)),
        };

        match result {
            Ok(generated) => self.complete(report, generated, manual).await,
            Err(err) => self.fail(report, err).await,
        }
    }

    async fn complete(&self, mut report: Report, generated: GeneratedReport, manual: bool) -> RunOutcome {
        let kind = report.kind;
        let label = kind.label();

        // The watch borrow must not be held across an await.
        let email = self.schedule.borrow().delivery_email().map(str::to_string);

        let delivery = match &email {
            Some(to) => {
                let subject = format!("MarketFlow {} Briefing {}", label, report.date_key);
                let body = delivery_body(&generated);
                Some(self.mailer.send(to, &subject, &body).await)
            }
            None => None,
        };

        let status = match delivery {
            Some(Ok(())) => ReportStatus::Sent,
            _ => ReportStatus::Completed,
        };
        let source_count = generated.sources.len();
        report.finish(status, generated.content, generated.sources);
        self.board.write().await.replace(&report);

        if let Err(e) = self
            .repository
            .put_report(kind, &report.date_key, &report)
            .await
        {
            self.log
                .error(format!("Could not save {} report: {}", label.to_lowercase(), e))
                .await;
        }

        self.log
            .success(format!(
                "{} report generated with {} source(s)",
                label, source_count
            ))
            .await;

        match (email, delivery) {
            (Some(to), Some(Ok(()))) => {
                let suffix = if self.mailer.is_simulated() { " (simulated)" } else { "" };
                self.log
                    .info(format!("{} report delivered to {}{}", label, to, suffix))
                    .await;
            }
            (Some(to), Some(Err(e))) => {
                self.log
                    .error(format!("Delivery of {} report to {} failed: {}", label.to_lowercase(), to, e))
                    .await;
            }
            _ if !manual => {
                self.log
                    .info(format!(
                        "No delivery email configured, skipped delivery of {} report",
                        label.to_lowercase()
                    ))
                    .await;
            }
            _ => {}
        }

        RunOutcome::Completed(report)
    }

    // Failed reports stay in memory only, so a stored report for the same
    // key survives.
    async fn fail(&self, mut report: Report, err: GenerationError) -> RunOutcome {
        let message = err.user_message();
        report.finish(ReportStatus::Failed, message.clone(), Vec::new());
        self.board.write().await.replace(&report);

        tracing::debug!("{} generation error: {}", report.kind, err);
        self.log
            .error(format!("{} report generation failed: {}", report.kind.label(), message))
            .await;

        RunOutcome::Failed(report)
    }

    pub async fn current_report(&self) -> Option<Report> {
        self.board.read().await.current.clone()
    }

    pub async fn set_current_report(&self, report: Option<Report>) {
        self.board.write().await.current = report;
    }

    pub async fn report_feed(&self) -> Vec<Report> {
        self.board.read().await.feed.clone()
    }
}

fn delivery_body(generated: &GeneratedReport) -> String {
    let mut body = generated.content.clone();
    if !generated.sources.is_empty() {
        body.push_str("\n\nSources:\n");
        for (i, source) in generated.sources.iter().enumerate() {
            body.push_str(&format!("{}. {} - {}\n", i + 1, source.title, source.url));
        }
    }
    body
}
