use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Timelike};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::activity_log::ActivityLog;
use crate::ai::{GeminiClient, ReportGenerator};
use crate::cli::{render_feed, render_log, render_report, render_status, AppAction, HELP_TEXT};
use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{LogEntry, Report, ReportKind, ScheduleConfig};
use crate::orchestrator::{Orchestrator, RunOutcome};
use crate::scheduler::timekey::{day_key, validate_minute_key};
use crate::scheduler::{Scheduler, SchedulerHandle};
use crate::services::{EmailJsClient, Mailer, SimulatedMailer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Quit,
    Text(String),
}

pub struct App {
    // Context shown in the single-report view
    pub context: ReportKind,

    // Services
    orchestrator: Arc<Orchestrator>,
    repository: Repository,
    log: Arc<ActivityLog>,
    config_tx: watch::Sender<ScheduleConfig>,
    scheduler: Option<SchedulerHandle>,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;

        let api_key = config.api_key();
        if api_key.is_none() {
            tracing::warn!("No Gemini API key configured, report generation will fail");
        }
        let generator = GeminiClient::new(api_key, config.prompts(), config.request_timeout())?
            .with_model(config.gemini_model.clone())
            .with_base_url(config.gemini_base_url.clone());

        let mailer: Arc<dyn Mailer> = match &config.emailjs {
            Some(emailjs) => Arc::new(EmailJsClient::new(emailjs.clone())?),
            None => Arc::new(SimulatedMailer),
        };

        Self::from_parts(
            repository,
            Arc::new(generator),
            mailer,
            Arc::new(ActivityLog::new(config.log_capacity)),
            config.schedule.clone(),
            config.request_timeout(),
        )
        .await
    }

    // Builds the app around the given services. A schedule saved through
    // `update_config` takes precedence over `seed`.
    pub async fn from_parts(
        repository: Repository,
        generator: Arc<dyn ReportGenerator>,
        mailer: Arc<dyn Mailer>,
        log: Arc<ActivityLog>,
        seed: ScheduleConfig,
        timeout: Duration,
    ) -> Result<Self> {
        let schedule = match repository.load_schedule_config().await? {
            Some(saved) if validate_schedule(&saved).is_ok() => saved,
            Some(_) => {
                tracing::warn!("Ignoring saved schedule with invalid times");
                seed
            }
            None => seed,
        };

        let (config_tx, config_rx) = watch::channel(schedule);
        let orchestrator = Arc::new(Orchestrator::new(
            generator,
            mailer,
            repository.clone(),
            log.clone(),
            config_rx,
            timeout,
        ));

        let context = ReportKind::for_hour(Local::now().hour());
        let mut app = Self {
            context,
            orchestrator,
            repository,
            log,
            config_tx,
            scheduler: None,
        };

        app.show_saved(context).await?;
        Ok(app)
    }

    pub fn start_scheduler(&mut self, interval: Duration) {
        let scheduler = Scheduler::new(
            self.orchestrator.clone(),
            self.repository.clone(),
            self.config_tx.subscribe(),
            interval,
        );
        self.scheduler = Some(scheduler.spawn());
    }

    pub fn shutdown(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.shutdown();
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    // Inbound interface

    pub fn trigger_manual(&self, kind: ReportKind) -> JoinHandle<RunOutcome> {
        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move { orchestrator.run(kind, true).await })
    }

    pub async fn update_config(&self, config: ScheduleConfig) -> Result<()> {
        validate_schedule(&config)?;
        if config.morning_time == config.evening_time {
            tracing::warn!(
                "Morning and evening are both set to {}, only the morning report will run",
                config.morning_time
            );
        }

        self.repository.save_schedule_config(&config).await?;
        self.config_tx.send_replace(config);
        Ok(())
    }

    pub fn schedule(&self) -> ScheduleConfig {
        self.config_tx.borrow().clone()
    }

    pub async fn current_report(&self) -> Option<Report> {
        self.orchestrator.current_report().await
    }

    pub async fn report_feed(&self) -> Vec<Report> {
        self.orchestrator.report_feed().await
    }

    pub async fn log_entries(&self) -> Vec<LogEntry> {
        self.log.entries().await
    }

    pub async fn show_saved(&mut self, kind: ReportKind) -> Result<Option<Report>> {
        self.context = kind;
        let report = self
            .repository
            .get_report(kind, &day_key(&Local::now()))
            .await?;
        self.orchestrator.set_current_report(report.clone()).await;
        Ok(report)
    }

    pub async fn handle_action(&mut self, action: AppAction) -> Result<Reply> {
        let text = match action {
            AppAction::Quit => return Ok(Reply::Quit),

            AppAction::Generate(kind) => {
                if self.orchestrator.is_busy() {
                    "A report is already being generated.\n".to_string()
                } else {
                    self.context = kind;
                    self.trigger_manual(kind);
                    format!(
                        "Generating {} report. Type 'current' to check on it.\n",
                        kind.label().to_lowercase()
                    )
                }
            }

            AppAction::ShowSaved(kind) => match self.show_saved(kind).await? {
                Some(report) => render_report(&report),
                None => format!(
                    "No {} report saved for today.\n",
                    kind.label().to_lowercase()
                ),
            },

            AppAction::ShowCurrent => match self.current_report().await {
                Some(report) => render_report(&report),
                None => "No report to show.\n".to_string(),
            },

            AppAction::ShowFeed => render_feed(&self.report_feed().await),

            AppAction::ShowLog => render_log(&self.log_entries().await),

            AppAction::ShowStatus => render_status(&self.schedule()),

            AppAction::Pause => self.change_schedule(|c| c.active = false).await?,

            AppAction::Resume => self.change_schedule(|c| c.active = true).await?,

            AppAction::SetMorningTime(time) => {
                self.change_schedule(|c| c.morning_time = time).await?
            }

            AppAction::SetEveningTime(time) => {
                self.change_schedule(|c| c.evening_time = time).await?
            }

            AppAction::SetEmail(email) => self.change_schedule(|c| c.delivery_email = email).await?,

            AppAction::ShowHelp => format!("{HELP_TEXT}\n"),
        };

        Ok(Reply::Text(text))
    }

    // Applies `change` to the current schedule. Invalid schedules are
    // reported back instead of failing the command loop.
    async fn change_schedule(&self, change: impl FnOnce(&mut ScheduleConfig)) -> Result<String> {
        let mut config = self.schedule();
        change(&mut config);

        match self.update_config(config).await {
            Ok(()) => Ok(render_status(&self.schedule())),
            Err(AppError::InvalidSchedule(msg)) => Ok(format!("Rejected: {msg}\n")),
            Err(e) => Err(e),
        }
    }
}

fn validate_schedule(config: &ScheduleConfig) -> Result<()> {
    validate_minute_key(&config.morning_time)?;
    validate_minute_key(&config.evening_time)?;
    Ok(())
}
