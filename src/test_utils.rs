use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use tempfile::TempDir;
use tokio::sync::{watch, Mutex, Notify};

use crate::activity_log::ActivityLog;
use crate::ai::{GeneratedReport, GenerationError, ReportGenerator};
use crate::db::Repository;
use crate::error::AppError;
use crate::models::{ReportKind, ScheduleConfig, Source};
use crate::orchestrator::Orchestrator;
use crate::services::{Mailer, SimulatedMailer};

pub fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
    let naive = NaiveDate::from_ymd_opt(y, mo, d)
        .expect("valid date")
        .and_hms_opt(h, mi, 0)
        .expect("valid time");
    Local
        .from_local_datetime(&naive)
        .earliest()
        .expect("representable local time")
}

pub fn sample_report() -> GeneratedReport {
    GeneratedReport {
        content: "table...".to_string(),
        sources: vec![Source {
            title: "Reuters".to_string(),
            url: "https://www.reuters.com/markets".to_string(),
        }],
    }
}

pub struct ScriptedGenerator {
    result: Result<GeneratedReport, GenerationError>,
    delay: Option<Duration>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
    calls: AtomicUsize,
    kinds: Mutex<Vec<ReportKind>>,
}

impl ScriptedGenerator {
    pub fn ok(report: GeneratedReport) -> Self {
        Self::with_result(Ok(report))
    }

    pub fn err(err: GenerationError) -> Self {
        Self::with_result(Err(err))
    }

    fn with_result(result: Result<GeneratedReport, GenerationError>) -> Self {
        Self {
            result,
            delay: None,
            gate: None,
            calls: AtomicUsize::new(0),
            kinds: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    // Signals `entered` once called, then waits for `release`.
    pub fn gated(mut self, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        self.gate = Some((entered, release));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn kinds(&self) -> Vec<ReportKind> {
        self.kinds.lock().await.clone()
    }
}

#[async_trait]
impl ReportGenerator for ScriptedGenerator {
    async fn generate(&self, kind: ReportKind) -> Result<GeneratedReport, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.kinds.lock().await.push(kind);

        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}

pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> crate::error::Result<()> {
        Err(AppError::EmailApi("mail server down".to_string()))
    }
}

pub struct Harness {
    pub _dir: TempDir,
    pub repository: Repository,
    pub log: Arc<ActivityLog>,
    pub config_tx: watch::Sender<ScheduleConfig>,
    pub generator: Arc<ScriptedGenerator>,
    pub orchestrator: Arc<Orchestrator>,
}

pub async fn harness(generator: ScriptedGenerator) -> Harness {
    harness_with(generator, Arc::new(SimulatedMailer), Duration::from_secs(5)).await
}

pub async fn harness_with(
    generator: ScriptedGenerator,
    mailer: Arc<dyn Mailer>,
    timeout: Duration,
) -> Harness {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("marketflow.db");
    let repository = Repository::new(db_path.to_str().expect("utf-8 path"))
        .await
        .expect("open repository");
    let log = Arc::new(ActivityLog::default());
    let (config_tx, config_rx) = watch::channel(ScheduleConfig::default());
    let generator = Arc::new(generator);

    let orchestrator = Arc::new(Orchestrator::new(
        generator.clone(),
        mailer,
        repository.clone(),
        log.clone(),
        config_rx,
        timeout,
    ));

    Harness {
        _dir: dir,
        repository,
        log,
        config_tx,
        generator,
        orchestrator,
    }
}
