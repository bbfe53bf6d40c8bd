use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ai::PromptTemplates;
use crate::error::{AppError, Result};
use crate::models::ScheduleConfig;
use crate::scheduler::timekey::validate_minute_key;
use crate::services::EmailJsConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub gemini_api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    #[serde(default = "default_report_language")]
    pub report_language: String,

    pub morning_prompt: Option<String>,
    pub evening_prompt: Option<String>,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    pub emailjs: Option<EmailJsConfig>,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("marketflow");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("marketflow.db").to_string_lossy().to_string()
}

fn default_gemini_model() -> String {
    crate::ai::GEMINI_MODEL.to_string()
}

fn default_gemini_base_url() -> String {
    crate::ai::GEMINI_API_URL.to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_tick_interval() -> u64 {
    2
}

fn default_log_capacity() -> usize {
    crate::activity_log::DEFAULT_LOG_CAPACITY
}

fn default_report_language() -> String {
    "Traditional Chinese (繁體中文)".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            gemini_api_key: None,
            gemini_model: default_gemini_model(),
            gemini_base_url: default_gemini_base_url(),
            request_timeout_secs: default_request_timeout(),
            tick_interval_secs: default_tick_interval(),
            log_capacity: default_log_capacity(),
            report_language: default_report_language(),
            morning_prompt: None,
            evening_prompt: None,
            schedule: ScheduleConfig::default(),
            emailjs: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save_to(path)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("marketflow")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config("request_timeout_secs must be positive".into()));
        }
        // Anything a minute or longer can step over a target minute.
        if !(1..60).contains(&self.tick_interval_secs) {
            return Err(AppError::Config(format!(
                "tick_interval_secs must be between 1 and 59, got {}",
                self.tick_interval_secs
            )));
        }
        if self.log_capacity == 0 {
            return Err(AppError::Config("log_capacity must be positive".into()));
        }
        validate_minute_key(&self.schedule.morning_time)?;
        validate_minute_key(&self.schedule.evening_time)?;
        Ok(())
    }

    // API key from the config file, else `GEMINI_API_KEY`, else `API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        self.gemini_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| std::env::var("API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn prompts(&self) -> PromptTemplates {
        let mut prompts = PromptTemplates::new(self.report_language.clone());
        if let Some(template) = &self.morning_prompt {
            prompts = prompts.with_morning(template.clone());
        }
        if let Some(template) = &self.evening_prompt {
            prompts = prompts.with_evening(template.clone());
        }
        prompts
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = assert_ok!(Config::load_from(&path));

        assert!(path.exists());
        assert_eq!(config.tick_interval_secs, 2);
        assert_eq!(config.schedule, ScheduleConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
gemini_api_key = "abc"
report_language = "English"

[schedule]
morning_time = "07:15"
delivery_email = "me@example.com"

[emailjs]
service_id = "service_xyz"
template_id = "template_abc"
public_key = "user_123"
"#,
        )
        .unwrap();

        let config = assert_ok!(Config::load_from(&path));

        assert_eq!(config.api_key().as_deref(), Some("abc"));
        assert_eq!(config.schedule.morning_time, "07:15");
        assert_eq!(config.schedule.evening_time, "22:00");
        assert!(config.schedule.active);
        assert_eq!(config.schedule.delivery_email(), Some("me@example.com"));
        assert_eq!(config.emailjs.unwrap().template_id, "template_abc");
        assert_eq!(config.request_timeout_secs, 120);
    }

    #[test]
    fn tick_interval_must_be_under_a_minute() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tick_interval_secs = 60\n").unwrap();

        assert_err!(Config::load_from(&path));
    }

    #[test]
    fn malformed_schedule_time_is_rejected() {
        let config = Config {
            schedule: ScheduleConfig {
                morning_time: "8:00".into(),
                ..ScheduleConfig::default()
            },
            ..Config::default()
        };

        assert!(matches!(config.validate(), Err(AppError::InvalidSchedule(_))));
    }

    #[test]
    fn saved_config_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.schedule.active = false;
        config.evening_prompt = Some("Evening at {time}".into());

        config.save_to(&path).unwrap();
        let loaded = assert_ok!(Config::load_from(&path));

        assert!(!loaded.schedule.active);
        assert_eq!(loaded.evening_prompt.as_deref(), Some("Evening at {time}"));
    }
}
