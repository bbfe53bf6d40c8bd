use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_morning_time")]
    pub morning_time: String,

    #[serde(default = "default_evening_time")]
    pub evening_time: String,

    #[serde(default)]
    pub delivery_email: Option<String>,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_morning_time() -> String {
    "08:00".to_string()
}

fn default_evening_time() -> String {
    "22:00".to_string()
}

fn default_active() -> bool {
    true
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            morning_time: default_morning_time(),
            evening_time: default_evening_time(),
            delivery_email: None,
            active: default_active(),
        }
    }
}

impl ScheduleConfig {
    pub fn delivery_email(&self) -> Option<&str> {
        self.delivery_email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}
