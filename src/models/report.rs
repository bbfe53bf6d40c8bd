use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportKind {
    Morning,
    Evening,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Morning => "MORNING",
            ReportKind::Evening => "EVENING",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::Morning => "Morning",
            ReportKind::Evening => "Evening",
        }
    }

    // Report to show by default at a given local hour: the morning recap
    // from 05:00 until 14:00, the evening news otherwise.
    pub fn for_hour(hour: u32) -> Self {
        if (5..14).contains(&hour) {
            ReportKind::Morning
        } else {
            ReportKind::Evening
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" | "am" => Ok(ReportKind::Morning),
            "evening" | "pm" => Ok(ReportKind::Evening),
            other => Err(format!("unknown report kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    #[default]
    Generating,
    Completed,
    Sent,
    Failed,
}

impl ReportStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportStatus::Generating)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub kind: ReportKind,
    pub created_at: DateTime<Utc>,
    pub date_key: String,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    pub status: ReportStatus,
}

impl Report {
    pub fn generating(kind: ReportKind, date_key: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            created_at,
            date_key,
            content: String::new(),
            sources: Vec::new(),
            status: ReportStatus::Generating,
        }
    }

    // Moves the report to a terminal status. Returns `false`, leaving the
    // report untouched, if it is already terminal.
    pub fn finish(&mut self, status: ReportStatus, content: String, sources: Vec<Source>) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.content = content;
        self.sources = sources;
        true
    }
}
