use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ReportKind, Source};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReport {
    pub content: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("credential error: {0}")]
    Credential(String),

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0}s")]
    Timeout(u64),
}

impl GenerationError {
    // Timeout after `limit`, rounded up to whole seconds.
    pub fn timeout(limit: Duration) -> Self {
        let secs = limit.as_secs() + u64::from(limit.subsec_nanos() > 0);
        GenerationError::Timeout(secs)
    }

    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Credential(detail) => {
                format!("API key is missing, invalid or expired ({detail}).")
            }
            GenerationError::RateLimit(_) => {
                "The service is busy (429). Please try again later.".to_string()
            }
            GenerationError::Transport(detail) => format!("Report generation failed: {detail}"),
            GenerationError::Timeout(1) => {
                "Report generation timed out after 1 second.".to_string()
            }
            GenerationError::Timeout(secs) => {
                format!("Report generation timed out after {secs} seconds.")
            }
        }
    }
}

#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(&self, kind: ReportKind) -> Result<GeneratedReport, GenerationError>;
}
