use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::delivery::Mailer;

const EMAILJS_API_URL: &str = "https://api.emailjs.com/api/v1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailJsConfig {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: TemplateParams<'a>,
}

#[derive(Debug, Serialize)]
struct TemplateParams<'a> {
    to_email: &'a str,
    subject: &'a str,
    message: &'a str,
}

pub struct EmailJsClient {
    client: Client,
    config: EmailJsConfig,
    base_url: String,
}

impl EmailJsClient {
    pub fn new(config: EmailJsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            config,
            base_url: EMAILJS_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Mailer for EmailJsClient {
    // Send through the EmailJS template; the template must use the
    // `to_email`, `subject` and `message` variables.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let request = SendEmailRequest {
            service_id: &self.config.service_id,
            template_id: &self.config.template_id,
            user_id: &self.config.public_key,
            template_params: TemplateParams {
                to_email: to,
                subject,
                message: body,
            },
        };

        let response = self
            .client
            .post(format!("{}/email/send", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AppError::EmailApi(format!("HTTP {}: {}", status.as_u16(), error_text)));
        }

        tracing::info!("Sent {:?} to {}", subject, to);
        Ok(())
    }
}
