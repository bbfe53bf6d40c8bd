use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;

    // True when `send` only records the delivery instead of sending it.
    fn is_simulated(&self) -> bool {
        false
    }
}

#[derive(Debug, Default)]
pub struct SimulatedMailer;

#[async_trait]
impl Mailer for SimulatedMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        tracing::info!(
            "Simulated delivery of {:?} to {} ({} bytes)",
            subject,
            to,
            body.len()
        );
        Ok(())
    }

    fn is_simulated(&self) -> bool {
        true
    }
}
