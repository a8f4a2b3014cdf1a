//! Outbound notification seam.
//!
//! Actual delivery (email or otherwise) lives behind the trait; the shipped
//! implementation records the delivery in the logs. Handlers queue
//! deliveries through the task tracker, never inline.

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(
        &self,
        recipient: &str,
        template: &str,
        payload: Value,
    ) -> Result<(), NotifyError>;
}

/// Logs every delivery instead of sending it anywhere.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn deliver(
        &self,
        recipient: &str,
        template: &str,
        payload: Value,
    ) -> Result<(), NotifyError> {
        tracing::info!(recipient, template, %payload, "notification delivered");
        Ok(())
    }
}
