//! Outbound notification seam.
//!
//! The mail provider is external; the presenter only needs fire-and-forget
//! delivery with an error it can record on the query.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification failed: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, NotifyError>;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, email: &str, subject: &str, body: &str) -> Result<()>;
}

/// Logs instead of sending. Used when no mail provider is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, email: &str, subject: &str, _body: &str) -> Result<()> {
        tracing::info!("Would notify {}: {}", email, subject);
        Ok(())
    }
}
