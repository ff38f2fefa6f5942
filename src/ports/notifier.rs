//! Notifier port - outbound push notification transport.

use async_trait::async_trait;
use thiserror::Error;

/// Delivers one notification to one topic.
///
/// Implementations must not retry; the dispatcher reports failures instead.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, topic: &str, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// The push service answered with a non-success status.
    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Request never got an answer.
    #[error("network error: {0}")]
    Network(String),

    #[error("invalid topic '{0}'")]
    InvalidTopic(String),
}
