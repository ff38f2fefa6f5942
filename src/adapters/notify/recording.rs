//! Notifier that records instead of sending.
//!
//! Used by tests and by `ntfy.dry_run` to see what would have been sent.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::ports::{NotifyError, Notifier};

/// One captured notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub topic: String,
    pub title: String,
    pub body: String,
}

/// In-process notifier capturing every call.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
    failing_topics: Vec<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects sends to the given topics.
    pub fn failing_for(topics: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing_topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, topic: &str) -> Vec<SentNotification> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|n| n.topic == topic)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, topic: &str, title: &str, body: &str) -> Result<(), NotifyError> {
        if self.failing_topics.iter().any(|t| t == topic) {
            return Err(NotifyError::Rejected {
                status: 503,
                body: "recording notifier configured to fail".to_string(),
            });
        }
        info!(topic = %topic, title = %title, "Recorded notification");
        self.sent.lock().await.push(SentNotification {
            topic: topic.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
