//! NotificationDispatcher - fans a finished cycle out to its registered users.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::domain::cycle::Cycle;
use crate::domain::foundation::CycleId;
use crate::domain::user::UserName;
use crate::ports::{NotifyError, Notifier};

/// Default notification body.
pub const DEFAULT_MESSAGE: &str = "Your laundry is ready!";

/// How notifications are addressed and worded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSettings {
    /// Prefix of every per-user topic.
    pub base_topic: String,
    /// Body sent with every notification.
    pub message: String,
}

impl NotificationSettings {
    pub fn new(base_topic: impl Into<String>) -> Self {
        Self {
            base_topic: base_topic.into(),
            message: DEFAULT_MESSAGE.to_string(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// `<base>-<sanitized name>`.
    pub fn topic_for(&self, recipient: &UserName) -> String {
        format!("{}-{}", self.base_topic, recipient.topic_slug())
    }

    /// `"Washer finished"` / `"Dryer finished"`.
    pub fn title_for(&self, cycle: &Cycle) -> String {
        format!("{} finished", cycle.machine_type().display_name())
    }
}

/// A single failed send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub recipient: UserName,
    pub topic: String,
    pub error: NotifyError,
}

/// What happened to every recipient of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub cycle_id: CycleId,
    pub delivered: Vec<UserName>,
    pub failures: Vec<DeliveryFailure>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failures.len()
    }

    /// True when every recipient was reached.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sends one notification per recipient of a finished cycle.
///
/// Recipients are read by the caller in the transaction that closes the
/// cycle; the dispatcher itself never touches the store. Sends run
/// concurrently and never abort each other. Nothing is retried.
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    settings: NotificationSettings,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, settings: NotificationSettings) -> Self {
        Self { notifier, settings }
    }

    pub fn settings(&self) -> &NotificationSettings {
        &self.settings
    }

    /// Notifies each of `recipients` that `cycle` finished.
    ///
    /// Transport failures land in [`DispatchReport::failures`].
    pub async fn dispatch(&self, cycle: &Cycle, recipients: Vec<UserName>) -> DispatchReport {
        let title = self.settings.title_for(cycle);
        let sends = recipients.into_iter().map(|recipient| {
            let topic = self.settings.topic_for(&recipient);
            let title = title.as_str();
            async move {
                let result = self
                    .notifier
                    .notify(&topic, title, &self.settings.message)
                    .await;
                (recipient, topic, result)
            }
        });

        let mut report = DispatchReport {
            cycle_id: cycle.id(),
            delivered: Vec::new(),
            failures: Vec::new(),
        };

        for (recipient, topic, result) in join_all(sends).await {
            match result {
                Ok(()) => report.delivered.push(recipient),
                Err(error) => {
                    warn!(
                        cycle_id = %cycle.id(),
                        machine_type = %cycle.machine_type(),
                        recipient = %recipient,
                        topic = %topic,
                        error = %error,
                        "Notification delivery failed"
                    );
                    report.failures.push(DeliveryFailure {
                        recipient,
                        topic,
                        error,
                    });
                }
            }
        }

        info!(
            cycle_id = %cycle.id(),
            machine_type = %cycle.machine_type(),
            delivered = report.delivered.len(),
            failed = report.failures.len(),
            "Dispatched cycle notifications"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{MachineType, Timestamp};
    use async_trait::async_trait;
    use std::sync::Mutex;

    // ─────────────────────────────────────────────────────────────────────
    // Mock implementations
    // ─────────────────────────────────────────────────────────────────────

    #[derive(Default)]
    struct MockNotifier {
        sent: Mutex<Vec<(String, String, String)>>,
        reject_topics: Vec<String>,
    }

    impl MockNotifier {
        fn rejecting(topic: &str) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                reject_topics: vec![topic.to_string()],
            }
        }

        fn sent(&self) -> Vec<(String, String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        async fn notify(&self, topic: &str, title: &str, body: &str) -> Result<(), NotifyError> {
            if self.reject_topics.iter().any(|t| t == topic) {
                return Err(NotifyError::Rejected {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((topic.to_string(), title.to_string(), body.to_string()));
            Ok(())
        }
    }

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    fn finished_dryer_cycle() -> Cycle {
        Cycle::reconstitute(
            CycleId::from_raw(7),
            MachineType::Dryer,
            ts("2024-01-01T10:00:00Z"),
            Some(ts("2024-01-01T11:00:00Z")),
        )
    }

    fn names(names: &[&str]) -> Vec<UserName> {
        names.iter().map(|n| UserName::new(*n).unwrap()).collect()
    }

    #[test]
    fn topic_replaces_spaces_in_name() {
        let settings = NotificationSettings::new("laundry");
        let name = UserName::new("Mary Ann").unwrap();
        assert_eq!(settings.topic_for(&name), "laundry-Mary_Ann");
    }

    #[tokio::test]
    async fn notifies_each_recipient_once() {
        let notifier = Arc::new(MockNotifier::default());
        let dispatcher =
            NotificationDispatcher::new(notifier.clone(), NotificationSettings::new("laundry"));

        let report = dispatcher
            .dispatch(&finished_dryer_cycle(), names(&["Bob", "Carol"]))
            .await;

        assert!(report.is_complete());
        assert_eq!(report.attempted(), 2);
        assert_eq!(report.cycle_id, CycleId::from_raw(7));
        let mut sent = notifier.sent();
        sent.sort();
        assert_eq!(
            sent,
            vec![
                (
                    "laundry-Bob".to_string(),
                    "Dryer finished".to_string(),
                    DEFAULT_MESSAGE.to_string()
                ),
                (
                    "laundry-Carol".to_string(),
                    "Dryer finished".to_string(),
                    DEFAULT_MESSAGE.to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn failed_send_does_not_stop_others() {
        let notifier = Arc::new(MockNotifier::rejecting("laundry-Carol"));
        let dispatcher =
            NotificationDispatcher::new(notifier.clone(), NotificationSettings::new("laundry"));

        let report = dispatcher
            .dispatch(&finished_dryer_cycle(), names(&["Bob", "Carol", "Dave"]))
            .await;

        assert_eq!(report.delivered.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].recipient.as_str(), "Carol");
        assert_eq!(report.failures[0].topic, "laundry-Carol");
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn no_recipients_sends_nothing() {
        let notifier = Arc::new(MockNotifier::default());
        let dispatcher = NotificationDispatcher::new(
            notifier.clone(),
            NotificationSettings::new("laundry").with_message("Come get it"),
        );

        let report = dispatcher.dispatch(&finished_dryer_cycle(), Vec::new()).await;

        assert_eq!(report.attempted(), 0);
        assert!(notifier.sent().is_empty());
    }
}
