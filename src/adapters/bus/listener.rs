//! SignalListener - the single consumer of the signal queue.
//!
//! Decodes each bus message and hands it to the correlator. Bad messages
//! and failed handling are logged and skipped; the loop only ends on
//! shutdown or when every producer is gone.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::application::handlers::cycle::{CorrelationOutcome, CycleCorrelator};
use crate::domain::cycle::{MachineSignal, SignalParseError};
use crate::domain::foundation::DomainError;

use super::queue::BusMessage;

/// Why a single message was not applied.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("malformed message: {0}")]
    Parse(#[from] SignalParseError),

    #[error("handling failed: {0}")]
    Handling(#[from] DomainError),
}

/// Counters returned when the listener stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub applied: u64,
    pub malformed: u64,
    pub failed: u64,
}

/// Feeds queued bus messages through the correlator one at a time.
pub struct SignalListener {
    correlator: Arc<CycleCorrelator>,
}

impl SignalListener {
    pub fn new(correlator: Arc<CycleCorrelator>) -> Self {
        Self { correlator }
    }

    /// Consumes the queue until shutdown or until all senders are dropped.
    ///
    /// A message already taken off the queue is always finished before the
    /// shutdown flag is looked at again.
    pub async fn run(
        &self,
        mut receiver: mpsc::Receiver<BusMessage>,
        mut shutdown: watch::Receiver<bool>,
    ) -> ListenerStats {
        let mut stats = ListenerStats::default();
        info!("Signal listener started");

        loop {
            if *shutdown.borrow() {
                info!("Signal listener stopping on shutdown");
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!("Shutdown channel closed, stopping signal listener");
                        break;
                    }
                }

                message = receiver.recv() => {
                    let Some(message) = message else {
                        info!("Signal queue closed, stopping signal listener");
                        break;
                    };
                    match self.process(&message).await {
                        Ok(_) => stats.applied += 1,
                        Err(ListenerError::Parse(err)) => {
                            warn!(
                                topic = %message.topic,
                                payload = %message.payload,
                                error = %err,
                                "Dropping malformed bus message"
                            );
                            stats.malformed += 1;
                        }
                        Err(ListenerError::Handling(err)) => {
                            error!(
                                topic = %message.topic,
                                payload = %message.payload,
                                error = %err,
                                "Failed to apply bus message"
                            );
                            stats.failed += 1;
                        }
                    }
                }
            }
        }

        info!(
            applied = stats.applied,
            malformed = stats.malformed,
            failed = stats.failed,
            "Signal listener stopped"
        );
        stats
    }

    /// Decodes and applies one message.
    pub async fn process(&self, message: &BusMessage) -> Result<CorrelationOutcome, ListenerError> {
        let signal = MachineSignal::parse(&message.topic, &message.payload)?;
        debug!(
            machine_type = %signal.machine_type,
            kind = %signal.kind,
            at = %signal.at,
            "Received machine signal"
        );
        Ok(self.correlator.handle(signal).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::bus::signal_queue;
    use crate::adapters::memory::InMemoryLaundryStore;
    use crate::application::handlers::cycle::{NotificationDispatcher, NotificationSettings};
    use crate::domain::foundation::MachineType;
    use crate::ports::{LaundryStore, NotifyError, Notifier};
    use async_trait::async_trait;
    use std::time::Duration;

    struct SilentNotifier;

    #[async_trait]
    impl Notifier for SilentNotifier {
        async fn notify(&self, _: &str, _: &str, _: &str) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    fn listener(store: &InMemoryLaundryStore) -> SignalListener {
        let shared: Arc<dyn LaundryStore> = Arc::new(store.clone());
        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::new(SilentNotifier),
            NotificationSettings::new("laundry"),
        ));
        SignalListener::new(Arc::new(CycleCorrelator::new(shared, dispatcher)))
    }

    #[tokio::test]
    async fn malformed_messages_do_not_stop_the_loop() {
        let store = InMemoryLaundryStore::new();
        let listener = listener(&store);
        let (tx, rx) = signal_queue(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tx.send(BusMessage::new("home/laundry/washer", "started_at"))
            .await
            .unwrap();
        tx.send(BusMessage::new("home/laundry/toaster", "started_at=2024-01-01T10:00:00Z"))
            .await
            .unwrap();
        tx.send(BusMessage::new("home/laundry/washer", "started_at=2024-01-01T10:00:00Z"))
            .await
            .unwrap();
        drop(tx);

        let stats = listener.run(rx, shutdown_rx).await;

        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.applied, 1);
        assert_eq!(store.open_cycle_count(MachineType::Washer).await, 1);
    }

    #[tokio::test]
    async fn store_failures_are_counted_and_skipped() {
        let store = InMemoryLaundryStore::new();
        store.set_fail_commits(true);
        let listener = listener(&store);
        let (tx, rx) = signal_queue(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tx.send(BusMessage::new("home/laundry/dryer", "started_at=2024-01-01T10:00:00Z"))
            .await
            .unwrap();
        drop(tx);

        let stats = listener.run(rx, shutdown_rx).await;

        assert_eq!(stats.failed, 1);
        assert!(store.cycles().await.is_empty());
    }

    #[tokio::test]
    async fn stops_on_shutdown_signal() {
        let store = InMemoryLaundryStore::new();
        let listener = listener(&store);
        let (_tx, rx) = signal_queue(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { listener.run(rx, shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.send(true).unwrap();

        let stats = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("listener did not stop")
            .unwrap();
        assert_eq!(stats, ListenerStats::default());
    }
}
