//! Process wiring and lifecycle.
//!
//! Startup order: store → notifier → MQTT bridge → listener → HTTP server.
//! Anything failing before the listener starts aborts the process. A single
//! `watch` flag stops the bridge, the listener and the HTTP server. SIGINT
//! and SIGTERM set it, and so does the HTTP server stopping on its own.

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::adapters::bus::{signal_queue, BusError, ListenerStats, MqttBridge, SignalListener};
use crate::adapters::http::{api_router, LaundryAppState};
use crate::adapters::notify::{NtfyNotifier, RecordingNotifier};
use crate::adapters::postgres::PostgresLaundryStore;
use crate::application::handlers::cycle::{CycleCorrelator, NotificationDispatcher};
use crate::config::{AppConfig, NtfySection, ValidationError};
use crate::domain::foundation::DomainError;
use crate::ports::{LaundryStore, NotifyError, Notifier};

/// Fatal startup and serving failures.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("failed to connect to database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store initialisation failed: {0}")]
    Store(#[from] DomainError),

    #[error("failed to build notifier: {0}")]
    Notifier(#[from] NotifyError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Server(std::io::Error),
}

/// Picks the notification transport.
pub fn build_notifier(ntfy: &NtfySection) -> Result<Arc<dyn Notifier>, BootError> {
    if ntfy.dry_run {
        warn!("ntfy dry run enabled, notifications will only be logged");
        return Ok(Arc::new(RecordingNotifier::new()));
    }
    Ok(Arc::new(NtfyNotifier::new(ntfy.to_transport())?))
}

/// Correlator over the given store, notifying through `notifier`.
pub fn build_correlator(
    store: Arc<dyn LaundryStore>,
    notifier: Arc<dyn Notifier>,
    ntfy: &NtfySection,
) -> Arc<CycleCorrelator> {
    let dispatcher = Arc::new(NotificationDispatcher::new(
        notifier,
        ntfy.to_notification_settings(),
    ));
    Arc::new(CycleCorrelator::new(store, dispatcher))
}

/// Runs the service until a shutdown signal arrives.
pub async fn run(config: AppConfig) -> Result<(), BootError> {
    config.validate()?;

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    let postgres = PostgresLaundryStore::new(pool);
    if config.database.run_migrations {
        postgres.migrate().await?;
        info!("Database migrations applied");
    }
    let store: Arc<dyn LaundryStore> = Arc::new(postgres);

    let notifier = build_notifier(&config.ntfy)?;
    let correlator = build_correlator(store.clone(), notifier, &config.ntfy);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (sender, receiver) = signal_queue(config.mqtt.queue_capacity);

    let bridge = MqttBridge::connect(&config.mqtt.to_settings(), sender).await?;
    let bridge_task = tokio::spawn(bridge.run(shutdown_rx.clone()));

    let listener = SignalListener::new(correlator);
    let listener_shutdown = shutdown_rx.clone();
    let listener_task =
        tokio::spawn(async move { listener.run(receiver, listener_shutdown).await });

    let address = config.server.socket_addr()?;
    let tcp = TcpListener::bind(address)
        .await
        .map_err(|source| BootError::Bind {
            address: address.to_string(),
            source,
        })?;

    let state = LaundryAppState {
        store,
        search_page_size: config.server.search_page_size,
    };
    let router = api_router(state, config.server.request_timeout());

    tokio::spawn(forward_os_signals(shutdown_tx.clone()));
    info!(address = %address, "HTTP server listening");

    let served = axum::serve(tcp, router)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
        .await
        .map_err(BootError::Server);
    if let Err(err) = &served {
        error!(error = %err, "HTTP server stopped unexpectedly");
    }

    stop_background_tasks(&shutdown_tx, bridge_task, listener_task).await;

    served
}

/// Raises the shutdown flag and waits for the bridge and the listener.
///
/// Runs however the HTTP server stopped, so a serve error cannot leave the
/// background tasks waiting on a flag nobody will set.
async fn stop_background_tasks(
    shutdown: &watch::Sender<bool>,
    bridge_task: JoinHandle<()>,
    listener_task: JoinHandle<ListenerStats>,
) {
    let _ = shutdown.send(true);

    if let Err(err) = bridge_task.await {
        error!(error = %err, "MQTT bridge task panicked");
    }
    match listener_task.await {
        Ok(stats) => info!(
            applied = stats.applied,
            malformed = stats.malformed,
            failed = stats.failed,
            "Shutdown complete"
        ),
        Err(err) => error!(error = %err, "Signal listener task panicked"),
    }
}

/// Resolves once the flag is set or every sender is gone.
pub async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Flips the shutdown flag on SIGINT or SIGTERM.
async fn forward_os_signals(shutdown: watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }

    let _ = shutdown.send(true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryLaundryStore;
    use crate::application::handlers::registration::{
        RegisterInterestCommand, RegisterInterestHandler,
    };
    use crate::domain::cycle::MachineSignal;
    use std::time::Duration;

    fn ntfy(dry_run: bool) -> NtfySection {
        NtfySection {
            base_topic: "laundry".to_string(),
            dry_run,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn dry_run_notifier_accepts_everything() {
        let notifier = build_notifier(&ntfy(true)).unwrap();
        assert!(notifier.notify("laundry-Bob", "Dryer finished", "x").await.is_ok());
    }

    #[test]
    fn real_notifier_builds_from_defaults() {
        assert!(build_notifier(&ntfy(false)).is_ok());
    }

    #[tokio::test]
    async fn correlator_uses_configured_base_topic() {
        let store = Arc::new(InMemoryLaundryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let correlator = build_correlator(store.clone(), notifier.clone(), &ntfy(false));

        RegisterInterestHandler::new(store)
            .handle(RegisterInterestCommand {
                name: "Bob".to_string(),
                machine_type: "dryer".to_string(),
            })
            .await;
        for payload in ["started_at=2024-01-01T10:00:00Z", "finished_at=2024-01-01T11:00:00Z"] {
            let signal = MachineSignal::parse("home/laundry/dryer", payload).unwrap();
            correlator.handle(signal).await.unwrap();
        }

        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "laundry-Bob");
        assert_eq!(sent[0].title, "Dryer finished");
    }

    #[tokio::test]
    async fn wait_for_shutdown_returns_when_flag_set() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(wait_for_shutdown(rx));

        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn background_tasks_stop_without_an_os_signal() {
        let (tx, rx) = watch::channel(false);
        let bridge_task = tokio::spawn(wait_for_shutdown(rx.clone()));
        let listener_task = tokio::spawn(async move {
            wait_for_shutdown(rx).await;
            ListenerStats::default()
        });

        tokio::time::timeout(
            Duration::from_secs(1),
            stop_background_tasks(&tx, bridge_task, listener_task),
        )
        .await
        .unwrap();
        assert!(*tx.borrow());
    }

    #[tokio::test]
    async fn wait_for_shutdown_returns_when_sender_dropped() {
        let (tx, rx) = watch::channel(false);
        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), wait_for_shutdown(rx))
            .await
            .unwrap();
    }
}
