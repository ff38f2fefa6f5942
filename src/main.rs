//! laundry-notify service entry point.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use laundry_notify::bootstrap;
use laundry_notify::config::{AppConfig, ServerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("laundry-notify: {}", err);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.server);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "Starting laundry-notify"
    );

    match bootstrap::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "laundry-notify stopped with an error");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins over `server.log_level`; production logs are JSON.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}
