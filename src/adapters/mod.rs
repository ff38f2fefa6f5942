//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `bus` - MQTT bridge, signal queue and listener loop
//! - `http` - REST endpoints (axum)
//! - `memory` - In-memory store
//! - `notify` - ntfy push and a recording notifier
//! - `postgres` - PostgreSQL store

pub mod bus;
pub mod http;
pub mod memory;
pub mod notify;
pub mod postgres;

pub use self::bus::{signal_queue, BusMessage, MqttBridge, MqttSettings, SignalListener};
pub use self::http::{api_router, LaundryAppState};
pub use self::memory::InMemoryLaundryStore;
pub use self::notify::{NtfyConfig, NtfyNotifier, RecordingNotifier};
pub use self::postgres::PostgresLaundryStore;
