//! Message bus adapters.
//!
//! - `signal_queue` - Bounded FIFO carrying raw `BusMessage`s
//! - `SignalListener` - Single consumer applying messages to the correlator
//! - `MqttBridge` - MQTT client feeding the queue

mod listener;
mod mqtt;
mod queue;

pub use listener::{ListenerError, ListenerStats, SignalListener};
pub use mqtt::{BusError, MqttBridge, MqttSettings};
pub use queue::{signal_queue, BusMessage};
