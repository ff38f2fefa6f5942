//! Bounded FIFO between bus clients and the signal listener.

use tokio::sync::mpsc;

/// Raw message as delivered by the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: String,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Builds a message from a binary payload, replacing invalid UTF-8.
    pub fn from_bytes(topic: impl Into<String>, payload: &[u8]) -> Self {
        Self::new(topic, String::from_utf8_lossy(payload))
    }
}

/// Creates the signal queue.
///
/// Producers clone the sender; the listener owns the only receiver, so
/// messages are handled strictly in arrival order. A zero capacity is
/// raised to one.
pub fn signal_queue(capacity: usize) -> (mpsc::Sender<BusMessage>, mpsc::Receiver<BusMessage>) {
    mpsc::channel(capacity.max(1))
}
