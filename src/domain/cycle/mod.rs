//! Cycle module - machine runs and the bus signals that drive them.

mod aggregate;
mod signal;

pub use aggregate::{Cycle, NewCycle};
pub use signal::{MachineSignal, SignalKind, SignalParseError};
