//! Cycle command and query handlers.
//!
//! Handlers for reacting to machine signals, notifying users and reporting
//! machine state.

// Command handlers
mod correlate_signal;
mod dispatch_notifications;

// Query handlers
mod get_machine_status;

pub use correlate_signal::{CorrelationOutcome, CycleCorrelator};
pub use dispatch_notifications::{
    DeliveryFailure, DispatchReport, NotificationDispatcher, NotificationSettings,
    DEFAULT_MESSAGE,
};
pub use get_machine_status::{GetMachineStatusHandler, MachineState, MachineStatus};
