//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod cycle;
pub mod registration;
pub mod user;

pub use cycle::{
    CorrelationOutcome, CycleCorrelator, DeliveryFailure, DispatchReport,
    GetMachineStatusHandler, MachineState, MachineStatus, NotificationDispatcher,
    NotificationSettings,
};
pub use registration::{RegisterInterestCommand, RegisterInterestHandler};
pub use user::{SearchUsersHandler, SearchUsersQuery};
