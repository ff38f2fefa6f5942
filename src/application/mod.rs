//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Commands change laundry state (signals, registrations); queries read it
//! (search, machine status).

pub mod handlers;

pub use handlers::{
    // Cycle handlers
    CorrelationOutcome, CycleCorrelator, DispatchReport, GetMachineStatusHandler, MachineState,
    MachineStatus, NotificationDispatcher, NotificationSettings,
    // Registration handlers
    RegisterInterestCommand, RegisterInterestHandler,
    // User handlers
    SearchUsersHandler, SearchUsersQuery,
};
