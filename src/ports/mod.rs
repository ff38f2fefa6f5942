//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Store Ports
//!
//! - `LaundryStore` - Opens transactions
//! - `StoreTransaction` - `CycleStore` + `RegistrationStore` + `UserStore` in one unit of work
//!
//! ## Transport Ports
//!
//! - `Notifier` - Push notification delivery

mod laundry_store;
mod notifier;

pub use laundry_store::{CycleStore, LaundryStore, RegistrationStore, StoreTransaction, UserStore};
pub use notifier::{NotifyError, Notifier};
