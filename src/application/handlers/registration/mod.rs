//! Registration command handlers.

mod register_interest;

pub use register_interest::{RegisterInterestCommand, RegisterInterestHandler};
