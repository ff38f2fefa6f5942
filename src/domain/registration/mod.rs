//! Registration module - standing notification requests and their outcomes.

mod aggregate;
mod outcome;

pub use aggregate::{NewRegistration, Registration};
pub use outcome::{RegistrationOutcome, RegistrationTarget};
