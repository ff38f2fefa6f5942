//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, enums, and error types
//! that form the vocabulary of the laundry notification domain.

mod errors;
mod ids;
mod machine_type;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{CycleId, RegistrationId, UserId};
pub use machine_type::MachineType;
pub use timestamp::Timestamp;
