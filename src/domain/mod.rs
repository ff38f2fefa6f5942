//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, enums, errors)
//! - `cycle` - Machine runs and the bus signals that open and close them
//! - `registration` - Standing notification requests and intake outcomes
//! - `user` - People who register interest

pub mod cycle;
pub mod foundation;
pub mod registration;
pub mod user;
