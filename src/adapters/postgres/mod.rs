//! PostgreSQL adapters - Database implementations for the store ports.
//!
//! - `PostgresLaundryStore` - Transaction factory over a `PgPool`
//! - `PostgresTransaction` - Cycle, registration and user access inside one transaction

mod store;

pub use store::{PostgresLaundryStore, PostgresTransaction};
