//! Laundry store ports.
//!
//! Cycles, registrations and users live in one store so the correlator can
//! change several of them atomically. Every operation runs inside a
//! [`StoreTransaction`] obtained from [`LaundryStore::begin`].
//!
//! # Transactions
//!
//! - `commit()` makes every change visible at once
//! - dropping a transaction without committing discards its changes
//! - uniqueness rules (user name, one open cycle per machine type, one
//!   outstanding registration per user and type) surface as
//!   `ErrorCode::Conflict`
//! - [`CycleStore::lock_machine`] serializes transactions that read and then
//!   write the state of one machine type

use async_trait::async_trait;

use crate::domain::cycle::{Cycle, NewCycle};
use crate::domain::foundation::{CycleId, DomainError, MachineType, RegistrationId, Timestamp};
use crate::domain::registration::{NewRegistration, Registration};
use crate::domain::user::{User, UserName};

/// Cycle persistence.
#[async_trait]
pub trait CycleStore: Send {
    /// Blocks until no other transaction holds the lock for `machine_type`,
    /// then holds it until this transaction commits or rolls back.
    ///
    /// Take it before reading the machine's most recent cycle when the
    /// transaction will act on what it read.
    async fn lock_machine(&mut self, machine_type: MachineType) -> Result<(), DomainError>;

    /// Most recently started cycle of a machine type, open or not.
    async fn find_most_recent_cycle(
        &mut self,
        machine_type: MachineType,
    ) -> Result<Option<Cycle>, DomainError>;

    /// Looks a cycle up by id.
    async fn find_cycle(&mut self, id: CycleId) -> Result<Option<Cycle>, DomainError>;

    /// Opens a new cycle.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if `started_at` is unset
    /// - `Conflict` if a cycle of the same type is still open
    /// - `DatabaseError` on persistence failure
    async fn create_cycle(&mut self, new_cycle: NewCycle) -> Result<Cycle, DomainError>;

    /// Records the finish time of a cycle.
    ///
    /// # Errors
    ///
    /// - `CycleNotFound` if the id is unknown
    /// - `CycleAlreadyFinished` if a finish time is already recorded
    /// - `ValidationFailed` if `finished_at` is unset
    async fn mark_cycle_finished(
        &mut self,
        id: CycleId,
        finished_at: Timestamp,
    ) -> Result<Cycle, DomainError>;
}

/// Registration persistence.
#[async_trait]
pub trait RegistrationStore: Send {
    /// Registrations of a type still waiting for a cycle, oldest first.
    async fn find_pending_registrations(
        &mut self,
        machine_type: MachineType,
    ) -> Result<Vec<Registration>, DomainError>;

    /// Registrations for a user and type that are pending or attached to a
    /// cycle that has not finished.
    async fn find_outstanding_registrations(
        &mut self,
        user_name: &UserName,
        machine_type: MachineType,
    ) -> Result<Vec<Registration>, DomainError>;

    /// Inserts a registration.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the user id is not assigned or `created_at` is unset
    /// - `Conflict` if an identical outstanding registration already exists
    async fn create_registration(
        &mut self,
        new_registration: NewRegistration,
    ) -> Result<Registration, DomainError>;

    /// Resolves a pending registration onto a cycle.
    ///
    /// # Errors
    ///
    /// - `RegistrationNotFound` if the id is unknown
    /// - `ValidationFailed` if the registration already points at another cycle
    async fn attach_cycle(
        &mut self,
        registration_id: RegistrationId,
        cycle_id: CycleId,
    ) -> Result<Registration, DomainError>;

    /// Distinct names of users registered for a cycle.
    async fn find_recipients_for_cycle(
        &mut self,
        cycle_id: CycleId,
    ) -> Result<Vec<UserName>, DomainError>;
}

/// User persistence.
#[async_trait]
pub trait UserStore: Send {
    async fn find_user_by_name(&mut self, name: &UserName) -> Result<Option<User>, DomainError>;

    /// Creates a user stamped with the transaction start time.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the name is already taken
    async fn create_user(&mut self, name: &UserName) -> Result<User, DomainError>;

    /// Users whose name starts with `prefix`, newest first.
    ///
    /// `%` and `_` in the prefix match literally.
    async fn search_users(&mut self, prefix: &str, limit: u32) -> Result<Vec<User>, DomainError>;
}

/// One unit of work across all three stores.
#[async_trait]
pub trait StoreTransaction: CycleStore + RegistrationStore + UserStore {
    /// Makes the transaction's changes durable.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;
}

/// Factory for store transactions.
#[async_trait]
pub trait LaundryStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DomainError>;
}
