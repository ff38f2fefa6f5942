//! In-process laundry store.
//!
//! Keeps all rows behind one async mutex. A transaction holds the lock for
//! its whole lifetime and works on a private copy of the state, so
//! transactions are fully serialized and a dropped transaction leaves no
//! trace. Uniqueness rules mirror the PostgreSQL schema.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::cycle::{Cycle, NewCycle};
use crate::domain::foundation::{
    CycleId, DomainError, ErrorCode, MachineType, RegistrationId, Timestamp, UserId,
};
use crate::domain::registration::{NewRegistration, Registration};
use crate::domain::user::{User, UserName};
use crate::ports::{CycleStore, LaundryStore, RegistrationStore, StoreTransaction, UserStore};

#[derive(Debug, Clone, Default)]
struct StoreState {
    cycles: Vec<Cycle>,
    users: Vec<User>,
    registrations: Vec<Registration>,
    last_cycle_id: i64,
    last_user_id: i64,
    last_registration_id: i64,
}

impl StoreState {
    fn cycle_mut(&mut self, id: CycleId) -> Option<&mut Cycle> {
        self.cycles.iter_mut().find(|c| c.id() == id)
    }

    fn cycle(&self, id: CycleId) -> Option<&Cycle> {
        self.cycles.iter().find(|c| c.id() == id)
    }

    fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id() == id)
    }
}

/// Store backed by process memory.
///
/// Cloning shares the underlying rows.
#[derive(Clone, Default)]
pub struct InMemoryLaundryStore {
    state: Arc<Mutex<StoreState>>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemoryLaundryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Makes every subsequent commit fail, leaving the state untouched.
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// All cycles in insertion order.
    pub async fn cycles(&self) -> Vec<Cycle> {
        self.state.lock().await.cycles.clone()
    }

    /// All registrations in insertion order.
    pub async fn registrations(&self) -> Vec<Registration> {
        self.state.lock().await.registrations.clone()
    }

    /// All users in insertion order.
    pub async fn users(&self) -> Vec<User> {
        self.state.lock().await.users.clone()
    }

    /// Number of open cycles of a machine type.
    pub async fn open_cycle_count(&self, machine_type: MachineType) -> usize {
        self.state
            .lock()
            .await
            .cycles
            .iter()
            .filter(|c| c.machine_type() == machine_type && c.is_open())
            .count()
    }
}

#[async_trait]
impl LaundryStore for InMemoryLaundryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DomainError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            working,
            started_at: Timestamp::now(),
            fail_commits: Arc::clone(&self.fail_commits),
        }))
    }
}

/// Exclusive unit of work over [`InMemoryLaundryStore`].
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<StoreState>,
    working: StoreState,
    started_at: Timestamp,
    fail_commits: Arc<AtomicBool>,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "Failed to commit transaction: commits disabled",
            ));
        }
        let InMemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}

#[async_trait]
impl CycleStore for InMemoryTransaction {
    /// Transactions already run one at a time.
    async fn lock_machine(&mut self, _machine_type: MachineType) -> Result<(), DomainError> {
        Ok(())
    }

    async fn find_most_recent_cycle(
        &mut self,
        machine_type: MachineType,
    ) -> Result<Option<Cycle>, DomainError> {
        Ok(self
            .working
            .cycles
            .iter()
            .filter(|c| c.machine_type() == machine_type)
            .max_by_key(|c| (c.started_at(), c.id().value()))
            .cloned())
    }

    async fn find_cycle(&mut self, id: CycleId) -> Result<Option<Cycle>, DomainError> {
        Ok(self.working.cycle(id).cloned())
    }

    async fn create_cycle(&mut self, new_cycle: NewCycle) -> Result<Cycle, DomainError> {
        new_cycle.validate()?;

        let already_open = self
            .working
            .cycles
            .iter()
            .any(|c| c.machine_type() == new_cycle.machine_type && c.is_open());
        if already_open {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("A {} cycle is already open", new_cycle.machine_type),
            ));
        }

        self.working.last_cycle_id += 1;
        let cycle = new_cycle.into_cycle(CycleId::from_raw(self.working.last_cycle_id));
        self.working.cycles.push(cycle.clone());
        Ok(cycle)
    }

    async fn mark_cycle_finished(
        &mut self,
        id: CycleId,
        finished_at: Timestamp,
    ) -> Result<Cycle, DomainError> {
        let cycle = self.working.cycle_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::CycleNotFound, format!("Cycle not found: {}", id))
        })?;
        cycle.finish(finished_at)?;
        Ok(cycle.clone())
    }
}

#[async_trait]
impl RegistrationStore for InMemoryTransaction {
    async fn find_pending_registrations(
        &mut self,
        machine_type: MachineType,
    ) -> Result<Vec<Registration>, DomainError> {
        let mut pending: Vec<Registration> = self
            .working
            .registrations
            .iter()
            .filter(|r| r.machine_type() == machine_type && r.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|r| (r.created_at(), r.id().value()));
        Ok(pending)
    }

    async fn find_outstanding_registrations(
        &mut self,
        user_name: &UserName,
        machine_type: MachineType,
    ) -> Result<Vec<Registration>, DomainError> {
        let Some(user_id) = self
            .working
            .users
            .iter()
            .find(|u| u.name() == user_name)
            .map(|u| u.id())
        else {
            return Ok(Vec::new());
        };

        let state = &self.working;
        Ok(state
            .registrations
            .iter()
            .filter(|r| r.user_id() == user_id && r.machine_type() == machine_type)
            .filter(|r| match r.cycle_id() {
                None => true,
                Some(cycle_id) => state.cycle(cycle_id).is_some_and(|c| c.is_open()),
            })
            .cloned()
            .collect())
    }

    async fn create_registration(
        &mut self,
        new_registration: NewRegistration,
    ) -> Result<Registration, DomainError> {
        new_registration.validate()?;

        if self.working.user(new_registration.user_id).is_none() {
            return Err(DomainError::new(
                ErrorCode::UserNotFound,
                format!("User not found: {}", new_registration.user_id),
            ));
        }
        if let Some(cycle_id) = new_registration.cycle_id {
            if self.working.cycle(cycle_id).is_none() {
                return Err(DomainError::new(
                    ErrorCode::CycleNotFound,
                    format!("Cycle not found: {}", cycle_id),
                ));
            }
        }

        let duplicate = self.working.registrations.iter().any(|r| {
            r.user_id() == new_registration.user_id
                && r.machine_type() == new_registration.machine_type
                && r.cycle_id() == new_registration.cycle_id
        });
        if duplicate {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!(
                    "User {} already has a {} registration for this cycle",
                    new_registration.user_id, new_registration.machine_type
                ),
            ));
        }

        self.working.last_registration_id += 1;
        let registration = new_registration
            .into_registration(RegistrationId::from_raw(self.working.last_registration_id));
        self.working.registrations.push(registration.clone());
        Ok(registration)
    }

    async fn attach_cycle(
        &mut self,
        registration_id: RegistrationId,
        cycle_id: CycleId,
    ) -> Result<Registration, DomainError> {
        if self.working.cycle(cycle_id).is_none() {
            return Err(DomainError::new(
                ErrorCode::CycleNotFound,
                format!("Cycle not found: {}", cycle_id),
            ));
        }

        let index = self
            .working
            .registrations
            .iter()
            .position(|r| r.id() == registration_id)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::RegistrationNotFound,
                    format!("Registration not found: {}", registration_id),
                )
            })?;

        let target = &self.working.registrations[index];
        let clash = self.working.registrations.iter().any(|r| {
            r.id() != registration_id
                && r.user_id() == target.user_id()
                && r.machine_type() == target.machine_type()
                && r.cycle_id() == Some(cycle_id)
        });
        if clash {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!(
                    "User {} is already registered for cycle {}",
                    target.user_id(),
                    cycle_id
                ),
            ));
        }

        let registration = &mut self.working.registrations[index];
        registration.attach(cycle_id)?;
        Ok(registration.clone())
    }

    async fn find_recipients_for_cycle(
        &mut self,
        cycle_id: CycleId,
    ) -> Result<Vec<UserName>, DomainError> {
        let mut names: Vec<UserName> = Vec::new();
        for registration in self
            .working
            .registrations
            .iter()
            .filter(|r| r.is_attached_to(cycle_id))
        {
            if let Some(user) = self.working.user(registration.user_id()) {
                if !names.contains(user.name()) {
                    names.push(user.name().clone());
                }
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl UserStore for InMemoryTransaction {
    async fn find_user_by_name(&mut self, name: &UserName) -> Result<Option<User>, DomainError> {
        Ok(self.working.users.iter().find(|u| u.name() == name).cloned())
    }

    async fn create_user(&mut self, name: &UserName) -> Result<User, DomainError> {
        if self.working.users.iter().any(|u| u.name() == name) {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                format!("User name already taken: {}", name),
            ));
        }

        self.working.last_user_id += 1;
        let user = User::reconstitute(
            UserId::from_raw(self.working.last_user_id),
            name.clone(),
            self.started_at,
        );
        self.working.users.push(user.clone());
        Ok(user)
    }

    async fn search_users(&mut self, prefix: &str, limit: u32) -> Result<Vec<User>, DomainError> {
        let mut found: Vec<User> = self
            .working
            .users
            .iter()
            .filter(|u| u.name().as_str().starts_with(prefix))
            .cloned()
            .collect();
        found.sort_by_key(|u| std::cmp::Reverse((u.created_at(), u.id().value())));
        found.truncate(limit as usize);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    fn name(s: &str) -> UserName {
        UserName::new(s).unwrap()
    }

    #[tokio::test]
    async fn committed_changes_are_visible() {
        let store = InMemoryLaundryStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.create_cycle(NewCycle::new(MachineType::Washer, ts("2024-01-01T10:00:00Z")))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.cycles().await.len(), 1);
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryLaundryStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.create_user(&name("Alice")).await.unwrap();
        }

        assert!(store.users().await.is_empty());
    }

    #[tokio::test]
    async fn failed_commit_leaves_state_untouched() {
        let store = InMemoryLaundryStore::new();
        store.set_fail_commits(true);

        let mut tx = store.begin().await.unwrap();
        tx.create_user(&name("Alice")).await.unwrap();
        let err = tx.commit().await.unwrap_err();

        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(store.users().await.is_empty());
    }

    #[tokio::test]
    async fn second_open_cycle_of_same_type_conflicts() {
        let store = InMemoryLaundryStore::new();
        let mut tx = store.begin().await.unwrap();

        tx.create_cycle(NewCycle::new(MachineType::Dryer, ts("2024-01-01T10:00:00Z")))
            .await
            .unwrap();
        let err = tx
            .create_cycle(NewCycle::new(MachineType::Dryer, ts("2024-01-01T10:05:00Z")))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // A different machine type is independent.
        tx.create_cycle(NewCycle::new(MachineType::Washer, ts("2024-01-01T10:05:00Z")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn most_recent_cycle_orders_by_start_time() {
        let store = InMemoryLaundryStore::new();
        let mut tx = store.begin().await.unwrap();

        let first = tx
            .create_cycle(NewCycle::new(MachineType::Washer, ts("2024-01-01T08:00:00Z")))
            .await
            .unwrap();
        tx.mark_cycle_finished(first.id(), ts("2024-01-01T09:00:00Z"))
            .await
            .unwrap();
        let second = tx
            .create_cycle(NewCycle::new(MachineType::Washer, ts("2024-01-01T10:00:00Z")))
            .await
            .unwrap();

        let recent = tx
            .find_most_recent_cycle(MachineType::Washer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(recent.id(), second.id());
        assert!(tx
            .find_most_recent_cycle(MachineType::Dryer)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn mark_finished_twice_is_rejected() {
        let store = InMemoryLaundryStore::new();
        let mut tx = store.begin().await.unwrap();

        let cycle = tx
            .create_cycle(NewCycle::new(MachineType::Washer, ts("2024-01-01T08:00:00Z")))
            .await
            .unwrap();
        tx.mark_cycle_finished(cycle.id(), ts("2024-01-01T09:00:00Z"))
            .await
            .unwrap();

        let err = tx
            .mark_cycle_finished(cycle.id(), ts("2024-01-01T09:30:00Z"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CycleAlreadyFinished);

        let err = tx
            .mark_cycle_finished(CycleId::from_raw(99), ts("2024-01-01T09:30:00Z"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CycleNotFound);
    }

    #[tokio::test]
    async fn duplicate_user_name_conflicts() {
        let store = InMemoryLaundryStore::new();
        let mut tx = store.begin().await.unwrap();

        tx.create_user(&name("Alice")).await.unwrap();
        let err = tx.create_user(&name("Alice")).await.unwrap_err();

        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn duplicate_pending_registration_conflicts() {
        let store = InMemoryLaundryStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = tx.create_user(&name("Alice")).await.unwrap();

        let new = NewRegistration {
            user_id: user.id(),
            machine_type: MachineType::Washer,
            cycle_id: None,
            created_at: ts("2024-01-01T08:00:00Z"),
        };
        tx.create_registration(new).await.unwrap();
        let err = tx.create_registration(new).await.unwrap_err();
        assert!(err.is_conflict());

        let dryer = NewRegistration {
            machine_type: MachineType::Dryer,
            ..new
        };
        assert!(tx.create_registration(dryer).await.is_ok());
    }

    #[tokio::test]
    async fn registration_for_unknown_user_is_rejected() {
        let store = InMemoryLaundryStore::new();
        let mut tx = store.begin().await.unwrap();

        let err = tx
            .create_registration(NewRegistration {
                user_id: UserId::from_raw(42),
                machine_type: MachineType::Washer,
                cycle_id: None,
                created_at: ts("2024-01-01T08:00:00Z"),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::UserNotFound);
    }

    #[tokio::test]
    async fn pending_registrations_attach_oldest_first() {
        let store = InMemoryLaundryStore::new();
        let mut tx = store.begin().await.unwrap();
        let bob = tx.create_user(&name("Bob")).await.unwrap();
        let carol = tx.create_user(&name("Carol")).await.unwrap();

        for (user, at) in [
            (carol.id(), "2024-01-01T09:00:00Z"),
            (bob.id(), "2024-01-01T08:00:00Z"),
        ] {
            tx.create_registration(NewRegistration {
                user_id: user,
                machine_type: MachineType::Dryer,
                cycle_id: None,
                created_at: ts(at),
            })
            .await
            .unwrap();
        }

        let pending = tx
            .find_pending_registrations(MachineType::Dryer)
            .await
            .unwrap();
        let order: Vec<UserId> = pending.iter().map(|r| r.user_id()).collect();
        assert_eq!(order, vec![bob.id(), carol.id()]);

        let cycle = tx
            .create_cycle(NewCycle::new(MachineType::Dryer, ts("2024-01-01T10:00:00Z")))
            .await
            .unwrap();
        for registration in &pending {
            tx.attach_cycle(registration.id(), cycle.id()).await.unwrap();
        }

        assert!(tx
            .find_pending_registrations(MachineType::Dryer)
            .await
            .unwrap()
            .is_empty());
        let recipients = tx.find_recipients_for_cycle(cycle.id()).await.unwrap();
        assert_eq!(recipients, vec![name("Carol"), name("Bob")]);
    }

    #[tokio::test]
    async fn attach_unknown_registration_is_not_found() {
        let store = InMemoryLaundryStore::new();
        let mut tx = store.begin().await.unwrap();
        let cycle = tx
            .create_cycle(NewCycle::new(MachineType::Dryer, ts("2024-01-01T10:00:00Z")))
            .await
            .unwrap();

        let err = tx
            .attach_cycle(RegistrationId::from_raw(7), cycle.id())
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::RegistrationNotFound);
    }

    #[tokio::test]
    async fn outstanding_excludes_finished_cycles() {
        let store = InMemoryLaundryStore::new();
        let mut tx = store.begin().await.unwrap();
        let alice = tx.create_user(&name("Alice")).await.unwrap();
        let cycle = tx
            .create_cycle(NewCycle::new(MachineType::Washer, ts("2024-01-01T10:00:00Z")))
            .await
            .unwrap();
        tx.create_registration(NewRegistration {
            user_id: alice.id(),
            machine_type: MachineType::Washer,
            cycle_id: Some(cycle.id()),
            created_at: ts("2024-01-01T10:01:00Z"),
        })
        .await
        .unwrap();

        let outstanding = tx
            .find_outstanding_registrations(&name("Alice"), MachineType::Washer)
            .await
            .unwrap();
        assert_eq!(outstanding.len(), 1);

        tx.mark_cycle_finished(cycle.id(), ts("2024-01-01T11:00:00Z"))
            .await
            .unwrap();
        assert!(tx
            .find_outstanding_registrations(&name("Alice"), MachineType::Washer)
            .await
            .unwrap()
            .is_empty());
        assert!(tx
            .find_outstanding_registrations(&name("Nobody"), MachineType::Washer)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn recipients_are_distinct() {
        let store = InMemoryLaundryStore::new();
        let mut tx = store.begin().await.unwrap();
        let alice = tx.create_user(&name("Alice")).await.unwrap();
        let cycle = tx
            .create_cycle(NewCycle::new(MachineType::Washer, ts("2024-01-01T10:00:00Z")))
            .await
            .unwrap();

        tx.create_registration(NewRegistration {
            user_id: alice.id(),
            machine_type: MachineType::Washer,
            cycle_id: Some(cycle.id()),
            created_at: ts("2024-01-01T10:01:00Z"),
        })
        .await
        .unwrap();

        let recipients = tx.find_recipients_for_cycle(cycle.id()).await.unwrap();
        assert_eq!(recipients, vec![name("Alice")]);
        assert!(tx
            .find_recipients_for_cycle(CycleId::from_raw(99))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn search_matches_prefix_newest_first() {
        let store = InMemoryLaundryStore::new();

        for n in ["Anna", "Andy", "Bob"] {
            let mut tx = store.begin().await.unwrap();
            tx.create_user(&name(n)).await.unwrap();
            tx.commit().await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        let found = tx.search_users("An", 5).await.unwrap();
        let names: Vec<&str> = found.iter().map(|u| u.name().as_str()).collect();
        assert_eq!(names, vec!["Andy", "Anna"]);

        assert_eq!(tx.search_users("", 2).await.unwrap().len(), 2);
        assert!(tx.search_users("A%", 5).await.unwrap().is_empty());
    }
}
