//! Registration entity - a user's standing request to be notified.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CycleId, MachineType, RegistrationId, Timestamp, UserId, ValidationError,
};

/// Links a user to a cycle of one machine type.
///
/// `cycle_id` is `None` while the registration waits for the next cycle of
/// its type to start. Once attached it never changes; fulfilled
/// registrations stay behind as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    id: RegistrationId,
    user_id: UserId,
    machine_type: MachineType,
    cycle_id: Option<CycleId>,
    created_at: Timestamp,
}

impl Registration {
    pub fn reconstitute(
        id: RegistrationId,
        user_id: UserId,
        machine_type: MachineType,
        cycle_id: Option<CycleId>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            machine_type,
            cycle_id,
            created_at,
        }
    }

    pub fn id(&self) -> RegistrationId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn machine_type(&self) -> MachineType {
        self.machine_type
    }

    pub fn cycle_id(&self) -> Option<CycleId> {
        self.cycle_id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// True while waiting for the next cycle to start.
    pub fn is_pending(&self) -> bool {
        self.cycle_id.is_none()
    }

    pub fn is_attached_to(&self, cycle_id: CycleId) -> bool {
        self.cycle_id == Some(cycle_id)
    }

    /// Resolves a pending registration onto a concrete cycle.
    ///
    /// Re-attaching to the same cycle is a no-op.
    pub fn attach(&mut self, cycle_id: CycleId) -> Result<(), ValidationError> {
        match self.cycle_id {
            None => {
                self.cycle_id = Some(cycle_id);
                Ok(())
            }
            Some(existing) if existing == cycle_id => Ok(()),
            Some(existing) => Err(ValidationError::RegistrationAlreadyAttached {
                registration_id: self.id.value(),
                cycle_id: existing.value(),
            }),
        }
    }
}

/// Fields for a registration the store has not yet persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewRegistration {
    pub user_id: UserId,
    pub machine_type: MachineType,
    pub cycle_id: Option<CycleId>,
    pub created_at: Timestamp,
}

impl NewRegistration {
    /// Validates the raw references before insert.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.user_id.is_assigned() {
            return Err(ValidationError::invalid_format(
                "user_id",
                format!("must be positive, got {}", self.user_id),
            ));
        }
        if let Some(cycle_id) = self.cycle_id {
            if !cycle_id.is_assigned() {
                return Err(ValidationError::invalid_format(
                    "cycle_id",
                    format!("must be positive, got {}", cycle_id),
                ));
            }
        }
        if self.created_at.is_unset() {
            return Err(ValidationError::empty_field("created_at"));
        }
        Ok(())
    }

    pub fn into_registration(self, id: RegistrationId) -> Registration {
        Registration::reconstitute(
            id,
            self.user_id,
            self.machine_type,
            self.cycle_id,
            self.created_at,
        )
    }
}
