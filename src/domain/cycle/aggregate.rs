//! Cycle entity - one run of a machine, from start to finish.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CycleId, MachineType, Timestamp, ValidationError};

/// A single washer or dryer run.
///
/// A cycle is open while `finished_at` is absent. The only mutation a cycle
/// ever sees is being finished once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    id: CycleId,
    machine_type: MachineType,
    started_at: Timestamp,
    finished_at: Option<Timestamp>,
}

impl Cycle {
    /// Rebuilds a cycle from persisted fields.
    pub fn reconstitute(
        id: CycleId,
        machine_type: MachineType,
        started_at: Timestamp,
        finished_at: Option<Timestamp>,
    ) -> Self {
        Self {
            id,
            machine_type,
            started_at,
            finished_at,
        }
    }

    pub fn id(&self) -> CycleId {
        self.id
    }

    pub fn machine_type(&self) -> MachineType {
        self.machine_type
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<Timestamp> {
        self.finished_at
    }

    /// True while the machine is still running.
    pub fn is_open(&self) -> bool {
        self.finished_at.is_none()
    }

    /// True once a finish time has been recorded.
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Records the finish time.
    ///
    /// # Errors
    ///
    /// - `CycleAlreadyFinished` if a finish time is already recorded
    /// - `EmptyField` if `finished_at` is the unset sentinel
    pub fn finish(&mut self, finished_at: Timestamp) -> Result<(), ValidationError> {
        if self.is_finished() {
            return Err(ValidationError::CycleAlreadyFinished {
                cycle_id: self.id.value(),
            });
        }
        if finished_at.is_unset() {
            return Err(ValidationError::empty_field("finished_at"));
        }
        self.finished_at = Some(finished_at);
        Ok(())
    }
}

/// Fields needed to open a new cycle, validated before the store assigns an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewCycle {
    pub machine_type: MachineType,
    pub started_at: Timestamp,
}

impl NewCycle {
    pub fn new(machine_type: MachineType, started_at: Timestamp) -> Self {
        Self {
            machine_type,
            started_at,
        }
    }

    /// Rejects an unset start time.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.started_at.is_unset() {
            return Err(ValidationError::empty_field("started_at"));
        }
        Ok(())
    }

    /// Produces the open cycle once the store has assigned its id.
    pub fn into_cycle(self, id: CycleId) -> Cycle {
        Cycle::reconstitute(id, self.machine_type, self.started_at, None)
    }
}
