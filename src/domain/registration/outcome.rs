//! Typed result of a registration attempt.

use serde::Serialize;
use std::fmt;

use crate::domain::foundation::{CycleId, ErrorCode, MachineType, RegistrationId};

use super::Registration;

/// Which cycle a registration is (or would be) attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "cycle_id", rename_all = "snake_case")]
pub enum RegistrationTarget {
    /// The machine is running; notify when this cycle finishes.
    CurrentCycle(CycleId),
    /// The machine is idle; attach to the next cycle that starts.
    NextCycle,
}

impl RegistrationTarget {
    pub fn cycle_id(&self) -> Option<CycleId> {
        match self {
            RegistrationTarget::CurrentCycle(id) => Some(*id),
            RegistrationTarget::NextCycle => None,
        }
    }
}

/// Outcome of `Register(name, type)` as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered {
        registration: Registration,
        target: RegistrationTarget,
    },
    AlreadyRegistered {
        machine_type: MachineType,
        registration_id: Option<RegistrationId>,
        target: RegistrationTarget,
    },
    Error {
        code: ErrorCode,
        reason: String,
    },
}

impl RegistrationOutcome {
    /// Wire status token.
    pub fn status(&self) -> &'static str {
        match self {
            RegistrationOutcome::Registered { .. } => "registered",
            RegistrationOutcome::AlreadyRegistered { .. } => "already_registered",
            RegistrationOutcome::Error { .. } => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RegistrationOutcome::Error { .. })
    }

    pub fn target(&self) -> Option<RegistrationTarget> {
        match self {
            RegistrationOutcome::Registered { target, .. }
            | RegistrationOutcome::AlreadyRegistered { target, .. } => Some(*target),
            RegistrationOutcome::Error { .. } => None,
        }
    }

    /// Human readable feedback for the front end.
    pub fn detail(&self) -> String {
        match self {
            RegistrationOutcome::Registered {
                registration,
                target,
            } => match target {
                RegistrationTarget::CurrentCycle(_) => format!(
                    "You will be notified when the running {} finishes",
                    registration.machine_type()
                ),
                RegistrationTarget::NextCycle => format!(
                    "You will be notified when the next {} cycle finishes",
                    registration.machine_type()
                ),
            },
            RegistrationOutcome::AlreadyRegistered { machine_type, .. } => {
                format!("Already registered for the {}", machine_type)
            }
            RegistrationOutcome::Error { reason, .. } => reason.clone(),
        }
    }
}

impl fmt::Display for RegistrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status(), self.detail())
    }
}
