//! Request and response bodies for the laundry endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::cycle::{MachineState, MachineStatus};
use crate::domain::cycle::Cycle;
use crate::domain::registration::RegistrationOutcome;
use crate::domain::user::User;

/// Body of `POST /register`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub machine_type: String,
}

/// Result of `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterResponse {
    /// `registered`, `already_registered` or `error`.
    pub status: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_id: Option<i64>,
}

impl From<&RegistrationOutcome> for RegisterResponse {
    fn from(outcome: &RegistrationOutcome) -> Self {
        Self {
            status: outcome.status().to_string(),
            detail: outcome.detail(),
            cycle_id: outcome
                .target()
                .and_then(|t| t.cycle_id())
                .map(|id| id.value()),
        }
    }
}

/// Query string of `GET /search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().value(),
            name: user.name().to_string(),
            created_at: user.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleResponse {
    pub id: i64,
    pub machine_type: String,
    pub started_at: String,
    pub finished_at: Option<String>,
}

impl From<&Cycle> for CycleResponse {
    fn from(cycle: &Cycle) -> Self {
        Self {
            id: cycle.id().value(),
            machine_type: cycle.machine_type().to_string(),
            started_at: cycle.started_at().to_rfc3339(),
            finished_at: cycle.finished_at().map(|t| t.to_rfc3339()),
        }
    }
}

/// One entry of `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct MachineStatusResponse {
    pub machine_type: String,
    pub state: MachineState,
    pub latest_cycle: Option<CycleResponse>,
}

impl From<&MachineStatus> for MachineStatusResponse {
    fn from(status: &MachineStatus) -> Self {
        Self {
            machine_type: status.machine_type.to_string(),
            state: status.state,
            latest_cycle: status.latest_cycle.as_ref().map(CycleResponse::from),
        }
    }
}

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
        }
    }
}
