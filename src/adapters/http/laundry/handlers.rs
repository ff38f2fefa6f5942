//! HTTP handlers for the laundry endpoints.
//!
//! Thin translation between JSON and the application handlers.

use std::sync::Arc;

use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::error;

use crate::application::handlers::cycle::GetMachineStatusHandler;
use crate::application::handlers::registration::{
    RegisterInterestCommand, RegisterInterestHandler,
};
use crate::application::handlers::user::{SearchUsersHandler, SearchUsersQuery};
use crate::domain::foundation::DomainError;
use crate::domain::registration::RegistrationOutcome;
use crate::ports::LaundryStore;

use super::dto::{
    ErrorResponse, MachineStatusResponse, RegisterRequest, RegisterResponse, SearchParams,
    UserResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared dependencies of the laundry endpoints.
#[derive(Clone)]
pub struct LaundryAppState {
    pub store: Arc<dyn LaundryStore>,
    pub search_page_size: u32,
}

impl LaundryAppState {
    pub fn register_handler(&self) -> RegisterInterestHandler {
        RegisterInterestHandler::new(self.store.clone())
    }

    pub fn search_handler(&self) -> SearchUsersHandler {
        SearchUsersHandler::with_page_size(self.store.clone(), self.search_page_size)
    }

    pub fn status_handler(&self) -> GetMachineStatusHandler {
        GetMachineStatusHandler::new(self.store.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /register
pub async fn register(
    State(state): State<LaundryAppState>,
    Json(request): Json<RegisterRequest>,
) -> impl IntoResponse {
    let outcome = state
        .register_handler()
        .handle(RegisterInterestCommand {
            name: request.name,
            machine_type: request.machine_type,
        })
        .await;

    let status = match &outcome {
        RegistrationOutcome::Registered { .. } => StatusCode::CREATED,
        RegistrationOutcome::AlreadyRegistered { .. } => StatusCode::OK,
        RegistrationOutcome::Error { code, .. } if code.is_validation() => StatusCode::BAD_REQUEST,
        RegistrationOutcome::Error { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(RegisterResponse::from(&outcome)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /search?name=<prefix>
pub async fn search(
    State(state): State<LaundryAppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<UserResponse>>, LaundryApiError> {
    let users = state
        .search_handler()
        .handle(SearchUsersQuery {
            prefix: params.name,
        })
        .await?;

    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// GET /status
pub async fn status(
    State(state): State<LaundryAppState>,
) -> Result<Json<Vec<MachineStatusResponse>>, LaundryApiError> {
    let statuses = state.status_handler().handle().await?;
    Ok(Json(statuses.iter().map(MachineStatusResponse::from).collect()))
}

/// GET /ping
pub async fn ping() -> &'static str {
    "pong"
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type for the laundry endpoints.
#[derive(Debug)]
pub enum LaundryApiError {
    BadRequest(String),
    Internal(String),
}

impl From<DomainError> for LaundryApiError {
    fn from(err: DomainError) -> Self {
        if err.code.is_validation() {
            LaundryApiError::BadRequest(err.message)
        } else {
            error!(error = %err, "Request failed");
            LaundryApiError::Internal(err.message)
        }
    }
}

impl IntoResponse for LaundryApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            LaundryApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::bad_request(msg))
            }
            LaundryApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::internal(msg))
            }
        };

        (status, Json(error)).into_response()
    }
}
