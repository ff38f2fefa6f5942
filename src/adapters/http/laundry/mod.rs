//! HTTP adapter for registration intake, search and machine status.

mod dto;
mod handlers;
mod routes;

pub use dto::{
    CycleResponse, ErrorResponse, MachineStatusResponse, RegisterRequest, RegisterResponse,
    SearchParams, UserResponse,
};
pub use handlers::{LaundryApiError, LaundryAppState};
pub use routes::laundry_router;
