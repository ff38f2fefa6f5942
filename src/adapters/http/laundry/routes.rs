//! Route configuration for laundry endpoints.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{ping, register, search, status, LaundryAppState};

/// Creates the laundry router.
///
/// Routes:
/// - `POST /register` - Register for the current or next cycle
/// - `GET /search?name=<prefix>` - Find users by name prefix
/// - `GET /status` - Idle/running state per machine
/// - `GET /ping` - Liveness probe
pub fn laundry_router() -> Router<LaundryAppState> {
    Router::new()
        .route("/register", post(register))
        .route("/search", get(search))
        .route("/status", get(status))
        .route("/ping", get(ping))
}
