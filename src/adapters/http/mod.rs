//! HTTP adapters - REST API implementations.
//!
//! The laundry adapter serves registration intake, user search and
//! machine status.

pub mod laundry;

use std::time::Duration;

use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use laundry::{laundry_router, LaundryApiError, LaundryAppState};

/// Builds the full API router with tracing and request timeouts applied.
pub fn api_router(state: LaundryAppState, request_timeout: Duration) -> Router {
    laundry_router()
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryLaundryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let state = LaundryAppState {
            store: Arc::new(InMemoryLaundryStore::new()),
            search_page_size: 5,
        };
        let response = api_router(state, Duration::from_secs(5))
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
