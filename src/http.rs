use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::task;
use tracing::error;

use crate::check::ServiceCheck;

/// Respond with 200 or 503 and the JSON snapshot, whatever the health.
pub async fn status_handler(State(check): State<Arc<ServiceCheck>>) -> Response {
    // A running cycle holds the lock for as long as its probes take
    match task::spawn_blocking(move || check.snapshot()).await {
        Ok(snapshot) => (snapshot.status_code(), Json(snapshot)).into_response(),
        Err(err) => {
            error!("Failed to take status snapshot: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Router serving the status of `check` on `path`.
pub fn router(check: Arc<ServiceCheck>, path: &str) -> Router {
    Router::new()
        .route(path, get(status_handler))
        .with_state(check)
}
