use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::{db, AppState};

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

/// Liveness plus a database round-trip.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (code, status, database) = match db::check_connection(&state.db).await {
        Ok(()) => (StatusCode::OK, "ok", "up"),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "down")
        }
    };
    (
        code,
        Json(HealthStatus {
            status,
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
