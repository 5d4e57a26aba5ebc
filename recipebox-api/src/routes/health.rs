/// Health check endpoint
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected"
/// }
/// ```
///
/// A failing database check answers `503` with `"status": "degraded"`, so
/// load balancers can take the instance out of rotation.

use crate::app::AppState;
use axum::{extract::State, http::StatusCode, Json};
use recipebox_shared::db::pool;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,
}

impl HealthResponse {
    fn new(database_ok: bool) -> Self {
        Self {
            status: if database_ok { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if database_ok { "connected" } else { "disconnected" }.to_string(),
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match pool::health_check(&state.db).await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::new(true))),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse::new(false)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_states() {
        let healthy = HealthResponse::new(true);
        assert_eq!(healthy.status, "healthy");
        assert_eq!(healthy.database, "connected");

        let degraded = HealthResponse::new(false);
        assert_eq!(degraded.status, "degraded");
        assert_eq!(degraded.database, "disconnected");
    }
}
