use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::{error, info};

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    storage: String,
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    match state.repository.health_check().await {
        Ok(()) => {
            info!("Health check passed");
            Ok(Json(HealthResponse {
                status: "OK".to_string(),
                storage: "healthy".to_string(),
            }))
        }
        Err(e) => {
            error!(error = %e, "Storage health check failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
