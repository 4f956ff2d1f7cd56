use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::domain::conversion::{ConversionService, ConversionServiceApi};
use crate::infrastructure::db::{check_connection, DbPool};

/// Dependencies the readiness probe inspects
#[derive(Clone)]
pub struct HealthState {
    pub pool: Arc<DbPool>,
    pub conversion_service: Arc<ConversionService>,
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn health_ready(State(state): State<HealthState>) -> impl IntoResponse {
    let active_tasks = state.conversion_service.active_tasks();

    match check_connection(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "cache_database": "connected",
                "active_tasks": active_tasks
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "not_ready",
                    "cache_database": "disconnected",
                    "active_tasks": active_tasks
                })),
            )
        }
    }
}
