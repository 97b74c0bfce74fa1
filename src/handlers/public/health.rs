// handlers/public/health.rs - GET /health handler

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::state::AppState;

/// 200 when the database answers (or no database is configured), 503 otherwise.
pub async fn health_get(State(state): State<AppState>) -> Response {
    let now = chrono::Utc::now();

    let Some(db) = state.database.as_ref() else {
        return Json(json!({
            "success": true,
            "data": { "status": "ok", "timestamp": now, "database": "memory" }
        }))
        .into_response();
    };

    match db.health_check().await {
        Ok(_) => Json(json!({
            "success": true,
            "data": { "status": "ok", "timestamp": now, "database": "ok" }
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": { "status": "degraded", "timestamp": now }
                })),
            )
                .into_response()
        }
    }
}
