//! Health check endpoint

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let database = state.db.health_check().await;
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if database { "ok" } else { "unavailable" },
            "service": "rxpos-api",
            "version": env!("CARGO_PKG_VERSION"),
            "database": database,
        })),
    )
}
