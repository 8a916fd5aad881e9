use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// Health check endpoint
///
/// Returns the health status of the server and the user store.
/// Used by load balancers and monitoring systems.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let store_status = match state.store.load().await {
        Ok(_) => "readable",
        Err(e) => {
            tracing::error!("Store health check failed: {:?}", e);
            "unreadable"
        }
    };

    Json(json!({
        "status": if store_status == "readable" { "healthy" } else { "unhealthy" },
        "store": store_status,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
