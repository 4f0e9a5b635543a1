use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::resilience::{BreakerRegistry, BreakerSnapshot, CircuitState};

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub dependencies: usize,
    /// Breakers not currently closed.
    pub open: Vec<String>,
}

/// Overall status: 200 when every breaker is closed, 503 otherwise.
pub async fn get_health(
    State(registry): State<Arc<BreakerRegistry>>,
) -> (StatusCode, Json<HealthReport>) {
    let snapshots = registry.snapshots();
    let open: Vec<String> = snapshots
        .iter()
        .filter(|s| s.state != CircuitState::Closed)
        .map(|s| s.name.clone())
        .collect();

    let (code, status) = if open.is_empty() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthReport {
            status,
            dependencies: snapshots.len(),
            open,
        }),
    )
}

pub async fn list_breakers(
    State(registry): State<Arc<BreakerRegistry>>,
) -> Json<Vec<BreakerSnapshot>> {
    Json(registry.snapshots())
}

pub async fn get_breaker(
    State(registry): State<Arc<BreakerRegistry>>,
    Path(name): Path<String>,
) -> Response {
    match registry.get(&name) {
        Some(breaker) => Json(breaker.snapshot()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": format!("no breaker named `{name}`"),
            })),
        )
            .into_response(),
    }
}
