//! Liveness/readiness endpoints (§6).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /health` — overall health, including a readiness breakdown.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let checks = ready_checks(&state).await;
    let ready = checks.values().all(|v| *v);
    Json(json!({ "status": if ready { "ok" } else { "degraded" }, "ready": ready, "checks": checks }))
}

/// `GET /health/live` — process is up and serving requests.
pub async fn live() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /health/ready` — dependencies (db, LLM provider) are reachable.
pub async fn ready(State(state): State<Arc<AppState>>) -> Json<Value> {
    let checks = ready_checks(&state).await;
    let ready = checks.values().all(|v| *v);
    Json(json!({ "ready": ready, "checks": checks }))
}

async fn ready_checks(state: &Arc<AppState>) -> serde_json::Map<String, Value> {
    let mut checks = serde_json::Map::new();
    let db_ok = engage_core::storage::health_check(&state.db).await;
    checks.insert("database".to_string(), json!(db_ok));

    let llm_ok = match &state.llm {
        Some(provider) => provider.health_check().await.is_ok(),
        None => false,
    };
    checks.insert("llm".to_string(), json!(llm_ok));

    checks
}
