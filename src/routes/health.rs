use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{db::Expr, AppState};

/// GET /health: round-trips a trivial query to the database.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let backend = state.store.backend();
    match state.store.query(&Expr::literal(true)).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "db": backend })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "db": backend, "error": e.to_string() })),
        ),
    }
}
