// src/handlers.rs

pub mod catalog;
pub mod dashboard;
pub mod opportunities;

use axum::Json;
use serde_json::{json, Value};

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Saúde",
    responses((status = 200, description = "Serviço no ar"))
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
