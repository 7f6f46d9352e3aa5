use axum::response::IntoResponse;
use axum::Json;

// health handler
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}
