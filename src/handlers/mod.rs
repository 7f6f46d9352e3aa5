use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

mod generate;
mod health;
mod metrics;

pub use generate::{generate_handler, generate_stream_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/generate", post(generate_handler))
        .route("/generate_stream", post(generate_stream_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
