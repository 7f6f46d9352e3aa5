use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

use crate::metrics::{REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{ErrorResponse, GenerateRequest, GenerateResponse};
use crate::state::AppState;
use crate::worker;

// Clients only ever see these two messages; everything that can go wrong
// collapses into a 500 with the matching body.
const GENERATE_FAILED: &str = "An error occurred while generating code";
const STREAM_FAILED: &str = "An error occurred while generating code stream";

pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            error!("rejected generate payload: {rejection}");
            return failure(GENERATE_FAILED);
        }
    };
    let result = state.generator.generate(&req).await;
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    match result {
        Ok(generated_code) => {
            info!(
                "generated code for prompt: {:.50} (language: {})",
                req.prompt, req.language
            );
            Json(GenerateResponse { generated_code }).into_response()
        }
        Err(err) => {
            error!("generation failed: {err}");
            failure(GENERATE_FAILED)
        }
    }
}

pub async fn generate_stream_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    REQUEST_TOTAL.inc();

    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            error!("rejected generate_stream payload: {rejection}");
            return failure(STREAM_FAILED);
        }
    };
    let fragments = match state.generator.generate_stream(&req).await {
        Ok(fragments) => fragments,
        Err(err) => {
            error!("stream setup failed: {err}");
            return failure(STREAM_FAILED);
        }
    };
    info!(
        "streaming code for prompt: {:.50} (language: {})",
        req.prompt, req.language
    );

    // Once this response goes out the status is committed; mid-stream
    // failures surface as an aborted body, not as a JSON error.
    let (tx, rx) = mpsc::channel(worker::STREAM_BUFFER);
    tokio::spawn(worker::pump(fragments, tx));

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response()
}

fn failure(message: &'static str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
