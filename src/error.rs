use thiserror::Error;

// Failures at the model runtime boundary. Handlers collapse all of these
// to a single 500 on the wire; the variants exist for logs and tests.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("model runtime request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model runtime error: {0}")]
    Api(String),

    #[error("model '{0}' is not available on the runtime")]
    MissingModel(String),

    #[error("invalid runtime response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}
