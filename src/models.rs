use serde::{Deserialize, Serialize};

// Request body accepted by /generate and /generate_stream
#[derive(Deserialize, Serialize, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_max_length")]
    pub max_length: u32,
}

fn default_language() -> String {
    "python".to_string()
}

fn default_max_length() -> u32 {
    200
}

// Success body of /generate
#[derive(Deserialize, Serialize)]
pub struct GenerateResponse {
    pub generated_code: String,
}

// Failure body of both POST endpoints
#[derive(Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
