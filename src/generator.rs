use std::sync::Arc;

use tracing::info;

use crate::cache::{make_cache_key, ResponseCache};
use crate::error::RuntimeError;
use crate::metrics::{CACHE_HITS, CACHE_MISSES, CACHE_SIZE};
use crate::models::GenerateRequest;
use crate::runtime::{FragmentStream, ModelRuntime, SamplingOptions};

const TEMPERATURE: f64 = 0.7;
const TOP_P: f64 = 0.95;

// Owns the model handle, the prompt template and the response cache. One
// instance is shared across all requests.
pub struct Generator {
    runtime: Arc<dyn ModelRuntime>,
    cache: ResponseCache,
    model: String,
}

impl Generator {
    pub fn new(runtime: Arc<dyn ModelRuntime>, model: String, cache_capacity: usize) -> Self {
        Self {
            runtime,
            cache: ResponseCache::new(cache_capacity),
            model,
        }
    }

    pub async fn generate(&self, req: &GenerateRequest) -> Result<String, RuntimeError> {
        let key = make_cache_key(req);
        if let Some(hit) = self.cache.get(&key).await {
            CACHE_HITS.inc();
            info!(
                "cache hit for prompt: {:.50} (language: {})",
                req.prompt, req.language
            );
            return Ok(hit);
        }
        CACHE_MISSES.inc();

        let full_prompt = build_prompt(&req.language, &req.prompt);
        let raw = self
            .runtime
            .complete(&self.model, &full_prompt, &sampling(req.max_length))
            .await?;
        let code = clean_output(&full_prompt, &raw);

        self.cache.insert(key, code.clone()).await;
        CACHE_SIZE.set(self.cache.len().await as f64);
        Ok(code)
    }

    pub async fn generate_stream(
        &self,
        req: &GenerateRequest,
    ) -> Result<FragmentStream, RuntimeError> {
        let full_prompt = build_prompt(&req.language, &req.prompt);
        self.runtime
            .stream(&self.model, &full_prompt, &sampling(req.max_length))
            .await
    }
}

pub fn build_prompt(language: &str, prompt: &str) -> String {
    format!("Generate {language} code for: {prompt}\n\n")
}

// The sync runtime reply may echo the prompt ahead of the completion; drop
// it and trim the surrounding whitespace.
fn clean_output(full_prompt: &str, raw: &str) -> String {
    raw.replace(full_prompt, "").trim().to_string()
}

fn sampling(max_length: u32) -> SamplingOptions {
    SamplingOptions {
        temperature: TEMPERATURE,
        top_p: TOP_P,
        max_tokens: max_length,
    }
}
