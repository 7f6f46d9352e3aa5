use async_stream::stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::RuntimeError;

pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, RuntimeError>> + Send>>;

#[derive(Debug, Clone, Copy)]
pub struct SamplingOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
}

// Seam between the HTTP handlers and the model backend. The production
// implementation talks to an Ollama-compatible runtime; tests substitute
// their own.
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    async fn check_ready(&self, model: &str) -> Result<(), RuntimeError>;

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        options: &SamplingOptions,
    ) -> Result<String, RuntimeError>;

    async fn stream(
        &self,
        model: &str,
        prompt: &str,
        options: &SamplingOptions,
    ) -> Result<FragmentStream, RuntimeError>;
}

pub struct HttpRuntime {
    client: Client,
    base_url: String,
}

impl HttpRuntime {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
struct GenerateCall<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: CallOptions,
}

#[derive(Serialize)]
struct CallOptions {
    temperature: f64,
    top_p: f64,
    num_predict: u32,
}

impl From<&SamplingOptions> for CallOptions {
    fn from(options: &SamplingOptions) -> Self {
        Self {
            temperature: options.temperature,
            top_p: options.top_p,
            num_predict: options.max_tokens,
        }
    }
}

// Shape shared by sync replies and stream lines; unknown fields are ignored.
#[derive(Deserialize)]
struct RuntimeReply {
    response: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct TagsReply {
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

#[async_trait]
impl ModelRuntime for HttpRuntime {
    async fn check_ready(&self, model: &str) -> Result<(), RuntimeError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(RuntimeError::Api(describe_failure(status, &body)));
        }
        let tags: TagsReply = serde_json::from_slice(&body)?;
        ensure_model_available(&tags, model)
    }

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        options: &SamplingOptions,
    ) -> Result<String, RuntimeError> {
        let url = format!("{}/api/generate", self.base_url);
        let call = GenerateCall {
            model,
            prompt,
            stream: false,
            options: options.into(),
        };
        let resp = self.client.post(&url).json(&call).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(RuntimeError::Api(describe_failure(status, &body)));
        }
        let reply: RuntimeReply = serde_json::from_slice(&body)?;
        if let Some(error) = reply.error {
            return Err(RuntimeError::Api(error));
        }
        Ok(reply.response.unwrap_or_default())
    }

    async fn stream(
        &self,
        model: &str,
        prompt: &str,
        options: &SamplingOptions,
    ) -> Result<FragmentStream, RuntimeError> {
        let url = format!("{}/api/generate", self.base_url);
        let call = GenerateCall {
            model,
            prompt,
            stream: true,
            options: options.into(),
        };
        let resp = self.client.post(&url).json(&call).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.bytes().await?;
            return Err(RuntimeError::Api(describe_failure(status, &body)));
        }
        Ok(ndjson_fragments(resp.bytes_stream()))
    }
}

// A configured model counts as available on an exact tag match, or when a
// bare name matches a tagged variant (yi-coder matches yi-coder:3b).
fn ensure_model_available(tags: &TagsReply, model: &str) -> Result<(), RuntimeError> {
    let known = tags
        .models
        .iter()
        .any(|m| m.name == model || m.name.split(':').next() == Some(model));
    if known {
        Ok(())
    } else {
        Err(RuntimeError::MissingModel(model.to_string()))
    }
}

fn describe_failure(status: StatusCode, body: &[u8]) -> String {
    if let Ok(reply) = serde_json::from_slice::<RuntimeReply>(body) {
        if let Some(error) = reply.error {
            return error;
        }
    }
    format!("runtime returned HTTP {status}")
}

// Decodes the runtime's newline-delimited JSON into text fragments. Lines
// are reassembled across chunk boundaries before parsing; the first error
// ends the stream.
fn ndjson_fragments<S, B, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<RuntimeError> + Send + 'static,
{
    Box::pin(stream! {
        let mut bytes = Box::pin(bytes);
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    yield Err(err.into());
                    return;
                }
            };
            buf.extend_from_slice(chunk.as_ref());
            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                match decode_line(&line[..line.len() - 1]) {
                    Ok(Some(fragment)) => yield Ok(fragment),
                    Ok(None) => {}
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }
        }
        if !buf.is_empty() {
            match decode_line(&buf) {
                Ok(Some(fragment)) => yield Ok(fragment),
                Ok(None) => {}
                Err(err) => yield Err(err),
            }
        }
    })
}

fn decode_line(line: &[u8]) -> Result<Option<String>, RuntimeError> {
    if line.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(None);
    }
    let reply: RuntimeReply = serde_json::from_slice(line)?;
    if let Some(error) = reply.error {
        return Err(RuntimeError::Api(error));
    }
    match reply.response {
        Some(text) if !text.is_empty() => Ok(Some(text)),
        _ => Ok(None),
    }
}
