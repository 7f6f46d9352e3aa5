use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::RuntimeError;
use crate::generator::Generator;
use crate::handlers::create_router;
use crate::runtime::{FragmentStream, ModelRuntime, SamplingOptions};
use crate::state::AppState;

// Scripted stand-in for the model backend. Records every prompt it is
// handed and how often each entry point was called.
pub struct MockRuntime {
    completion: String,
    fragments: Vec<String>,
    echo_prompt: bool,
    fail: bool,
    pub complete_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
    pub seen_prompts: Mutex<Vec<String>>,
}

impl MockRuntime {
    fn new() -> Self {
        Self {
            completion: String::new(),
            fragments: Vec::new(),
            echo_prompt: false,
            fail: false,
            complete_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            seen_prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn completing(text: &str) -> Self {
        Self {
            completion: text.to_string(),
            ..Self::new()
        }
    }

    // complete() replies with the prompt echoed ahead of the completion,
    // the way raw causal decoding does
    pub fn echoing(text: &str) -> Self {
        Self {
            completion: text.to_string(),
            echo_prompt: true,
            ..Self::new()
        }
    }

    pub fn streaming(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl ModelRuntime for MockRuntime {
    async fn check_ready(&self, model: &str) -> Result<(), RuntimeError> {
        if self.fail {
            return Err(RuntimeError::MissingModel(model.to_string()));
        }
        Ok(())
    }

    async fn complete(
        &self,
        _model: &str,
        prompt: &str,
        _options: &SamplingOptions,
    ) -> Result<String, RuntimeError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(RuntimeError::Api("mock generation failure".to_string()));
        }
        if self.echo_prompt {
            Ok(format!("{prompt}{}", self.completion))
        } else {
            Ok(self.completion.clone())
        }
    }

    async fn stream(
        &self,
        _model: &str,
        prompt: &str,
        _options: &SamplingOptions,
    ) -> Result<FragmentStream, RuntimeError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(RuntimeError::Api("mock generation failure".to_string()));
        }
        let items: Vec<Result<String, RuntimeError>> =
            self.fragments.iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

// Collects everything tracing emits while the paired guard is alive. The
// guard scopes the subscriber to the current thread, so parallel tests do
// not see each other's lines.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}

pub fn test_router(runtime: MockRuntime) -> Router {
    test_router_with(Arc::new(runtime))
}

pub fn test_router_with(runtime: Arc<MockRuntime>) -> Router {
    let generator = Generator::new(runtime, "test-model".to_string(), 100);
    create_router(Arc::new(AppState::new(generator)))
}

pub fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
