use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cache;
mod config;
mod error;
mod generator;
mod handlers;
mod metrics;
mod models;
mod runtime;
mod state;
mod worker;

#[cfg(test)]
mod test_helpers;

use config::Args;
use generator::Generator;
use handlers::create_router;
use runtime::{HttpRuntime, ModelRuntime};
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();

    config::ensure_cache_dir(&args.cache_dir)?;

    // refuse to start if the model is not actually available
    let runtime = HttpRuntime::new(&args.runtime_url);
    runtime.check_ready(&args.model).await?;
    info!("model {} ready on {}", args.model, args.runtime_url);

    let generator = Generator::new(Arc::new(runtime), args.model, args.cache_capacity);
    let state = Arc::new(AppState::new(generator));
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("codegen server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
