use clap::Parser;
use std::io;
use std::path::{Path, PathBuf};

// CLI argument structure; every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "codegen-server")]
#[command(about = "HTTP code generation service backed by a pretrained model runtime")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    // Model identifier handed to the runtime
    #[arg(short, long, env = "MODEL_NAME", default_value = "yi-coder:3b")]
    pub model: String,

    // Base URL of the model runtime
    #[arg(short, long, env = "RUNTIME_URL", default_value = "http://localhost:11434")]
    pub runtime_url: String,

    // On-disk cache/offload directory, created at startup if absent
    #[arg(long, env = "MODEL_CACHE_DIR", default_value = "model_cache")]
    pub cache_dir: PathBuf,

    // Result cache capacity (entries)
    #[arg(long, default_value_t = 100)]
    pub cache_capacity: usize,
}

// Scratch space reserved for the model runtime integration
pub fn ensure_cache_dir(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path)
}
