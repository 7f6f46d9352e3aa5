use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::error::RuntimeError;
use crate::metrics::ACTIVE_STREAMS;
use crate::runtime::FragmentStream;

pub const STREAM_BUFFER: usize = 32;

// Drains the runtime's fragment stream into the bounded channel backing a
// streaming response body. Every fragment goes out newline-terminated. A
// closed receiver means the client disconnected; returning drops the
// upstream stream and aborts the generation.
pub async fn pump(mut fragments: FragmentStream, tx: mpsc::Sender<Result<String, RuntimeError>>) {
    ACTIVE_STREAMS.inc();
    while let Some(item) = fragments.next().await {
        match item {
            Ok(fragment) => {
                if tx.send(Ok(format!("{fragment}\n"))).await.is_err() {
                    info!("client disconnected, aborting generation stream");
                    break;
                }
            }
            Err(err) => {
                error!("generation stream failed: {err}");
                let _ = tx.send(Err(err)).await;
                break;
            }
        }
    }
    ACTIVE_STREAMS.dec();
}
