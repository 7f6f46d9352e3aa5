use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("codegen_requests_total", "Total number of generation requests").unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("codegen_cache_hits_total", "Total result cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("codegen_cache_misses_total", "Total result cache misses").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "codegen_request_latency_seconds",
        "Synchronous generation latency in seconds"
    )
    .unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("codegen_cache_size", "Current number of cached results").unwrap();
    pub static ref ACTIVE_STREAMS: Gauge = register_gauge!(
        "codegen_active_streams",
        "Streaming generation workers currently running"
    )
    .unwrap();
}
