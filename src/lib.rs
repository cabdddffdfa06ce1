// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod ingest;
pub mod metrics;
pub mod scoring;

// ---- Re-exports for stable public API ----
pub use crate::config::{load_config_default, MonitorConfig};
pub use crate::ingest::{
    fetch_all, AdapterFailure, Aggregator, FailureKind, FetchReport, Record, RunOptions,
    SourceAdapter,
};

use std::sync::Arc;

/// Build the aggregator described by `cfg`: enabled adapters in declaration
/// order plus the optional end-to-end fetch timeout.
pub fn aggregator_from_config(cfg: &MonitorConfig) -> Aggregator {
    let adapters: Vec<Arc<dyn SourceAdapter>> = ingest::providers::build_adapters(cfg);
    let agg = Aggregator::new(adapters);
    match cfg.fetch_timeout() {
        Some(t) => agg.with_timeout(t),
        None => agg,
    }
}
