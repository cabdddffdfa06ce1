// src/ingest/providers/mod.rs
pub mod feed;
pub mod product_hunt;
pub mod sample;

use anyhow::{bail, Result};
use std::sync::Arc;

use crate::config::{AdapterSettings, MonitorConfig};
use crate::ingest::retry::Backoff;
use crate::ingest::types::SourceAdapter;

const USER_AGENT: &str = concat!("ai-tools-monitor/", env!("CARGO_PKG_VERSION"));

/// Build one adapter from its config entry. Each adapter gets its own HTTP client.
pub fn build_adapter(settings: &AdapterSettings, backoff: Backoff) -> Result<Arc<dyn SourceAdapter>> {
    let adapter: Arc<dyn SourceAdapter> = match settings.kind.as_str() {
        "sample" => Arc::new(sample::StaticAdapter::sample()),
        "product_hunt" => Arc::new(product_hunt::ProductHuntAdapter::from_params(
            http_client()?,
            &settings.params,
            backoff,
        )?),
        "rss" => Arc::new(feed::FeedAdapter::from_params(
            &settings.name,
            http_client()?,
            &settings.params,
            backoff,
        )?),
        other => bail!("unknown adapter kind `{other}`"),
    };
    Ok(adapter)
}

/// Enabled adapters in declaration order. Entries that fail to build are logged and skipped.
pub fn build_adapters(cfg: &MonitorConfig) -> Vec<Arc<dyn SourceAdapter>> {
    let backoff = cfg.retry.backoff();
    cfg.adapters
        .iter()
        .filter(|s| s.enabled)
        .filter_map(|s| match build_adapter(s, backoff) {
            Ok(a) => Some(a),
            Err(e) => {
                tracing::error!(adapter = %s.name, kind = %s.kind, error = ?e, "adapter not created");
                None
            }
        })
        .collect()
}

fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(30))
        .build()?)
}
