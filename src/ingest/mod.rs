// src/ingest/mod.rs
pub mod aggregator;
pub mod dedup;
pub mod providers;
pub mod rate_limit;
pub mod retry;
pub mod sink;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use aggregator::{fetch_all, Aggregator, RunOptions};
pub use types::{AdapterFailure, FailureKind, FetchReport, Record, SourceAdapter};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "monitor_records_total",
            "Records kept after deduplication."
        );
        describe_counter!(
            "monitor_duplicates_total",
            "Records dropped as (name, url) duplicates."
        );
        describe_counter!(
            "monitor_adapter_errors_total",
            "Adapter failures (error, timeout, panic)."
        );
        describe_counter!("monitor_retries_total", "Retried adapter attempts.");
        describe_counter!("monitor_cycles_total", "Completed monitor loop cycles.");
        describe_histogram!(
            "monitor_adapter_fetch_ms",
            "Adapter fetch time in milliseconds."
        );
        describe_gauge!(
            "monitor_last_run_ts",
            "Unix ts when the aggregator last ran."
        );
    });
}

/// Normalize scraped text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}
