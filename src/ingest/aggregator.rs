// src/ingest/aggregator.rs
//! Fan-out over all adapters, fan-in in declaration order, then dedup.

use chrono::Utc;
use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ingest::dedup::dedup_records;
use crate::ingest::sink::RecordSink;
use crate::ingest::types::{AdapterFailure, FailureKind, FetchReport, Record, SourceAdapter};

/// Timing for the periodic loop.
#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    pub interval: Duration,
    /// Pause after a failed cycle instead of `interval`.
    pub error_backoff: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            error_backoff: Duration::from_secs(300),
        }
    }
}

pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    timeout: Option<Duration>,
}

impl Aggregator {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        tracing::info!(adapters = adapters.len(), "aggregator initialized");
        Self {
            adapters,
            timeout: None,
        }
    }

    /// Bound a whole pass; adapters still running at the deadline count as failed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn adapters(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.adapters
    }

    pub async fn fetch_all(&self) -> Vec<Record> {
        self.fetch_all_report().await.records
    }

    pub async fn fetch_all_report(&self) -> FetchReport {
        collect(&self.adapters, self.timeout).await
    }

    /// Fetch, store, sleep; repeat until `cancel` fires. A cycle that is already
    /// fetching is allowed to finish. Adapters are closed on exit.
    pub async fn run(
        &self,
        opts: RunOptions,
        cancel: &CancellationToken,
        sink: Option<&dyn RecordSink>,
    ) {
        tracing::info!(
            interval_secs = opts.interval.as_secs(),
            adapters = self.adapters.len(),
            "starting monitor loop"
        );

        while !cancel.is_cancelled() {
            let report = self.fetch_all_report().await;
            counter!("monitor_cycles_total").increment(1);

            if report.records.is_empty() {
                tracing::warn!(failures = report.failures.len(), "no records in this cycle");
            } else {
                tracing::info!(
                    records = report.records.len(),
                    failures = report.failures.len(),
                    "fetch cycle completed"
                );
                for r in &report.records {
                    tracing::debug!(name = %r.name, source = %r.source, url = %r.url, "found");
                }
            }

            let pause = match sink {
                Some(s) => match s.store(&report.records).await {
                    Ok(()) => opts.interval,
                    Err(e) => {
                        tracing::error!(error = ?e, "cycle failed while storing records");
                        opts.error_backoff
                    }
                },
                None => opts.interval,
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        tracing::info!("monitor loop cancelled");
        self.shutdown().await;
    }

    /// Close every adapter. Safe to call more than once.
    pub async fn shutdown(&self) {
        for a in &self.adapters {
            a.close().await;
        }
        tracing::info!(adapters = self.adapters.len(), "adapters closed");
    }
}

/// One-shot aggregation over an explicit adapter list, no deadline.
pub async fn fetch_all(adapters: &[Arc<dyn SourceAdapter>]) -> Vec<Record> {
    collect(adapters, None).await.records
}

async fn collect(adapters: &[Arc<dyn SourceAdapter>], timeout: Option<Duration>) -> FetchReport {
    crate::ingest::ensure_metrics_described();

    let fetched_at = Utc::now();
    let deadline = timeout.map(|t| tokio::time::Instant::now() + t);

    // Start everything before awaiting anything.
    let tasks: Vec<(String, JoinHandle<anyhow::Result<Vec<Record>>>)> = adapters
        .iter()
        .map(|a| {
            let adapter = Arc::clone(a);
            let name = adapter.name().to_string();
            let handle = tokio::spawn(async move {
                let t0 = std::time::Instant::now();
                let out = adapter.fetch().await;
                let ms = t0.elapsed().as_secs_f64() * 1_000.0;
                histogram!("monitor_adapter_fetch_ms", "adapter" => adapter.name().to_string())
                    .record(ms);
                out
            });
            (name, handle)
        })
        .collect();

    let mut merged = Vec::new();
    let mut failures = Vec::new();

    // Await in declaration order so output order never depends on completion order.
    for (name, mut handle) in tasks {
        let joined = match deadline {
            Some(dl) => match tokio::time::timeout_at(dl, &mut handle).await {
                Ok(j) => j,
                Err(_) => {
                    handle.abort();
                    failures.push(fail(&name, FailureKind::TimedOut, "deadline exceeded".into()));
                    continue;
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(records)) => {
                if records.is_empty() {
                    tracing::warn!(adapter = %name, "no data returned");
                } else {
                    tracing::info!(adapter = %name, count = records.len(), "adapter fetched");
                }
                merged.extend(records.iter().map(|r| r.stamped(fetched_at)));
            }
            Ok(Err(e)) => failures.push(fail(&name, FailureKind::Error, format!("{e:#}"))),
            Err(join_err) => {
                failures.push(fail(&name, FailureKind::Panicked, join_err.to_string()))
            }
        }
    }

    let fetched = merged.len();
    let records = dedup_records(merged);
    let duplicates = fetched - records.len();

    counter!("monitor_records_total").increment(records.len() as u64);
    counter!("monitor_duplicates_total").increment(duplicates as u64);
    gauge!("monitor_last_run_ts").set(fetched_at.timestamp() as f64);

    tracing::info!(
        total = records.len(),
        fetched,
        duplicates,
        failed = failures.len(),
        "aggregation finished"
    );

    FetchReport {
        records,
        failures,
        fetched,
        duplicates,
    }
}

/// Logs once and counts once per failure entry.
fn fail(adapter: &str, kind: FailureKind, error: String) -> AdapterFailure {
    tracing::warn!(adapter, ?kind, error = %error, "adapter fetch failed");
    counter!("monitor_adapter_errors_total").increment(1);
    AdapterFailure {
        adapter: adapter.to_string(),
        kind,
        error,
    }
}
