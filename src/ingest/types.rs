// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Normalized unit produced by a [`SourceAdapter`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub name: String,
    pub description: String,
    pub url: String,
    pub source: String, // adapter tag, e.g. "producthunt"
    pub discovered_at: DateTime<Utc>,
    /// Source-specific fields (metrics, categories, pricing...). Opaque to the aggregator.
    #[serde(default)]
    pub raw: Map<String, Value>,
    /// Batch timestamp stamped by the aggregator on its own copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(source: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            url: url.into(),
            source: source.into(),
            discovered_at: Utc::now(),
            raw: Map::new(),
            fetched_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_raw(mut self, key: impl Into<String>, value: Value) -> Self {
        self.raw.insert(key.into(), value);
        self
    }

    /// Stable hash of `(name, url)`; see [`crate::ingest::dedup::dedup_key`].
    pub fn dedup_key(&self) -> String {
        crate::ingest::dedup::dedup_key(&self.name, &self.url)
    }

    /// Copy of this record carrying the batch timestamp.
    pub fn stamped(&self, fetched_at: DateTime<Utc>) -> Record {
        Record {
            fetched_at: Some(fetched_at),
            ..self.clone()
        }
    }
}

/// Capability interface every upstream source implements.
///
/// `fetch` returns an empty vec for "nothing new" and `Err` only for genuine
/// failures (transport, auth, parse). `close` must be idempotent and safe to
/// call even if `fetch` never ran.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self) -> Result<Vec<Record>>;
    async fn close(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Error,
    TimedOut,
    Panicked,
}

/// Why one adapter contributed nothing to a batch.
#[derive(Debug, Clone, Serialize)]
pub struct AdapterFailure {
    pub adapter: String,
    pub kind: FailureKind,
    pub error: String,
}

/// Outcome of one aggregation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchReport {
    pub records: Vec<Record>,
    pub failures: Vec<AdapterFailure>,
    /// Records collected before deduplication.
    pub fetched: usize,
    /// Records dropped as duplicates.
    pub duplicates: usize,
}

impl FetchReport {
    pub fn is_total_failure(&self) -> bool {
        self.records.is_empty() && !self.failures.is_empty()
    }
}
