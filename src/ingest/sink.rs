// src/ingest/sink.rs
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::ingest::types::Record;

pub const LATEST_FILE: &str = "ai_tools_latest.json";

#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist one aggregated batch.
    async fn store(&self, records: &[Record]) -> Result<()>;
}

/// Writes each batch as pretty JSON: a timestamped snapshot plus `ai_tools_latest.json`.
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl RecordSink for JsonFileSink {
    async fn store(&self, records: &[Record]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating output dir {}", self.dir.display()))?;

        let body = serde_json::to_vec_pretty(records).context("serializing records")?;
        let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let snapshot = self.dir.join(format!("ai_tools_{stamp}.json"));
        tokio::fs::write(&snapshot, &body)
            .await
            .with_context(|| format!("writing {}", snapshot.display()))?;

        // Replace "latest" via rename so readers never see a half-written file.
        let tmp = self.dir.join(format!("{LATEST_FILE}.tmp"));
        let latest = self.dir.join(LATEST_FILE);
        tokio::fs::write(&tmp, &body)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &latest)
            .await
            .with_context(|| format!("replacing {}", latest.display()))?;

        tracing::info!(
            target: "sink",
            records = records.len(),
            path = %snapshot.display(),
            "batch stored"
        );
        Ok(())
    }
}

// --- Test helper ---
pub struct MemorySink {
    pub batches: std::sync::Mutex<Vec<Vec<Record>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            batches: std::sync::Mutex::new(vec![]),
        }
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().map(|b| b.len()).unwrap_or_default()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RecordSink for MemorySink {
    async fn store(&self, records: &[Record]) -> Result<()> {
        self.batches
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink mutex poisoned"))?
            .push(records.to_vec());
        Ok(())
    }
}
