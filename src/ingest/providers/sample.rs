// src/ingest/providers/sample.rs
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::ingest::types::{Record, SourceAdapter};

/// Returns a fixed batch, optionally after a delay. Handy for smoke runs.
pub struct StaticAdapter {
    name: String,
    records: Vec<Record>,
    delay: Option<Duration>,
}

impl StaticAdapter {
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            records,
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Three well-known assistants, tagged `sample_data`.
    pub fn sample() -> Self {
        let tool = |name: &str, description: &str, category: &str, url: &str| {
            Record::new("sample_data", name, url)
                .with_description(description)
                .with_raw("category", category.into())
        };
        Self::new(
            "sample",
            vec![
                tool(
                    "ChatGPT",
                    "AI-powered conversational assistant",
                    "Conversational AI",
                    "https://chat.openai.com",
                ),
                tool(
                    "Claude",
                    "AI assistant by Anthropic",
                    "Conversational AI",
                    "https://claude.ai",
                ),
                tool(
                    "Midjourney",
                    "AI image generation tool",
                    "Image Generation",
                    "https://midjourney.com",
                ),
            ],
        )
    }
}

#[async_trait]
impl SourceAdapter for StaticAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<Record>> {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        tracing::debug!(adapter = %self.name, count = self.records.len(), "static batch");
        Ok(self.records.clone())
    }
}
