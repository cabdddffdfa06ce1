// src/config/monitor.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::retry::Backoff;
use crate::ingest::RunOptions;

pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/monitor.toml";
pub const DEFAULT_JSON_PATH: &str = "config/monitor.json";

fn default_interval_secs() -> u64 {
    3600
}
fn default_error_backoff_secs() -> u64 {
    300
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub base_ms: u64,
    pub floor_ms: u64,
    pub ceiling_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_ms: 1_000,
            floor_ms: 4_000,
            ceiling_ms: 10_000,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff {
            base: Duration::from_millis(self.base_ms),
            floor: Duration::from_millis(self.floor_ms),
            ceiling: Duration::from_millis(self.ceiling_ms),
        }
    }
}

/// One `[[adapters]]` entry. Everything besides `name`/`kind`/`enabled` is a
/// flat string map handed to the adapter as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterSettings {
    pub name: String,
    /// "sample" | "product_hunt" | "rss"
    pub kind: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
    /// End-to-end bound for one aggregation pass.
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Declaration order is merge order.
    #[serde(default)]
    pub adapters: Vec<AdapterSettings>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
            fetch_timeout_secs: None,
            output_dir: default_output_dir(),
            retry: RetryConfig::default(),
            adapters: Vec::new(),
        }
    }
}

impl MonitorConfig {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            interval: Duration::from_secs(self.interval_secs),
            error_backoff: Duration::from_secs(self.error_backoff_secs),
        }
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }

    fn sanitize(mut self) -> Result<Self> {
        if self.interval_secs == 0 {
            self.interval_secs = default_interval_secs();
        }
        if self.error_backoff_secs == 0 {
            self.error_backoff_secs = default_error_backoff_secs();
        }
        if self.fetch_timeout_secs == Some(0) {
            self.fetch_timeout_secs = None;
        }
        if self.retry.floor_ms > self.retry.ceiling_ms {
            // swap to keep a valid interval
            std::mem::swap(&mut self.retry.floor_ms, &mut self.retry.ceiling_ms);
        }

        let mut seen = std::collections::HashSet::new();
        for a in &mut self.adapters {
            a.kind = a.kind.trim().to_ascii_lowercase();
            if !seen.insert(a.name.clone()) {
                bail!("duplicate adapter name `{}`", a.name);
            }
            for (key, value) in a.params.iter_mut() {
                if value.trim().eq_ignore_ascii_case("env") {
                    let var = key.to_ascii_uppercase();
                    *value = std::env::var(&var).map_err(|_| {
                        anyhow!("adapter `{}`: missing {var} env var", a.name)
                    })?;
                }
            }
        }
        Ok(self)
    }
}

/// Load from an explicit path. `.json` is parsed as JSON, anything else as TOML.
pub fn load_config_from(path: &Path) -> Result<MonitorConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading monitor config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, &ext).with_context(|| format!("parsing {}", path.display()))
}

/// Load config using env var + fallbacks:
/// 1) $MONITOR_CONFIG_PATH
/// 2) config/monitor.toml
/// 3) config/monitor.json
/// 4) built-in defaults (no adapters)
pub fn load_config_default() -> Result<MonitorConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        }
        bail!("{ENV_CONFIG_PATH} points to non-existent path");
    }
    for candidate in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return load_config_from(&p);
        }
    }
    Ok(MonitorConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<MonitorConfig> {
    let cfg: MonitorConfig = if hint_ext == "json" {
        serde_json::from_str(s)?
    } else {
        toml::from_str(s)?
    };
    cfg.sanitize()
}
