// src/ingest/providers/feed.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::normalize_text;
use crate::ingest::rate_limit::RateLimiter;
use crate::ingest::retry::{permanent, with_retry, Backoff};
use crate::ingest::types::{Record, SourceAdapter};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "category", default)]
    category: Vec<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<i64> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

/// RSS 2.0 feed of a tool directory (one item per listed tool).
pub struct FeedAdapter {
    name: String,
    mode: Mode,
    limiter: RateLimiter,
    backoff: Backoff,
    closed: AtomicBool,
}

impl FeedAdapter {
    pub fn from_fixture(name: impl Into<String>, xml: &str) -> Self {
        Self::with_mode(name.into(), Mode::Fixture(xml.to_string()))
    }

    pub fn from_url(name: impl Into<String>, url: impl Into<String>, client: reqwest::Client) -> Self {
        Self::with_mode(
            name.into(),
            Mode::Http {
                url: url.into(),
                client,
            },
        )
    }

    /// Params: `url` (required), `calls_per_second`.
    pub fn from_params(
        name: &str,
        client: reqwest::Client,
        params: &BTreeMap<String, String>,
        backoff: Backoff,
    ) -> Result<Self> {
        let url = params
            .get("url")
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| anyhow!("missing `url`"))?;
        let mut adapter = Self::from_url(name, url.trim(), client);
        adapter.backoff = backoff;
        if let Some(cps) = params.get("calls_per_second") {
            let cps: f64 = cps
                .parse()
                .with_context(|| format!("invalid calls_per_second `{cps}`"))?;
            adapter.limiter = RateLimiter::try_new(cps)?;
        }
        Ok(adapter)
    }

    fn with_mode(name: String, mode: Mode) -> Self {
        Self {
            name,
            mode,
            limiter: RateLimiter::default(),
            backoff: Backoff::default(),
            closed: AtomicBool::new(false),
        }
    }

    /// Items without a title or link are skipped.
    pub fn parse_items(source: &str, xml: &str) -> Result<Vec<Record>> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean)
            .map_err(|e| permanent(format!("parsing {source} rss xml: {e}")))?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let name = normalize_text(it.title.as_deref().unwrap_or_default());
            let url = it.link.as_deref().unwrap_or_default().trim().to_string();
            if name.is_empty() || url.is_empty() {
                continue;
            }
            let mut rec = Record::new(source, name, url)
                .with_description(normalize_text(it.description.as_deref().unwrap_or_default()));
            if !it.category.is_empty() {
                let cats: Vec<String> = it.category.iter().map(|c| normalize_text(c)).collect();
                rec = rec.with_raw("categories", cats.into());
            }
            if let Some(ts) = it.pub_date.as_deref().and_then(parse_rfc2822_to_unix) {
                rec = rec.with_raw("published_at", ts.into());
            }
            out.push(rec);
        }
        Ok(out)
    }

    async fn download(&self, url: &str, client: &reqwest::Client) -> Result<String> {
        let resp = client
            .get(url)
            .send()
            .await
            .with_context(|| format!("{} http get()", self.name))?;
        check_status(&self.name, resp.status())?;
        resp.text()
            .await
            .with_context(|| format!("{} http .text()", self.name))
    }
}

#[async_trait]
impl SourceAdapter for FeedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<Record>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(permanent(format!("{} adapter is closed", self.name)));
        }
        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http { url, client } => {
                with_retry(&self.name, &self.backoff, Some(&self.limiter), || {
                    self.download(url, client)
                })
                .await?
            }
        };
        Self::parse_items(&self.name, &body)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Non-2xx feed responses are transient; the directory may just be down.
fn check_status(name: &str, status: reqwest::StatusCode) -> Result<()> {
    if !status.is_success() {
        return Err(anyhow!("{name} feed returned {status}"));
    }
    Ok(())
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
