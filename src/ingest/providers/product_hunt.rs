// src/ingest/providers/product_hunt.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::ingest::normalize_text;
use crate::ingest::rate_limit::RateLimiter;
use crate::ingest::retry::{permanent, with_retry, Backoff};
use crate::ingest::types::{Record, SourceAdapter};

pub const DEFAULT_API_URL: &str = "https://api.producthunt.com/v2/api/graphql";
pub const TOKEN_KEY: &str = "producthunt_access_token";
const SOURCE_TAG: &str = "producthunt";
const AI_TOPICS: &[&str] = &["ai", "artificial-intelligence", "machine-learning"];

const POSTS_QUERY: &str = r#"{
  posts(first: 50, order: NEWEST) {
    edges {
      node {
        name
        tagline
        description
        url
        topics { edges { node { name } } }
        votesCount
        commentsCount
        createdAt
      }
    }
  }
}"#;

#[derive(Debug, Deserialize)]
struct Response {
    data: Option<Data>,
    #[serde(default)]
    errors: Vec<GqlError>,
}
#[derive(Debug, Deserialize)]
struct GqlError {
    message: String,
}
#[derive(Debug, Deserialize)]
struct Data {
    posts: Connection<Post>,
}
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Connection<T> {
    #[serde(default)]
    edges: Vec<Edge<T>>,
}
#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Post {
    name: String,
    tagline: Option<String>,
    description: Option<String>,
    url: String,
    topics: Option<Connection<Topic>>,
    #[serde(default)]
    votes_count: u64,
    #[serde(default)]
    comments_count: u64,
    created_at: Option<String>,
}
#[derive(Debug, Deserialize)]
struct Topic {
    name: String,
}

/// Newest Product Hunt launches tagged with an AI topic.
pub struct ProductHuntAdapter {
    client: reqwest::Client,
    api_url: String,
    token: String,
    limiter: RateLimiter,
    backoff: Backoff,
    closed: AtomicBool,
}

impl ProductHuntAdapter {
    pub fn new(client: reqwest::Client, token: impl Into<String>) -> Self {
        Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
            limiter: RateLimiter::default(),
            backoff: Backoff::default(),
            closed: AtomicBool::new(false),
        }
    }

    /// Params: `producthunt_access_token` (required), `api_url`, `calls_per_second`.
    pub fn from_params(
        client: reqwest::Client,
        params: &BTreeMap<String, String>,
        backoff: Backoff,
    ) -> Result<Self> {
        let token = params
            .get(TOKEN_KEY)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow!("missing `{TOKEN_KEY}`"))?;
        let mut adapter = Self::new(client, token.trim()).with_backoff(backoff);
        if let Some(url) = params.get("api_url") {
            adapter.api_url = url.clone();
        }
        if let Some(cps) = params.get("calls_per_second") {
            let cps: f64 = cps
                .parse()
                .with_context(|| format!("invalid calls_per_second `{cps}`"))?;
            adapter.limiter = RateLimiter::try_new(cps)?;
        }
        Ok(adapter)
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    async fn request_once(&self) -> Result<String> {
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .json(&json!({ "query": POSTS_QUERY }))
            .send()
            .await
            .context("producthunt http post()")?;

        check_status(resp.status())?;
        resp.text().await.context("producthunt http .text()")
    }

    /// Parse a GraphQL response body into records, keeping AI-tagged posts only.
    pub fn parse_posts(body: &str) -> Result<Vec<Record>> {
        let resp: Response = serde_json::from_str(body)
            .map_err(|e| permanent(format!("parsing producthunt response: {e}")))?;

        if let Some(first) = resp.errors.first() {
            return Err(anyhow!("producthunt graphql error: {}", first.message));
        }
        let Some(data) = resp.data else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for edge in data.posts.edges {
            let post = edge.node;
            let topics: Vec<String> = post
                .topics
                .map(|c| c.edges.into_iter().map(|e| e.node.name.to_lowercase()).collect())
                .unwrap_or_default();
            if !topics.iter().any(|t| AI_TOPICS.contains(&t.as_str())) {
                continue;
            }

            // Fall back to the long description when the tagline is blank.
            let blurb = [post.tagline.as_deref(), post.description.as_deref()]
                .into_iter()
                .flatten()
                .map(normalize_text)
                .find(|t| !t.is_empty())
                .unwrap_or_default();

            out.push(
                Record::new(SOURCE_TAG, post.name.trim(), post.url)
                    .with_description(blurb)
                    .with_raw("votes_count", post.votes_count.into())
                    .with_raw("comments_count", post.comments_count.into())
                    .with_raw("created_at", post.created_at.into())
                    .with_raw("topics", topics.into())
                    .with_raw(
                        "metrics",
                        json!({ "votes": post.votes_count, "comments": post.comments_count }),
                    ),
            );
        }
        Ok(out)
    }
}

/// 401/403 are permanent; any other non-2xx is worth retrying.
pub fn check_status(status: reqwest::StatusCode) -> Result<()> {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(permanent(format!("producthunt rejected credentials ({status})")));
    }
    if !status.is_success() {
        return Err(anyhow!("producthunt api error: {status}"));
    }
    Ok(())
}

#[async_trait]
impl SourceAdapter for ProductHuntAdapter {
    fn name(&self) -> &str {
        SOURCE_TAG
    }

    async fn fetch(&self) -> Result<Vec<Record>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(permanent("producthunt adapter is closed"));
        }
        let body = with_retry("producthunt", &self.backoff, Some(&self.limiter), || {
            self.request_once()
        })
        .await?;
        let out = Self::parse_posts(&body)?;
        tracing::info!(adapter = SOURCE_TAG, count = out.len(), "fetched AI launches");
        Ok(out)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(adapter = SOURCE_TAG, "closed");
        }
    }
}
