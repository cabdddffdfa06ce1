//! # Engagement scoring
//! Pure helpers over `raw["metrics"]`. Adapters that know engagement numbers
//! put them there (`likes`, `reposts`, `replies`, `quotes`, `votes`, `comments`).

use serde::Serialize;
use serde_json::Value;

use crate::ingest::types::Record;

const WEIGHTS: &[(&str, f64)] = &[
    ("likes", 1.0),
    ("reposts", 2.0),
    ("replies", 1.5),
    ("quotes", 1.5),
    ("votes", 1.0),
    ("comments", 1.5),
];

/// Weighted sum of known metric fields; missing or non-numeric fields count as 0.
pub fn engagement_score(record: &Record) -> f64 {
    let Some(Value::Object(metrics)) = record.raw.get("metrics") else {
        return 0.0;
    };
    WEIGHTS
        .iter()
        .map(|(field, w)| metrics.get(*field).and_then(Value::as_f64).unwrap_or(0.0) * w)
        .sum()
}

/// Highest-scoring records first; ties keep input order.
pub fn top_by_engagement(records: &[Record], n: usize) -> Vec<(&Record, f64)> {
    let mut scored: Vec<(&Record, f64)> = records.iter().map(|r| (r, engagement_score(r))).collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(n);
    scored
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngagementDistribution {
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub top_10_percent_threshold: f64,
    pub bottom_10_percent_threshold: f64,
}

/// `None` for an empty batch. Percentile thresholds fall back to max/min for
/// ten records or fewer.
pub fn engagement_distribution(records: &[Record]) -> Option<EngagementDistribution> {
    if records.is_empty() {
        return None;
    }
    let mut scores: Vec<f64> = records.iter().map(engagement_score).collect();
    scores.sort_by(f64::total_cmp);

    let len = scores.len();
    let min = scores[0];
    let max = scores[len - 1];
    let (top, bottom) = if len > 10 {
        (scores[len * 9 / 10], scores[len / 10])
    } else {
        (max, min)
    };

    Some(EngagementDistribution {
        min,
        max,
        median: scores[len / 2],
        top_10_percent_threshold: top,
        bottom_10_percent_threshold: bottom,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct TopEntry {
    pub name: String,
    pub url: String,
    pub score: f64,
}

/// Distribution plus the `n` most engaging records of one batch.
#[derive(Debug, Clone, Serialize)]
pub struct EngagementSummary {
    pub distribution: Option<EngagementDistribution>,
    pub top: Vec<TopEntry>,
}

pub fn engagement_summary(records: &[Record], n: usize) -> EngagementSummary {
    EngagementSummary {
        distribution: engagement_distribution(records),
        top: top_by_engagement(records, n)
            .into_iter()
            .map(|(r, score)| TopEntry {
                name: r.name.clone(),
                url: r.url.clone(),
                score,
            })
            .collect(),
    }
}
