// src/ingest/dedup.rs
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use crate::ingest::types::Record;

/// SHA-256 hex of `name`, a NUL separator, then `url`. Case-sensitive, no normalization.
pub fn dedup_key(name: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Drop records whose `(name, url)` was already seen. First occurrence wins and
/// keeps its position; later duplicates are discarded, never merged.
pub fn dedup_records<I>(records: I) -> Vec<Record>
where
    I: IntoIterator<Item = Record>,
{
    let mut seen: HashSet<String> = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert(r.dedup_key()))
        .collect()
}
