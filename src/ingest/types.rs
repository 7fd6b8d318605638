// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One record as produced by the harvester. Every field is optional;
/// unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
}

/// Canonical news item. `url` is the identity used for deduplication.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Item {
    pub title: String,
    pub url: String,
    pub source: String,
    pub ts: String, // ISO-8601 or feed-native, opaque
}

/// Producer of raw records (the feed-fetcher side of the boundary).
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Returns parsed records plus the number of malformed inputs skipped.
    async fn fetch_records(&self) -> Result<(Vec<RawRecord>, usize)>;
    fn name(&self) -> &str;
}
