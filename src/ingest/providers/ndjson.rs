// src/ingest/providers/ndjson.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use std::path::PathBuf;

use crate::ingest::parse_ndjson;
use crate::ingest::types::{RawRecord, RecordSource};

/// Reads harvester output: one JSON record per line.
pub struct NdjsonFileSource {
    pub path: PathBuf,
}

impl NdjsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecordSource for NdjsonFileSource {
    async fn fetch_records(&self) -> Result<(Vec<RawRecord>, usize)> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading records from {}", self.path.display()))?;
        let (records, skipped) = parse_ndjson(&content);
        counter!("newsdesk_records_read_total").increment(records.len() as u64);
        Ok((records, skipped))
    }

    fn name(&self) -> &str {
        "ndjson"
    }
}
