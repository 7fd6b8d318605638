// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::providers::rss::RssFileSource;
use crate::ingest::types::{Item, RawRecord, RecordSource};
use chrono::{DateTime, SecondsFormat, Utc};
use metrics::counter;
use std::collections::HashSet;
use std::path::PathBuf;

pub const UNTITLED: &str = "(untitled)";
pub const PLACEHOLDER_URL: &str = "#";

/// UTC timestamp in ISO-8601 with a trailing `Z`.
pub fn iso_z(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Canonicalize a raw record, filling defaults for absent or blank fields.
/// `now` is the fallback timestamp.
pub fn normalize_record(raw: RawRecord, now: &str) -> Item {
    Item {
        title: non_blank(raw.title).unwrap_or_else(|| UNTITLED.to_string()),
        url: non_blank(raw.url).unwrap_or_else(|| PLACEHOLDER_URL.to_string()),
        source: raw.source.map(|s| s.trim().to_string()).unwrap_or_default(),
        ts: non_blank(raw.ts).unwrap_or_else(|| now.to_string()),
    }
}

/// Parse newline-delimited JSON records.
/// Returns (records, skipped). Blank lines are not records and are not counted.
pub fn parse_ndjson(input: &str) -> (Vec<RawRecord>, usize) {
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (lineno, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<RawRecord>(line) {
            Ok(r) => records.push(r),
            Err(e) => {
                skipped += 1;
                tracing::debug!(target: "ingest", line = lineno + 1, error = %e, "skipping malformed record");
            }
        }
    }
    (records, skipped)
}

/// Remove items whose url was already seen, keeping the first occurrence.
/// Placeholder urls are never treated as duplicates of each other.
/// Returns (kept, removed).
pub fn dedupe_by_url(items: Vec<Item>) -> (Vec<Item>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut keep = Vec::with_capacity(items.len());
    let mut removed = 0usize;

    for it in items {
        let placeholder = it.url.is_empty() || it.url == PLACEHOLDER_URL;
        if !placeholder && !seen.insert(it.url.clone()) {
            removed += 1;
            continue;
        }
        keep.push(it);
    }

    (keep, removed)
}

/// Normalize then deduplicate. Returns (items, dedup_count).
pub fn normalize_dedup(now: &str, raw: Vec<RawRecord>) -> (Vec<Item>, usize) {
    let items = raw.into_iter().map(|r| normalize_record(r, now)).collect();
    dedupe_by_url(items)
}

/// Serialize records as NDJSON, at most `limit` lines.
pub fn write_ndjson(records: &[RawRecord], limit: usize) -> anyhow::Result<String> {
    let mut out = String::new();
    for r in records.iter().take(limit) {
        out.push_str(&serde_json::to_string(r)?);
        out.push('\n');
    }
    Ok(out)
}

/// Collect raw records from every source. A failing source is logged and
/// skipped. Returns (records, skipped_malformed).
pub async fn collect(sources: &[Box<dyn RecordSource>]) -> (Vec<RawRecord>, usize) {
    let mut raw = Vec::new();
    let mut skipped = 0usize;
    for s in sources {
        match s.fetch_records().await {
            Ok((mut v, bad)) => {
                tracing::info!(target: "ingest", source = s.name(), records = v.len(), skipped = bad, "source read");
                raw.append(&mut v);
                skipped += bad;
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, source = s.name(), "source error");
                counter!("newsdesk_source_errors_total").increment(1);
            }
        }
    }
    (raw, skipped)
}

/// One source per configured feed path, each capped at `feed_item_limit`.
pub fn feed_sources(feeds: &[PathBuf], feed_item_limit: usize) -> Vec<Box<dyn RecordSource>> {
    feeds
        .iter()
        .map(|p| Box::new(RssFileSource::new(p, feed_item_limit)) as Box<dyn RecordSource>)
        .collect()
}

/// Read every source, fill defaults, drop repeated urls and render at most
/// `limit` NDJSON lines. `now` stamps records without a timestamp.
/// Returns (body, written, duplicates).
pub async fn harvest(
    sources: &[Box<dyn RecordSource>],
    limit: usize,
    now: DateTime<Utc>,
) -> anyhow::Result<(String, usize, usize)> {
    if sources.is_empty() {
        tracing::warn!(target: "ingest", "no feeds configured; harvest is empty");
    }
    let (raw, _) = collect(sources).await;

    let (items, duplicates) = normalize_dedup(&iso_z(now), raw);
    let records: Vec<RawRecord> = items
        .into_iter()
        .map(|it| RawRecord {
            title: Some(it.title),
            url: Some(it.url),
            source: Some(it.source),
            ts: Some(it.ts),
        })
        .collect();

    let written = records.len().min(limit);
    let body = write_ndjson(&records, limit)?;
    tracing::info!(target: "ingest", written, duplicates, dropped = records.len() - written, "harvest rendered");
    Ok((body, written, duplicates))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: Option<&str>, url: Option<&str>) -> RawRecord {
        RawRecord {
            title: title.map(Into::into),
            url: url.map(Into::into),
            source: None,
            ts: None,
        }
    }

    #[test]
    fn defaults_fill_blank_and_missing_fields() {
        let it = normalize_record(raw(Some("   "), None), "2025-01-01T00:00:00Z");
        assert_eq!(it.title, UNTITLED);
        assert_eq!(it.url, PLACEHOLDER_URL);
        assert_eq!(it.source, "");
        assert_eq!(it.ts, "2025-01-01T00:00:00Z");
    }

    #[test]
    fn title_and_url_are_trimmed() {
        let it = normalize_record(raw(Some("  Hello  "), Some(" https://a.com/x ")), "t");
        assert_eq!(it.title, "Hello");
        assert_eq!(it.url, "https://a.com/x");
    }

    #[test]
    fn malformed_lines_are_counted_not_fatal() {
        let input = "{\"title\":\"a\",\"url\":\"u1\"}\nnot json\n\n[1,2]\n{\"url\":\"u2\",\"extra\":true}\n";
        let (recs, skipped) = parse_ndjson(input);
        assert_eq!(recs.len(), 2);
        assert_eq!(skipped, 2);
        assert_eq!(recs[1].url.as_deref(), Some("u2"));
    }

    #[test]
    fn placeholder_urls_survive_dedup() {
        let (items, removed) = normalize_dedup(
            "t",
            vec![
                raw(Some("a"), None),
                raw(Some("b"), Some("#")),
                raw(Some("c"), Some("https://x.com/1")),
                raw(Some("d"), Some("https://x.com/1")),
            ],
        );
        assert_eq!(removed, 1);
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn iso_z_has_trailing_z() {
        let s = iso_z(Utc::now());
        assert!(s.ends_with('Z'), "{s}");
    }
}
