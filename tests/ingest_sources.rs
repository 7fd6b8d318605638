// tests/ingest_sources.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use newsdesk::ingest::{collect, feed_sources, harvest};
use newsdesk::ingest::providers::{ndjson::NdjsonFileSource, rss::RssFileSource};
use newsdesk::ingest::types::{RawRecord, RecordSource};
use std::fs;

struct FailingSource;

#[async_trait]
impl RecordSource for FailingSource {
    async fn fetch_records(&self) -> Result<(Vec<RawRecord>, usize)> {
        anyhow::bail!("feed unreachable")
    }
    fn name(&self) -> &str {
        "failing"
    }
}

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>World Desk</title>
    <item><title>Ceasefire talks resume</title><link>https://world.example/1</link><pubDate>Tue, 03 Jun 2025 07:00:00 GMT</pubDate></item>
    <item><title>Markets open higher</title><link>https://world.example/2</link></item>
  </channel>
</rss>"#;

#[tokio::test]
async fn ndjson_file_counts_malformed_lines() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("in.ndjson");
    fs::write(&p, "{\"title\":\"a\"}\n{oops\n{\"url\":\"https://b.com\"}\n").unwrap();

    let (recs, skipped) = NdjsonFileSource::new(&p).fetch_records().await.unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(skipped, 1);
}

#[tokio::test]
async fn rss_file_maps_entries() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("world.xml");
    fs::write(&p, FEED).unwrap();

    let (recs, _) = RssFileSource::new(&p, 50).fetch_records().await.unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0].source.as_deref(), Some("World Desk"));
    assert_eq!(recs[1].url.as_deref(), Some("https://world.example/2"));
}

#[tokio::test]
async fn failing_and_missing_sources_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.ndjson");
    fs::write(&good, "{\"title\":\"kept\"}\n").unwrap();

    let sources: Vec<Box<dyn RecordSource>> = vec![
        Box::new(FailingSource),
        Box::new(NdjsonFileSource::new(dir.path().join("missing.ndjson"))),
        Box::new(NdjsonFileSource::new(&good)),
    ];
    let (recs, skipped) = collect(&sources).await;
    assert_eq!(recs.len(), 1);
    assert_eq!(skipped, 0);
    assert_eq!(recs[0].title.as_deref(), Some("kept"));
}

const ATOM_FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Wire Mirror</title>
  <entry><title>Ceasefire talks resume (mirror)</title><link href="https://world.example/1"/><updated>2025-06-03T07:05:00Z</updated></entry>
  <entry><title>Grain prices ease</title><link href="https://wire.example/9"/></entry>
  <entry><title>Port strike ends</title><link href="https://wire.example/10"/></entry>
</feed>"#;

#[tokio::test]
async fn harvest_dedupes_across_feeds_and_respects_limit() {
    let dir = tempfile::tempdir().unwrap();
    let rss = dir.path().join("world.xml");
    let atom = dir.path().join("mirror.xml");
    fs::write(&rss, FEED).unwrap();
    fs::write(&atom, ATOM_FEED).unwrap();

    let feeds = vec![rss, dir.path().join("unreadable.xml"), atom];
    let sources = feed_sources(&feeds, 50);
    let now = Utc.with_ymd_and_hms(2025, 6, 3, 8, 0, 0).unwrap();

    // 5 entries, 1 repeated url, so 4 unique records before the limit.
    let (body, written, duplicates) = harvest(&sources, 3, now).await.unwrap();
    assert_eq!(duplicates, 1);
    assert_eq!(written, 3);

    let lines: Vec<RawRecord> = body
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].source.as_deref(), Some("World Desk"));
    assert_eq!(lines[0].title.as_deref(), Some("Ceasefire talks resume"));
    assert_eq!(lines[1].ts.as_deref(), Some("2025-06-03T08:00:00Z"));
    assert_eq!(lines[2].url.as_deref(), Some("https://wire.example/9"));
    assert_eq!(lines[2].ts.as_deref(), Some("2025-06-03T08:00:00Z"));
    assert!(lines.iter().all(|r| r.url.as_deref() != Some("https://wire.example/10")));
}

#[tokio::test]
async fn harvest_without_feeds_is_empty() {
    let now = Utc.with_ymd_and_hms(2025, 6, 3, 8, 0, 0).unwrap();
    let (body, written, duplicates) = harvest(&[], 10, now).await.unwrap();
    assert!(body.is_empty());
    assert_eq!((written, duplicates), (0, 0));
}
