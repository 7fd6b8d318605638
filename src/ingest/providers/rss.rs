// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::path::PathBuf;

use crate::ingest::types::{RawRecord, RecordSource};

pub const DEFAULT_FEED_ITEM_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    title: Option<String>,
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl AtomEntry {
    /// `rel="alternate"` (or no rel) wins over other link kinds.
    fn page_link(&self) -> Option<String> {
        self.link
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.link.first())
            .and_then(|l| l.href.clone())
    }
}

fn trimmed(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string())
}

fn rss_records(rss: Rss, limit: usize) -> Vec<RawRecord> {
    let source = trimmed(rss.channel.title).unwrap_or_default();
    rss.channel
        .item
        .into_iter()
        .take(limit)
        .map(|it| RawRecord {
            title: trimmed(it.title),
            url: trimmed(it.link),
            source: Some(source.clone()),
            ts: it.pub_date,
        })
        .collect()
}

fn atom_records(feed: AtomFeed, limit: usize) -> Vec<RawRecord> {
    let source = trimmed(feed.title).unwrap_or_default();
    feed.entry
        .into_iter()
        .take(limit)
        .map(|e| RawRecord {
            url: trimmed(e.page_link()),
            title: trimmed(e.title),
            source: Some(source.clone()),
            ts: e.published.or(e.updated),
        })
        .collect()
}

/// Parse an RSS 2.0 or Atom document into raw records, taking at most
/// `limit` entries. The channel/feed title becomes each record's `source`;
/// `ts` is the entry's publication date (Atom: else its update date), verbatim.
pub fn parse_feed(xml: &str, limit: usize) -> Result<Vec<RawRecord>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);

    let out = match from_str::<Rss>(&xml_clean) {
        Ok(rss) => rss_records(rss, limit),
        Err(rss_err) if !xml_clean.contains("<feed") => {
            return Err(rss_err).context("parsing rss xml");
        }
        Err(rss_err) => {
            let feed: AtomFeed = from_str(&xml_clean)
                .with_context(|| format!("not rss ({rss_err}) and not atom"))
                .context("parsing feed xml")?;
            atom_records(feed, limit)
        }
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("newsdesk_feed_parse_ms").record(ms);
    counter!("newsdesk_feed_entries_total").increment(out.len() as u64);

    Ok(out)
}

/// A locally stored RSS or Atom feed (fetched by an external step).
pub struct RssFileSource {
    pub path: PathBuf,
    pub limit: usize,
}

impl RssFileSource {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit,
        }
    }
}

#[async_trait]
impl RecordSource for RssFileSource {
    async fn fetch_records(&self) -> Result<(Vec<RawRecord>, usize)> {
        let xml = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading feed {}", self.path.display()))?;
        let records = parse_feed(&xml, self.limit)
            .with_context(|| format!("feed {}", self.path.display()))?;
        Ok((records, 0))
    }

    fn name(&self) -> &str {
        "rss"
    }
}

// Feeds routinely carry HTML entities that are not defined in XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
