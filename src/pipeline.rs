// src/pipeline.rs
//! One synchronous run: normalize → dedupe → skip → classify → cap → assemble.
//! Pure over its inputs apart from the generation timestamp.

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use std::collections::{HashMap, HashSet};

use crate::assemble::{assemble, Document, Section};
use crate::cap::{cap_global, cap_per_section, truncate_sections, HostCounts};
use crate::classify::{Classifier, MatchedBy};
use crate::config::NewsConfig;
use crate::domain::host_of;
use crate::error::ConfigError;
use crate::ingest::types::{Item, RawRecord};
use crate::ingest::{iso_z, normalize_dedup, parse_ndjson};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("newsdesk_records_total", "Raw records entering the pipeline.");
        describe_counter!("newsdesk_malformed_total", "Input lines skipped as malformed.");
        describe_counter!("newsdesk_dedup_total", "Items removed as duplicate urls.");
        describe_counter!(
            "newsdesk_skipped_domain_total",
            "Items dropped because their host is in skip_domains."
        );
        describe_counter!(
            "newsdesk_unmatched_total",
            "Items dropped by the strict unmatched policy."
        );
        describe_counter!("newsdesk_capped_total", "Items removed by max_items or host caps.");
        describe_counter!("newsdesk_emitted_total", "Items written to the document.");
    });
}

/// Per-run counters, also logged at the end of each run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub records: usize,
    pub malformed: usize,
    pub duplicates: usize,
    pub skipped_domains: usize,
    pub unmatched: usize,
    pub by_domain: usize,
    pub by_keyword: usize,
    pub by_default: usize,
    pub truncated: usize,
    pub capped_section: usize,
    pub capped_global: usize,
    pub emitted: usize,
}

#[derive(Debug)]
pub struct Pipeline {
    cfg: NewsConfig,
    classifier: Classifier,
}

impl Pipeline {
    pub fn new(mut cfg: NewsConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let classifier = Classifier::from_config(&cfg);
        Ok(Self { cfg, classifier })
    }

    pub fn config(&self) -> &NewsConfig {
        &self.cfg
    }

    /// Run over NDJSON text; malformed lines are counted in the stats.
    pub fn run_ndjson(&self, input: &str, now: DateTime<Utc>) -> (Document, RunStats) {
        let (records, malformed) = parse_ndjson(input);
        self.run_at(records, malformed, now)
    }

    /// Run with the current time as `generated_at`.
    pub fn run(&self, raw: Vec<RawRecord>, malformed: usize) -> (Document, RunStats) {
        self.run_at(raw, malformed, Utc::now())
    }

    /// Full run. `now` is used for `generated_at` and for missing item timestamps.
    pub fn run_at(
        &self,
        raw: Vec<RawRecord>,
        malformed: usize,
        now: DateTime<Utc>,
    ) -> (Document, RunStats) {
        ensure_metrics_described();
        let stamp = iso_z(now);
        let mut stats = RunStats {
            records: raw.len(),
            malformed,
            ..RunStats::default()
        };

        let (items, duplicates) = normalize_dedup(&stamp, raw);
        stats.duplicates = duplicates;

        let (items, skipped) = self.drop_skipped_domains(items);
        stats.skipped_domains = skipped;

        let sections = self.classify_into_sections(items, &mut stats);
        let sections = self.apply_caps(sections, &mut stats);
        stats.emitted = sections.iter().map(|s| s.items.len()).sum();

        let doc = assemble(sections, &self.cfg.site, stamp);
        record_metrics(&stats);
        tracing::info!(
            target: "pipeline",
            records = stats.records,
            malformed = stats.malformed,
            duplicates = stats.duplicates,
            unmatched = stats.unmatched,
            capped = stats.truncated + stats.capped_section + stats.capped_global,
            emitted = stats.emitted,
            "document assembled"
        );
        (doc, stats)
    }

    fn drop_skipped_domains(&self, items: Vec<Item>) -> (Vec<Item>, usize) {
        if self.cfg.skip_domains.is_empty() {
            return (items, 0);
        }
        let skip: HashSet<&str> = self.cfg.skip_domains.iter().map(String::as_str).collect();
        let before = items.len();
        let kept: Vec<Item> = items
            .into_iter()
            .filter(|it| !skip.contains(host_of(&it.url).as_str()))
            .collect();
        let dropped = before - kept.len();
        (kept, dropped)
    }

    /// Bucket items into one section per rule, in declaration order.
    pub fn classify_into_sections(&self, items: Vec<Item>, stats: &mut RunStats) -> Vec<Section> {
        let mut sections: Vec<Section> = self
            .cfg
            .rules
            .iter()
            .map(|r| Section {
                key: r.key.clone(),
                title: r.title().to_string(),
                items: Vec::new(),
            })
            .collect();
        let index: HashMap<String, usize> = sections
            .iter()
            .enumerate()
            .map(|(i, s)| (s.key.clone(), i))
            .collect();

        for it in items {
            let slot = match self.classifier.classify(&it) {
                Some(v) => {
                    match v.by {
                        MatchedBy::Domain => stats.by_domain += 1,
                        MatchedBy::Keyword => stats.by_keyword += 1,
                        MatchedBy::Default => stats.by_default += 1,
                    }
                    tracing::debug!(target: "classify", url = %it.url, section = v.key, by = ?v.by, "classified");
                    index.get(v.key).copied()
                }
                None => None,
            };
            match slot {
                Some(i) => sections[i].items.push(it),
                None => {
                    stats.unmatched += 1;
                    tracing::debug!(target: "classify", url = %it.url, "no rule matched; dropped");
                }
            }
        }
        sections
    }

    /// Host cap per section, then `max_items`, then the shared global host cap.
    pub fn apply_caps(&self, sections: Vec<Section>, stats: &mut RunStats) -> Vec<Section> {
        let cap = self.cfg.per_domain_cap;
        let ceilings: Vec<usize> = self.cfg.rules.iter().map(|r| r.max_items).collect();

        let (sections, capped) = cap_per_section(sections, cap);
        stats.capped_section = capped;

        let (sections, truncated) = truncate_sections(sections, &ceilings);
        stats.truncated = truncated;

        let (sections, _counts, capped) = cap_global(sections, cap, HostCounts::new());
        stats.capped_global = capped;

        sections
    }
}

fn record_metrics(stats: &RunStats) {
    counter!("newsdesk_records_total").increment(stats.records as u64);
    counter!("newsdesk_malformed_total").increment(stats.malformed as u64);
    counter!("newsdesk_dedup_total").increment(stats.duplicates as u64);
    counter!("newsdesk_skipped_domain_total").increment(stats.skipped_domains as u64);
    counter!("newsdesk_unmatched_total").increment(stats.unmatched as u64);
    counter!("newsdesk_capped_total")
        .increment((stats.truncated + stats.capped_section + stats.capped_global) as u64);
    counter!("newsdesk_emitted_total").increment(stats.emitted as u64);
}
