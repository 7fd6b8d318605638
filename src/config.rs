// src/config.rs
//! Run configuration: ordered section rules plus capping and headline settings.
//!
//! Loaded from TOML or JSON. Resolution order for [`load_default`]:
//! 1) explicit path (CLI `--config`)
//! 2) `$NEWSDESK_CONFIG_PATH`
//! 3) `config/newsdesk.toml`
//! 4) `config/newsdesk.json`
//! 5) [`NewsConfig::builtin`]
//!
//! A missing file is never fatal; a file that exists but is structurally
//! invalid (no `rules`, empty or duplicate keys) is.

use crate::domain::normalize_host;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "NEWSDESK_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/newsdesk.toml";
pub const DEFAULT_JSON_PATH: &str = "config/newsdesk.json";

pub const DEFAULT_MAX_ITEMS: usize = 40;
pub const DEFAULT_PER_DOMAIN_CAP: usize = 3;
pub const DEFAULT_HARVEST_LIMIT: usize = 200;

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}
fn default_per_domain_cap() -> usize {
    DEFAULT_PER_DOMAIN_CAP
}
fn default_feed_item_limit() -> usize {
    crate::ingest::providers::rss::DEFAULT_FEED_ITEM_LIMIT
}
fn default_harvest_limit() -> usize {
    DEFAULT_HARVEST_LIMIT
}
fn default_match_fields() -> Vec<MatchField> {
    vec![MatchField::Title, MatchField::Source, MatchField::Url]
}

/// One section rule. Declaration order is both evaluation order and output order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleCfg {
    pub key: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Exact host matches (normalized like item hosts).
    #[serde(default)]
    pub domains: Vec<String>,
    /// Case-insensitive regex patterns; plain words act as substrings.
    #[serde(default)]
    pub any: Vec<String>,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

impl RuleCfg {
    pub fn new(key: &str, title: &str) -> Self {
        Self {
            key: key.to_string(),
            title: Some(title.to_string()),
            domains: Vec::new(),
            any: Vec::new(),
            max_items: DEFAULT_MAX_ITEMS,
        }
    }

    pub fn with_domains(mut self, domains: &[&str]) -> Self {
        self.domains = domains.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_any(mut self, patterns: &[&str]) -> Self {
        self.any = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Section title shown in the document; falls back to the key.
    pub fn title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.key)
    }
}

/// What happens to an item no rule matched.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedPolicy {
    /// Assign to the first declared rule.
    #[default]
    First,
    /// Drop the item.
    Drop,
}

/// Item fields searched by keyword patterns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
    Title,
    Source,
    Url,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteCfg {
    pub name: String,
    pub url: String,
}

impl Default for SiteCfg {
    fn default() -> Self {
        Self {
            name: "Newsdesk".to_string(),
            url: crate::ingest::PLACEHOLDER_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsConfig {
    pub rules: Vec<RuleCfg>,
    #[serde(default = "default_per_domain_cap")]
    pub per_domain_cap: usize,
    #[serde(default)]
    pub skip_domains: Vec<String>,
    #[serde(default)]
    pub unmatched: UnmatchedPolicy,
    #[serde(default = "default_match_fields")]
    pub match_fields: Vec<MatchField>,
    #[serde(default)]
    pub site: SiteCfg,
    /// Local RSS files read by the harvest step.
    #[serde(default)]
    pub feeds: Vec<PathBuf>,
    #[serde(default = "default_feed_item_limit")]
    pub feed_item_limit: usize,
    #[serde(default = "default_harvest_limit")]
    pub harvest_limit: usize,
}

impl NewsConfig {
    /// Minimal rule set used when no configuration file exists.
    /// The first rule has no patterns and collects unmatched items.
    pub fn builtin() -> Self {
        Self {
            rules: vec![
                RuleCfg::new("top", "Top Stories"),
                RuleCfg::new("military", "Military & Defense")
                    .with_domains(&["defensenews.com", "breakingdefense.com", "militarytimes.com"])
                    .with_any(&[
                        "weapons?",
                        "military",
                        r"\bnato\b",
                        "missile",
                        "troops",
                        "defen[cs]e",
                        r"\barmy\b",
                        r"\bdrones?\b",
                    ]),
                RuleCfg::new("politics", "Politics")
                    .with_domains(&["politico.com", "thehill.com"])
                    .with_any(&[
                        "election",
                        "senate",
                        "congress",
                        "parliament",
                        "president",
                        "minister",
                    ]),
                RuleCfg::new("economy", "Economy").with_any(&[
                    "inflation",
                    "economy",
                    "tariffs?",
                    "stocks?",
                    r"\bmarkets?\b",
                    "central bank",
                ]),
                RuleCfg::new("tech", "Technology").with_any(&[
                    r"\bai\b",
                    "software",
                    "semiconductor",
                    "cyber",
                    "startup",
                ]),
            ],
            per_domain_cap: DEFAULT_PER_DOMAIN_CAP,
            skip_domains: Vec::new(),
            unmatched: UnmatchedPolicy::First,
            match_fields: default_match_fields(),
            site: SiteCfg::default(),
            feeds: Vec::new(),
            feed_item_limit: default_feed_item_limit(),
            harvest_limit: DEFAULT_HARVEST_LIMIT,
        }
    }

    /// Parse from a string. `hint_ext` is the file extension, if any.
    pub fn from_str_hint(s: &str, hint_ext: &str) -> Result<Self, ConfigError> {
        let mut cfg = parse_config(s, hint_ext)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit, existing path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = Self::from_str_hint(&content, ext.as_str())?;
        tracing::info!(target: "config", path = %path.display(), rules = cfg.rules.len(), "configuration loaded");
        Ok(cfg)
    }

    /// Check structure and normalize domain lists in place.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.rules.is_empty() {
            return Err(ConfigError::NoRules);
        }
        let mut keys = HashSet::new();
        for (i, r) in self.rules.iter_mut().enumerate() {
            r.key = r.key.trim().to_string();
            if r.key.is_empty() {
                return Err(ConfigError::EmptyKey(i));
            }
            if !keys.insert(r.key.clone()) {
                return Err(ConfigError::DuplicateKey(r.key.clone()));
            }
            r.domains = clean_domains(std::mem::take(&mut r.domains));
        }
        self.skip_domains = clean_domains(std::mem::take(&mut self.skip_domains));
        if self.match_fields.is_empty() {
            self.match_fields = default_match_fields();
        }
        Ok(())
    }
}

/// Resolve and load configuration (see module docs for the order).
pub fn load_default(explicit: Option<&Path>) -> Result<NewsConfig, ConfigError> {
    let candidates: Vec<PathBuf> = match explicit {
        Some(p) => vec![p.to_path_buf()],
        None => match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => vec![PathBuf::from(p)],
            Err(_) => vec![
                PathBuf::from(DEFAULT_TOML_PATH),
                PathBuf::from(DEFAULT_JSON_PATH),
            ],
        },
    };

    for p in &candidates {
        if p.exists() {
            return NewsConfig::load_from(p);
        }
    }

    tracing::warn!(
        target: "config",
        tried = ?candidates,
        "no configuration file found; using built-in rules"
    );
    Ok(NewsConfig::builtin())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<NewsConfig, ConfigError> {
    let looks_json = s.trim_start().starts_with('{');
    let try_toml_first = hint_ext == "toml" || (hint_ext != "json" && !looks_json);

    let first = if try_toml_first { parse_toml(s) } else { parse_json(s) };
    match first {
        Ok(cfg) => Ok(cfg),
        Err(primary) => {
            let second = if try_toml_first { parse_json(s) } else { parse_toml(s) };
            second.map_err(|_| ConfigError::Parse(primary))
        }
    }
}

fn parse_toml(s: &str) -> Result<NewsConfig, String> {
    toml::from_str(s).map_err(|e| e.to_string())
}

fn parse_json(s: &str) -> Result<NewsConfig, String> {
    serde_json::from_str(s).map_err(|e| e.to_string())
}

fn clean_domains(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|d| normalize_host(&d))
        .filter(|d| !d.is_empty() && seen.insert(d.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_defaults_apply() {
        let s = r#"
[[rules]]
key = "world"
any = ["war"]

[[rules]]
key = "sport"
title = "Sport"
domains = ["WWW.ESPN.com", "espn.com", ""]
max_items = 5
"#;
        let cfg = NewsConfig::from_str_hint(s, "toml").unwrap();
        assert_eq!(cfg.per_domain_cap, DEFAULT_PER_DOMAIN_CAP);
        assert_eq!(cfg.unmatched, UnmatchedPolicy::First);
        assert_eq!(cfg.rules[0].title(), "world");
        assert_eq!(cfg.rules[0].max_items, DEFAULT_MAX_ITEMS);
        assert_eq!(cfg.rules[1].domains, vec!["espn.com".to_string()]);
        assert_eq!(cfg.rules[1].max_items, 5);
        assert_eq!(cfg.match_fields.len(), 3);
    }

    #[test]
    fn json_is_accepted_without_hint() {
        let s = r#"{"rules":[{"key":"a"}],"per_domain_cap":1,"unmatched":"drop","skip_domains":["www.Spam.com"]}"#;
        let cfg = NewsConfig::from_str_hint(s, "").unwrap();
        assert_eq!(cfg.per_domain_cap, 1);
        assert_eq!(cfg.unmatched, UnmatchedPolicy::Drop);
        assert_eq!(cfg.skip_domains, vec!["spam.com".to_string()]);
    }

    #[test]
    fn missing_rules_is_fatal() {
        let err = NewsConfig::from_str_hint("per_domain_cap = 2", "toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "{err:?}");
    }

    #[test]
    fn empty_and_duplicate_keys_are_fatal() {
        let empty = NewsConfig::from_str_hint(r#"{"rules":[]}"#, "json").unwrap_err();
        assert!(matches!(empty, ConfigError::NoRules));

        let blank = NewsConfig::from_str_hint(r#"{"rules":[{"key":"  "}]}"#, "json").unwrap_err();
        assert!(matches!(blank, ConfigError::EmptyKey(0)));

        let dup =
            NewsConfig::from_str_hint(r#"{"rules":[{"key":"a"},{"key":"a"}]}"#, "json").unwrap_err();
        assert!(matches!(dup, ConfigError::DuplicateKey(k) if k == "a"));
    }

    #[test]
    fn builtin_is_valid() {
        let mut cfg = NewsConfig::builtin();
        cfg.validate().unwrap();
        assert_eq!(cfg.rules[0].key, "top");
    }
}
