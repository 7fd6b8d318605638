// src/classify.rs
//! Section classifier.
//!
//! Configuration rules are compiled into one ordered list of tagged variants:
//! every domain variant (in declaration order) followed by every keyword
//! variant (in declaration order). The first variant that matches decides the
//! section, so a known publisher always beats keyword heuristics. Items no
//! variant matches go to the first declared rule or are dropped, depending on
//! [`UnmatchedPolicy`].

use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

use crate::config::{MatchField, NewsConfig, UnmatchedPolicy};
use crate::domain::host_of;
use crate::ingest::types::Item;

/// How an item was assigned to its section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    Domain,
    Keyword,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict<'a> {
    pub key: &'a str,
    pub by: MatchedBy,
}

#[derive(Debug)]
enum Matcher {
    /// Exact equality against the normalized host.
    Domain(HashSet<String>),
    /// Any pattern found anywhere in the haystack.
    Keyword(Vec<Regex>),
}

#[derive(Debug)]
struct CompiledRule {
    key: String,
    matcher: Matcher,
}

impl CompiledRule {
    fn matches(&self, host: &str, haystack: &str) -> Option<MatchedBy> {
        match &self.matcher {
            Matcher::Domain(set) => {
                (!host.is_empty() && set.contains(host)).then_some(MatchedBy::Domain)
            }
            Matcher::Keyword(patterns) => patterns
                .iter()
                .any(|re| re.is_match(haystack))
                .then_some(MatchedBy::Keyword),
        }
    }
}

/// Case-insensitive pattern; an invalid regex degrades to a literal substring.
fn compile_pattern(rule_key: &str, pattern: &str) -> Option<Regex> {
    let p = pattern.trim();
    if p.is_empty() {
        return None;
    }
    match RegexBuilder::new(p).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(
                target: "classify",
                rule = rule_key,
                pattern = p,
                error = %e,
                "invalid keyword regex; matching literally"
            );
            RegexBuilder::new(&regex::escape(p))
                .case_insensitive(true)
                .build()
                .ok()
        }
    }
}

#[derive(Debug)]
pub struct Classifier {
    rules: Vec<CompiledRule>,
    fallback: Option<String>,
    fields: Vec<MatchField>,
}

impl Classifier {
    pub fn from_config(cfg: &NewsConfig) -> Self {
        let domain_rules = cfg
            .rules
            .iter()
            .filter(|r| !r.domains.is_empty())
            .map(|r| CompiledRule {
                key: r.key.clone(),
                matcher: Matcher::Domain(r.domains.iter().cloned().collect()),
            });

        let keyword_rules = cfg
            .rules
            .iter()
            .map(|r| {
                let patterns: Vec<Regex> = r
                    .any
                    .iter()
                    .filter_map(|p| compile_pattern(&r.key, p))
                    .collect();
                CompiledRule {
                    key: r.key.clone(),
                    matcher: Matcher::Keyword(patterns),
                }
            })
            .filter(|r| matches!(&r.matcher, Matcher::Keyword(p) if !p.is_empty()));

        let rules = domain_rules.chain(keyword_rules).collect();

        let fallback = match cfg.unmatched {
            UnmatchedPolicy::First => cfg.rules.first().map(|r| r.key.clone()),
            UnmatchedPolicy::Drop => None,
        };

        Self {
            rules,
            fallback,
            fields: cfg.match_fields.clone(),
        }
    }

    /// Text searched by keyword rules: the configured fields, newline-joined.
    pub fn haystack(&self, item: &Item) -> String {
        self.fields
            .iter()
            .map(|f| match f {
                MatchField::Title => item.title.as_str(),
                MatchField::Source => item.source.as_str(),
                MatchField::Url => item.url.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Section for `item`, or `None` when unmatched items are dropped.
    pub fn classify(&self, item: &Item) -> Option<Verdict<'_>> {
        let host = host_of(&item.url);
        let haystack = self.haystack(item);

        for rule in &self.rules {
            if let Some(by) = rule.matches(&host, &haystack) {
                return Some(Verdict {
                    key: rule.key.as_str(),
                    by,
                });
            }
        }

        self.fallback.as_deref().map(|key| Verdict {
            key,
            by: MatchedBy::Default,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleCfg;

    fn item(title: &str, url: &str) -> Item {
        Item {
            title: title.into(),
            url: url.into(),
            source: String::new(),
            ts: "t".into(),
        }
    }

    fn cfg(rules: Vec<RuleCfg>) -> NewsConfig {
        let mut c = NewsConfig::builtin();
        c.rules = rules;
        c.validate().unwrap();
        c
    }

    #[test]
    fn domain_beats_keyword_of_an_earlier_rule() {
        let c = cfg(vec![
            RuleCfg::new("military", "Military").with_any(&["weapons"]),
            RuleCfg::new("sport", "Sport").with_domains(&["www.espn.com"]),
        ]);
        let cl = Classifier::from_config(&c);
        let v = cl
            .classify(&item("Team weapons up for derby", "https://espn.com/x"))
            .unwrap();
        assert_eq!(v.key, "sport");
        assert_eq!(v.by, MatchedBy::Domain);
    }

    #[test]
    fn unicode_domain_matches_punycode_url() {
        let c = cfg(vec![
            RuleCfg::new("top", "Top"),
            RuleCfg::new("books", "Books").with_domains(&["Bücher.de"]),
        ]);
        let cl = Classifier::from_config(&c);
        let v = cl.classify(&item("Neue Titel", "https://www.bücher.de/neu")).unwrap();
        assert_eq!(v.key, "books");
        assert_eq!(v.by, MatchedBy::Domain);
    }

    #[test]
    fn first_declared_domain_rule_wins() {
        let c = cfg(vec![
            RuleCfg::new("a", "A").with_domains(&["x.com"]),
            RuleCfg::new("b", "B").with_domains(&["x.com"]),
        ]);
        let cl = Classifier::from_config(&c);
        assert_eq!(cl.classify(&item("t", "https://x.com/1")).unwrap().key, "a");
    }

    #[test]
    fn keyword_is_case_insensitive_and_ordered() {
        let c = cfg(vec![
            RuleCfg::new("top", "Top"),
            RuleCfg::new("military", "Military").with_any(&["weapons", r"\bnato\b"]),
            RuleCfg::new("politics", "Politics").with_any(&["nato"]),
        ]);
        let cl = Classifier::from_config(&c);
        let v = cl
            .classify(&item("NATO summit opens", "https://a.com/1"))
            .unwrap();
        assert_eq!(v.key, "military");
        assert_eq!(v.by, MatchedBy::Keyword);
    }

    #[test]
    fn url_and_source_are_searched_when_configured() {
        let mut c = cfg(vec![
            RuleCfg::new("top", "Top"),
            RuleCfg::new("tech", "Tech").with_any(&["/technology/"]),
        ]);
        let cl = Classifier::from_config(&c);
        let it = item("Something happened", "https://a.com/technology/1");
        assert_eq!(cl.classify(&it).unwrap().key, "tech");

        c.match_fields = vec![MatchField::Title];
        let cl = Classifier::from_config(&c);
        assert_eq!(cl.classify(&it).unwrap().key, "top");
    }

    #[test]
    fn unmatched_policy_first_or_drop() {
        let mut c = cfg(vec![
            RuleCfg::new("top", "Top"),
            RuleCfg::new("tech", "Tech").with_any(&["chip"]),
        ]);
        let it = item("Weather is nice", "https://a.com/1");

        let cl = Classifier::from_config(&c);
        let v = cl.classify(&it).unwrap();
        assert_eq!(v, Verdict { key: "top", by: MatchedBy::Default });

        c.unmatched = UnmatchedPolicy::Drop;
        assert!(Classifier::from_config(&c).classify(&it).is_none());
    }

    #[test]
    fn invalid_regex_matches_literally() {
        let c = cfg(vec![
            RuleCfg::new("top", "Top"),
            RuleCfg::new("odd", "Odd").with_any(&["c++ (", ""]),
        ]);
        let cl = Classifier::from_config(&c);
        assert_eq!(cl.classify(&item("Why C++ ( matters", "#")).unwrap().key, "odd");
        assert_eq!(cl.classify(&item("Rust", "#")).unwrap().key, "top");
    }

    #[test]
    fn hostless_items_can_still_match_keywords() {
        let c = cfg(vec![
            RuleCfg::new("top", "Top").with_domains(&["a.com"]),
            RuleCfg::new("tech", "Tech").with_any(&["chip"]),
        ]);
        let cl = Classifier::from_config(&c);
        assert_eq!(cl.classify(&item("New chip", "#")).unwrap().key, "tech");
    }
}
