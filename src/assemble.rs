// src/assemble.rs
//! Final document assembly: section order, headline choice, generation time.

use serde::Serialize;

use crate::config::SiteCfg;
use crate::ingest::types::Item;

/// A named bucket of items. `key` identifies the rule and is not serialized.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Section {
    #[serde(skip)]
    pub key: String,
    pub title: String,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Headline {
    pub title: String,
    pub url: String,
}

/// The sole output artifact.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Document {
    pub generated_at: String,
    pub headline: Headline,
    pub sections: Vec<Section>,
}

impl Document {
    /// Pretty JSON with non-ASCII characters kept as-is.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// First item of the first non-empty section, else the site fallback.
pub fn pick_headline(sections: &[Section], site: &SiteCfg) -> Headline {
    sections
        .iter()
        .find_map(|s| s.items.first())
        .map(|it| Headline {
            title: it.title.clone(),
            url: it.url.clone(),
        })
        .unwrap_or_else(|| Headline {
            title: site.name.clone(),
            url: site.url.clone(),
        })
}

/// Build the document. Empty sections are kept in place.
pub fn assemble(sections: Vec<Section>, site: &SiteCfg, generated_at: String) -> Document {
    let headline = pick_headline(&sections, site);
    Document {
        generated_at,
        headline,
        sections,
    }
}
