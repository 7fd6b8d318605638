// src/cap.rs
//! Per-host output caps.
//!
//! Counting state is an explicit [`HostCounts`] map passed in and handed back,
//! so the order dependency of the global pass (earlier sections spend a host's
//! quota first) is visible at the call site.

use std::collections::HashMap;

use crate::assemble::Section;
use crate::domain::host_of;
use crate::ingest::types::Item;

/// Running number of kept items per normalized host.
pub type HostCounts = HashMap<String, usize>;

/// Keep items in order while their host's running count is below `cap`.
/// Host-less items are always kept and never counted.
/// Returns (kept, dropped).
pub fn cap_items(items: Vec<Item>, cap: usize, counts: &mut HostCounts) -> (Vec<Item>, usize) {
    let mut kept = Vec::with_capacity(items.len());
    let mut dropped = 0usize;

    for it in items {
        let host = host_of(&it.url);
        if host.is_empty() {
            kept.push(it);
            continue;
        }
        let n = counts.entry(host).or_insert(0);
        if *n < cap {
            *n += 1;
            kept.push(it);
        } else {
            dropped += 1;
        }
    }

    (kept, dropped)
}

/// Cap each section on its own, with fresh counts per section.
pub fn cap_per_section(sections: Vec<Section>, cap: usize) -> (Vec<Section>, usize) {
    let mut dropped = 0usize;
    let out = sections
        .into_iter()
        .map(|mut s| {
            let mut counts = HostCounts::new();
            let (kept, d) = cap_items(std::mem::take(&mut s.items), cap, &mut counts);
            dropped += d;
            s.items = kept;
            s
        })
        .collect();
    (out, dropped)
}

/// Truncate every section to its own ceiling.
pub fn truncate_sections(sections: Vec<Section>, ceilings: &[usize]) -> (Vec<Section>, usize) {
    let mut dropped = 0usize;
    let out = sections
        .into_iter()
        .zip(ceilings.iter().copied())
        .map(|(mut s, max)| {
            if s.items.len() > max {
                dropped += s.items.len() - max;
                s.items.truncate(max);
            }
            s
        })
        .collect();
    (out, dropped)
}

/// Re-apply the cap across sections in order, sharing `counts`.
/// Returns the capped sections, the updated counts, and the number dropped.
pub fn cap_global(
    sections: Vec<Section>,
    cap: usize,
    mut counts: HostCounts,
) -> (Vec<Section>, HostCounts, usize) {
    let mut dropped = 0usize;
    let mut out = Vec::with_capacity(sections.len());
    for mut s in sections {
        let (kept, d) = cap_items(std::mem::take(&mut s.items), cap, &mut counts);
        dropped += d;
        s.items = kept;
        out.push(s);
    }
    (out, counts, dropped)
}
