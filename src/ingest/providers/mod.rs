// src/ingest/providers/mod.rs
pub mod ndjson;
pub mod rss;
