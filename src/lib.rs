// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod assemble;
pub mod cap;
pub mod classify;
pub mod config;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod pipeline;

// ---- Re-exports for stable public API ----
pub use crate::assemble::{Document, Headline, Section};
pub use crate::config::{load_default, NewsConfig};
pub use crate::error::ConfigError;
pub use crate::ingest::types::{Item, RawRecord};
pub use crate::pipeline::{Pipeline, RunStats};
