use std::path::PathBuf;
use thiserror::Error;

/// Configuration problems that stop a run before any item is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration has no rules")]
    NoRules,
    #[error("rule #{0} has an empty key")]
    EmptyKey(usize),
    #[error("duplicate rule key `{0}`")]
    DuplicateKey(String),
    #[error("invalid configuration: {0}")]
    Parse(String),
    #[error("reading configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
