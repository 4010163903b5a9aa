use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::embedding::{EmbeddingError, IndexingError};
use crate::fusion::FusionError;
use crate::graph::GraphError;
use crate::lexical::LexicalError;
use crate::search::SearchError;
use crate::storage::SnapshotError;
use crate::vector::VectorIndexError;

/// Crate-level error
///
/// Component errors convert into this with `?`; the binary wraps it in
/// `anyhow` context.
#[derive(Error, Debug)]
pub enum ResonanceError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every violation found in one validation pass
    #[error("Configuration validation failed:{}", list(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// An environment override that does not parse
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    #[error(transparent)]
    VectorIndex(#[from] VectorIndexError),

    #[error(transparent)]
    Lexical(#[from] LexicalError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Fusion(#[from] FusionError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Indexing(#[from] IndexingError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// One failed configuration check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted key, e.g. `lexical.body.b`
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn list(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| format!("\n  - {}", e)).collect()
}

pub type Result<T> = std::result::Result<T, ResonanceError>;
