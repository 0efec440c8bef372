//! Error types for loading resources and running the generator.
//!
//! Only start-up work can fail: reading the vocabulary, cluster paths,
//! language model, vectors, caches and options. Candidate generation never
//! errors, and a sentence that cannot be cleaned is reported through
//! [`SentenceOutcome::Abandoned`](crate::core::types::SentenceOutcome).

use std::io;

use thiserror::Error;

/// The main error type for lexnorm operations.
#[derive(Error, Debug)]
pub enum NormError {
    /// I/O errors (missing or unreadable input files, failed writes)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A cluster path record without exactly three tab-separated fields,
    /// or with a count that is not a non-negative integer.
    #[error("Malformed cluster record on line {line}: {content:?}")]
    MalformedCluster { line: usize, content: String },

    /// Errors while reading an ARPA language model
    #[error("Language model error: {0}")]
    LanguageModel(String),

    /// Errors while reading word vectors or a neighbour table
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// JSON errors (options file)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Neighbour cache (de)serialization errors
    #[error("Cache error: {0}")]
    Cache(#[from] bincode::Error),

    /// Invalid engine options
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for operations that may fail with [`NormError`].
pub type Result<T> = std::result::Result<T, NormError>;

impl NormError {
    /// Create a new malformed cluster record error.
    pub fn malformed_cluster<S: Into<String>>(line: usize, content: S) -> Self {
        NormError::MalformedCluster {
            line,
            content: content.into(),
        }
    }

    /// Create a new language model error.
    pub fn language_model<S: Into<String>>(msg: S) -> Self {
        NormError::LanguageModel(msg.into())
    }

    /// Create a new embedding error.
    pub fn embedding<S: Into<String>>(msg: S) -> Self {
        NormError::Embedding(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        NormError::Config(msg.into())
    }
}
