//! Errors surfaced by the index lifecycle.
//!
//! "No results" is never an error: an empty or unconfigured index answers
//! queries with an empty list. These variants are for a broken build or a
//! broken query path.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    /// The remote walk could not list a folder (auth failure, missing root).
    #[error("failed to list remote corpus: {0:#}")]
    Listing(anyhow::Error),

    #[error("embedding call failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error("embedding count mismatch: {chunks} chunks but {embeddings} vectors")]
    EmbeddingCountMismatch { chunks: usize, embeddings: usize },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("failed to embed query: {0:#}")]
    QueryEmbedding(anyhow::Error),

    #[error("invalid index parameters: {0:#}")]
    InvalidParameters(anyhow::Error),
}
