//! Core data models used throughout the retrieval pipeline.
//!
//! These types represent the documents, chunks, and retrieval results that
//! flow from the corpus loader through the chunker into the index.

use serde::Serialize;

/// A remote file whose text was extracted successfully.
///
/// Immutable once created; a rebuild replaces the whole corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Stable, opaque identifier assigned by the file store.
    pub id: String,
    /// Full display path in the remote store.
    pub path: String,
    /// Display name, typically the basename of `path`.
    pub title: String,
    /// Extracted plain text.
    pub text: String,
    /// Size of the downloaded payload in bytes.
    pub size: u64,
}

/// A bounded, overlapping slice of a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// `"{doc_id}#{offset}"`; unique and stable across re-chunking.
    pub chunk_id: String,
    pub doc_id: String,
    /// Position among the document's emitted chunks, starting at 0.
    pub index: usize,
    /// Start offset in the document text, in chars.
    pub offset: usize,
    pub title: String,
    pub path: String,
    pub text: String,
}

/// A chunk returned from retrieval, with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub doc_id: String,
    pub title: String,
    pub path: String,
    pub text: String,
    /// Cosine similarity, or a term count in keyword mode.
    pub score: f32,
}

impl RetrievedChunk {
    pub fn from_chunk(chunk: &Chunk, score: f32) -> Self {
        Self {
            chunk_id: chunk.chunk_id.clone(),
            doc_id: chunk.doc_id.clone(),
            title: chunk.title.clone(),
            path: chunk.path.clone(),
            text: chunk.text.clone(),
            score,
        }
    }
}
