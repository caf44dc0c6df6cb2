//! One in-memory index generation and its top-k search.
//!
//! An [`EmbeddingIndex`] owns the corpus, its chunks, and one vector per
//! chunk (parallel arrays). It is immutable after construction; a rebuild
//! produces a new generation that replaces this one wholesale.
//!
//! Two retrieval modes exist:
//!
//! | Mode | Built when | Scoring |
//! |------|-----------|---------|
//! | [`RetrievalMode::Semantic`] | an embedding provider is enabled | cosine similarity vs. the query vector |
//! | [`RetrievalMode::Keyword`] | the provider is `disabled` | summed occurrences of the query's word tokens |
//!
//! Both sort descending with a stable sort, so equal scores keep corpus
//! order and repeated searches on one generation return identical rankings.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::embedding::cosine_similarity;
use crate::error::IndexError;
use crate::models::{Chunk, Document, RetrievedChunk};

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    Semantic,
    Keyword,
}

impl std::fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalMode::Semantic => write!(f, "semantic"),
            RetrievalMode::Keyword => write!(f, "keyword"),
        }
    }
}

#[derive(Debug)]
pub struct EmbeddingIndex {
    corpus: Vec<Document>,
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
    model: String,
    dims: usize,
    mode: RetrievalMode,
    built_at: DateTime<Utc>,
}

impl EmbeddingIndex {
    /// A ready index with nothing in it (store not configured).
    pub fn empty() -> Self {
        Self {
            corpus: Vec::new(),
            chunks: Vec::new(),
            embeddings: Vec::new(),
            model: String::new(),
            dims: 0,
            mode: RetrievalMode::Semantic,
            built_at: Utc::now(),
        }
    }

    /// Assemble a semantic generation.
    ///
    /// Fails unless there is exactly one vector per chunk and every vector
    /// has `dims` components.
    pub fn semantic(
        corpus: Vec<Document>,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
        model: impl Into<String>,
        dims: usize,
    ) -> Result<Self, IndexError> {
        if chunks.len() != embeddings.len() {
            return Err(IndexError::EmbeddingCountMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        if let Some(bad) = embeddings.iter().find(|v| v.len() != dims) {
            return Err(IndexError::DimensionMismatch {
                expected: dims,
                actual: bad.len(),
            });
        }

        Ok(Self {
            corpus,
            chunks,
            embeddings,
            model: model.into(),
            dims,
            mode: RetrievalMode::Semantic,
            built_at: Utc::now(),
        })
    }

    /// Assemble a vectorless generation served by [`keyword_search`](Self::keyword_search).
    pub fn keyword(corpus: Vec<Document>, chunks: Vec<Chunk>) -> Self {
        Self {
            corpus,
            chunks,
            embeddings: Vec::new(),
            model: String::new(),
            dims: 0,
            mode: RetrievalMode::Keyword,
            built_at: Utc::now(),
        }
    }

    /// Score every chunk against `query_vector` and return the best `k`.
    pub fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>, IndexError> {
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if self.mode == RetrievalMode::Semantic && query_vector.len() != self.dims {
            return Err(IndexError::DimensionMismatch {
                expected: self.dims,
                actual: query_vector.len(),
            });
        }

        let scored: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(query_vector, v)))
            .collect();

        Ok(self.top_k(scored, k))
    }

    /// Rank chunks by how often the query's word tokens occur in them.
    ///
    /// Tokens are `\w+` runs of the lowercased query, deduplicated; a chunk's
    /// score is the total number of occurrences of those tokens as substrings
    /// of its lowercased text. Chunks scoring zero are dropped.
    pub fn keyword_search(&self, query: &str, k: usize) -> Vec<RetrievedChunk> {
        if self.chunks.is_empty() || k == 0 {
            return Vec::new();
        }

        let query = query.to_lowercase();
        let terms: BTreeSet<&str> = WORD_RE.find_iter(&query).map(|m| m.as_str()).collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let scored: Vec<(usize, f32)> = self
            .chunks
            .iter()
            .enumerate()
            .filter_map(|(i, chunk)| {
                let text = chunk.text.to_lowercase();
                let hits: usize = terms.iter().map(|t| text.matches(t).count()).sum();
                (hits > 0).then_some((i, hits as f32))
            })
            .collect();

        self.top_k(scored, k)
    }

    fn top_k(&self, mut scored: Vec<(usize, f32)>, k: usize) -> Vec<RetrievedChunk> {
        // Stable: ties keep chunk order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        scored
            .into_iter()
            .map(|(i, score)| RetrievedChunk::from_chunk(&self.chunks[i], score))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn mode(&self) -> RetrievalMode {
        self.mode
    }

    pub fn corpus(&self) -> &[Document] {
        &self.corpus
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Sum of downloaded document sizes, in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.corpus.iter().map(|d| d.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            chunk_id: format!("{}#0", id),
            doc_id: id.to_string(),
            index: 0,
            offset: 0,
            title: format!("{}.md", id),
            path: format!("/RAG_Sources/{}.md", id),
            text: text.to_string(),
        }
    }

    fn doc(id: &str, size: u64) -> Document {
        Document {
            id: id.to_string(),
            path: format!("/RAG_Sources/{}.md", id),
            title: format!("{}.md", id),
            text: "x".to_string(),
            size,
        }
    }

    fn semantic_index() -> EmbeddingIndex {
        let chunks = vec![
            chunk("a", "alpha"),
            chunk("b", "beta"),
            chunk("c", "gamma"),
            chunk("d", "delta"),
        ];
        let embeddings = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.7, 0.7],
            vec![1.0, 0.0],
        ];
        EmbeddingIndex::semantic(vec![doc("a", 10), doc("b", 32)], chunks, embeddings, "m", 2)
            .unwrap()
    }

    #[test]
    fn test_search_orders_by_descending_similarity() {
        let index = semantic_index();
        let results = index.search(&[1.0, 0.1], 3).unwrap();
        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // a and d tie; a comes first in chunk order.
        assert_eq!(results[0].doc_id, "a");
        assert_eq!(results[1].doc_id, "d");
        assert_eq!(results[2].doc_id, "c");
    }

    #[test]
    fn test_search_is_repeatable() {
        let index = semantic_index();
        let first = index.search(&[0.5, 0.5], 4).unwrap();
        let second = index.search(&[0.5, 0.5], 4).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_search_k_larger_than_corpus() {
        let index = semantic_index();
        assert_eq!(index.search(&[1.0, 0.0], 50).unwrap().len(), 4);
        assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_search_rejects_wrong_query_dims() {
        let index = semantic_index();
        let err = index.search(&[1.0, 0.0, 0.0], 2).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = EmbeddingIndex::empty();
        assert!(index.is_empty());
        assert!(index.search(&[1.0], 3).unwrap().is_empty());
        assert!(index.keyword_search("anything", 3).is_empty());
    }

    #[test]
    fn test_semantic_rejects_count_mismatch() {
        let err = EmbeddingIndex::semantic(vec![], vec![chunk("a", "x")], vec![], "m", 2)
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::EmbeddingCountMismatch {
                chunks: 1,
                embeddings: 0
            }
        ));
    }

    #[test]
    fn test_semantic_rejects_mixed_dims() {
        let err = EmbeddingIndex::semantic(
            vec![],
            vec![chunk("a", "x"), chunk("b", "y")],
            vec![vec![1.0, 0.0], vec![1.0]],
            "m",
            2,
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_keyword_search_counts_terms() {
        let index = EmbeddingIndex::keyword(
            vec![],
            vec![
                chunk("a", "The VPN client reconnects."),
                chunk("b", "VPN setup: install the VPN profile, then test the vpn."),
                chunk("c", "Printer drivers."),
            ],
        );
        let results = index.keyword_search("VPN vpn?", 5);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].doc_id, "b");
        assert_eq!(results[0].score, 3.0);
        assert_eq!(results[1].doc_id, "a");
        assert_eq!(index.mode(), RetrievalMode::Keyword);
    }

    #[test]
    fn test_keyword_search_blank_query() {
        let index = EmbeddingIndex::keyword(vec![], vec![chunk("a", "text")]);
        assert!(index.keyword_search("  ?! ", 5).is_empty());
    }

    #[test]
    fn test_total_bytes_sums_corpus() {
        assert_eq!(semantic_index().total_bytes(), 42);
    }
}
