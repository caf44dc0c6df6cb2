//! Index lifecycle manager.
//!
//! [`IndexManager`] owns the current index generation and the single-build
//! guard. It has two states:
//!
//! - **NotReady**: no generation yet (initial, or after every build so far failed).
//! - **Ready**: a generation is installed and served read-only.
//!
//! ```text
//!            ensure_built / refresh (ok)
//! NotReady ─────────────────────────────▶ Ready ◀──┐
//!    ▲  │                                    │     │ refresh (ok: swap,
//!    └──┘ build failed                       └─────┘   err: keep old)
//! ```
//!
//! Builds are single-flight: `build_lock` serializes them, and
//! [`ensure_built`](IndexManager::ensure_built) re-checks the state after
//! acquiring it, so callers that arrive during a build wait for it and then
//! reuse its result instead of starting another. A generation is installed
//! only after the whole pipeline (load → chunk → embed) has succeeded.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

use crate::chunk::chunk_document;
use crate::config::{ChunkingConfig, Config, StoreConfig};
use crate::connector_dropbox::DropboxClient;
use crate::embedding::{create_provider, embed_query, embed_texts, EmbeddingProvider};
use crate::error::IndexError;
use crate::ingest::load_corpus;
use crate::models::{Chunk, RetrievedChunk};
use crate::search::{EmbeddingIndex, RetrievalMode};
use crate::traits::FileStore;

/// Snapshot of the manager's state for operators.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub ready: bool,
    /// A file store is configured (token present).
    pub configured: bool,
    pub root_path: String,
    pub documents: usize,
    pub chunks: usize,
    pub total_bytes: u64,
    pub model: Option<String>,
    pub dims: Option<usize>,
    pub mode: Option<RetrievalMode>,
    pub built_at: Option<DateTime<Utc>>,
}

pub struct IndexManager {
    store: Option<Arc<dyn FileStore>>,
    provider: Arc<dyn EmbeddingProvider>,
    store_config: StoreConfig,
    chunking: ChunkingConfig,
    batch_size: usize,
    state: RwLock<Option<Arc<EmbeddingIndex>>>,
    build_lock: Mutex<()>,
}

impl IndexManager {
    /// Create a manager with explicit collaborators. `store = None` means the
    /// store is not configured and builds produce an empty index.
    pub fn new(
        store: Option<Arc<dyn FileStore>>,
        provider: Arc<dyn EmbeddingProvider>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            provider,
            store_config: config.store.clone(),
            chunking: config.chunking.clone(),
            batch_size: config.embedding.batch_size,
            state: RwLock::new(None),
            build_lock: Mutex::new(()),
        }
    }

    /// Wire up the Dropbox client and embedding provider from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = DropboxClient::from_config(&config.store)?
            .map(|client| Arc::new(client) as Arc<dyn FileStore>);
        if store.is_none() {
            tracing::warn!(
                env = %config.store.access_token_env,
                "no file-store token configured; index will be empty"
            );
        }
        let provider = create_provider(&config.embedding)?;
        Ok(Self::new(store, provider, config))
    }

    /// Build the index if no generation is installed yet. No-op once Ready.
    pub async fn ensure_built(&self) -> Result<(), IndexError> {
        if self.state.read().await.is_some() {
            return Ok(());
        }

        let _guard = self.build_lock.lock().await;
        // Another caller may have finished a build while we waited.
        if self.state.read().await.is_some() {
            return Ok(());
        }

        let index = self.build().await?;
        *self.state.write().await = Some(Arc::new(index));
        Ok(())
    }

    /// Rebuild unconditionally and swap in the new generation.
    ///
    /// Returns the number of documents loaded. On failure the previous
    /// generation (if any) keeps serving.
    pub async fn refresh(&self) -> Result<usize, IndexError> {
        let _guard = self.build_lock.lock().await;
        let index = self.build().await?;
        let documents = index.corpus().len();
        *self.state.write().await = Some(Arc::new(index));
        Ok(documents)
    }

    /// Return the `k` chunks most relevant to `query`, building first if needed.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, IndexError> {
        self.ensure_built().await?;
        let index = match self.current().await {
            Some(index) => index,
            None => return Ok(Vec::new()),
        };

        if index.is_empty() || k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        match index.mode() {
            RetrievalMode::Keyword => Ok(index.keyword_search(query, k)),
            RetrievalMode::Semantic => {
                let query_vector = embed_query(self.provider.as_ref(), query)
                    .await
                    .map_err(IndexError::QueryEmbedding)?;
                index.search(&query_vector, k)
            }
        }
    }

    pub async fn is_ready(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// The installed generation, if any.
    pub async fn current(&self) -> Option<Arc<EmbeddingIndex>> {
        self.state.read().await.clone()
    }

    pub async fn stats(&self) -> IndexStats {
        let index = self.current().await;
        let configured = self.store.is_some();
        let root_path = self.store_config.root_path.clone();

        match index {
            Some(index) => IndexStats {
                ready: true,
                configured,
                root_path,
                documents: index.corpus().len(),
                chunks: index.chunks().len(),
                total_bytes: index.total_bytes(),
                model: (!index.model().is_empty()).then(|| index.model().to_string()),
                dims: (index.dims() > 0).then_some(index.dims()),
                mode: Some(index.mode()),
                built_at: Some(index.built_at()),
            },
            None => IndexStats {
                ready: false,
                configured,
                root_path,
                documents: 0,
                chunks: 0,
                total_bytes: 0,
                model: None,
                dims: None,
                mode: None,
                built_at: None,
            },
        }
    }

    /// Run load → chunk → embed. Callers must hold `build_lock`.
    async fn build(&self) -> Result<EmbeddingIndex, IndexError> {
        let store = match &self.store {
            Some(store) => store,
            None => {
                tracing::info!("file store not configured; serving an empty index");
                return Ok(EmbeddingIndex::empty());
            }
        };

        let started = Instant::now();
        tracing::info!(
            store = store.name(),
            root = %self.store_config.root_path,
            "building index"
        );

        let corpus = load_corpus(store.as_ref(), &self.store_config)
            .await
            .map_err(IndexError::Listing)?;

        let mut chunks: Vec<Chunk> = Vec::new();
        for doc in &corpus {
            let doc_chunks = chunk_document(
                doc,
                self.chunking.max_chars,
                self.chunking.overlap_chars,
            )
            .map_err(IndexError::InvalidParameters)?;
            chunks.extend(doc_chunks);
        }

        if !self.provider.is_enabled() {
            tracing::info!(
                documents = corpus.len(),
                chunks = chunks.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "index built (keyword mode, embeddings disabled)"
            );
            return Ok(EmbeddingIndex::keyword(corpus, chunks));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embed_texts(self.provider.as_ref(), &texts, self.batch_size)
            .await
            .map_err(IndexError::Embedding)?;

        // An empty corpus yields no vectors to learn the width from.
        let dims = embeddings
            .first()
            .map(|v| v.len())
            .unwrap_or_else(|| self.provider.dims());
        let index = EmbeddingIndex::semantic(
            corpus,
            chunks,
            embeddings,
            self.provider.model_name(),
            dims,
        )?;

        tracing::info!(
            documents = index.corpus().len(),
            chunks = index.chunks().len(),
            model = index.model(),
            dims,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index built"
        );

        Ok(index)
    }
}
