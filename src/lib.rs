//! # Dropbox RAG
//!
//! Retrieval and indexing backend for a retrieval-augmented chat assistant.
//!
//! Documents are pulled from a Dropbox folder tree, converted to plain text,
//! split into overlapping chunks, embedded, and held in memory. Queries are
//! answered with the top-k most similar chunks, ready for prompt assembly.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────┐   ┌──────────┐   ┌───────────────┐
//! │  FileStore  │──▶│  Reader  │──▶│ Chunker  │──▶│ EmbeddingIndex │
//! │  (Dropbox)  │   │ txt/pdf/ │   │ sliding  │   │  vectors in   │
//! │ paginated   │   │ docx/html│   │ window   │   │    memory     │
//! └─────────────┘   └──────────┘   └──────────┘   └───────┬───────┘
//!                                                         │
//!                                            ┌────────────┴──┐
//!                                            │ IndexManager  │
//!                                            │ single-flight │
//!                                            │ build/refresh │
//!                                            └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export DROPBOX_ACCESS_TOKEN=...
//! rag build                      # walk, chunk and embed the corpus
//! rag search "reset my password" --k 3
//! rag stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`traits`] | Remote file-store trait |
//! | [`connector_dropbox`] | Dropbox HTTP API client |
//! | [`extract`] | Plain-text extraction per file format |
//! | [`ingest`] | Corpus loader |
//! | [`chunk`] | Text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`search`] | In-memory index generation and top-k search |
//! | [`index`] | Index lifecycle (build once, refresh, retrieve) |
//! | [`error`] | Index error types |

pub mod chunk;
pub mod config;
pub mod connector_dropbox;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod models;
pub mod search;
pub mod traits;
