//! Corpus loader: walk the remote store and turn files into [`Document`]s.
//!
//! The walk is depth-first with an explicit stack of folders. Every listing
//! follows `has_more` / `cursor` continuation until the store reports no more
//! entries; stopping after the first page would silently drop files from large
//! folders.
//!
//! Candidate files (supported extension, not excluded) are sorted by their
//! lowercased path and downloaded with bounded parallelism. Results come back
//! in that sorted order, so a stable remote tree yields the same corpus every
//! time.
//!
//! Per-file problems never abort the load:
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | listed or downloaded size > `max_bytes_per_file` | skipped |
//! | download fails | skipped (`warn!`) |
//! | reader fails | skipped (`warn!`) |
//! | text is empty after trimming | skipped |
//!
//! A failed *listing* is different: the corpus would be incomplete, so it is
//! returned as an error.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::time::Instant;

use crate::config::StoreConfig;
use crate::extract;
use crate::models::Document;
use crate::traits::{FileStore, RemoteEntry, RemoteFile};

enum FileOutcome {
    Loaded(Document),
    Oversized,
    Empty,
    Failed,
}

/// Load every readable document under `config.root_path`.
pub async fn load_corpus(store: &dyn FileStore, config: &StoreConfig) -> Result<Vec<Document>> {
    let started = Instant::now();
    let exclude_set = build_globset(&config.exclude_globs)?;
    let root_lower = config.root_path.trim_end_matches('/').to_lowercase();

    let mut files: Vec<RemoteFile> = walk_files(store, &config.root_path)
        .await?
        .into_iter()
        .filter(|f| extract::is_supported(&f.name))
        .filter(|f| !exclude_set.is_match(relative_path(&f.path_lower, &root_lower)))
        .collect();
    files.sort_by(|a, b| a.path_lower.cmp(&b.path_lower));

    tracing::debug!(
        store = store.name(),
        root = %config.root_path,
        candidates = files.len(),
        "listed corpus"
    );

    let max_bytes = config.max_bytes_per_file;
    let outcomes: Vec<FileOutcome> = stream::iter(files)
        .map(|file| fetch_document(store, file, max_bytes))
        .buffered(config.download_concurrency.max(1))
        .collect()
        .await;

    let mut documents = Vec::new();
    let (mut oversized, mut empty, mut failed) = (0usize, 0usize, 0usize);
    for outcome in outcomes {
        match outcome {
            FileOutcome::Loaded(doc) => documents.push(doc),
            FileOutcome::Oversized => oversized += 1,
            FileOutcome::Empty => empty += 1,
            FileOutcome::Failed => failed += 1,
        }
    }

    tracing::info!(
        store = store.name(),
        documents = documents.len(),
        oversized,
        empty,
        failed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "loaded corpus"
    );

    Ok(documents)
}

/// List every file under `root`, recursing into sub-folders.
pub async fn walk_files(store: &dyn FileStore, root: &str) -> Result<Vec<RemoteFile>> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_string()];

    while let Some(folder) = stack.pop() {
        let mut page = store
            .list_folder(&folder)
            .await
            .with_context(|| format!("Failed to list folder '{}'", folder))?;

        loop {
            for entry in page.entries {
                match entry {
                    RemoteEntry::File(file) => files.push(file),
                    RemoteEntry::Folder(sub) => stack.push(sub.path_lower),
                }
            }
            if !page.has_more {
                break;
            }
            page = store
                .list_folder_continue(&page.cursor)
                .await
                .with_context(|| format!("Failed to continue listing '{}'", folder))?;
        }
    }

    Ok(files)
}

async fn fetch_document(store: &dyn FileStore, file: RemoteFile, max_bytes: u64) -> FileOutcome {
    if file.size > max_bytes {
        tracing::debug!(path = %file.path_display, size = file.size, "skipping oversized file");
        return FileOutcome::Oversized;
    }

    let bytes = match store.download(&file.path_lower).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(path = %file.path_display, error = %format!("{:#}", e), "download failed, skipping");
            return FileOutcome::Failed;
        }
    };

    let size = bytes.len() as u64;
    if size > max_bytes {
        tracing::debug!(path = %file.path_display, size, "skipping oversized payload");
        return FileOutcome::Oversized;
    }

    let name = file.name.clone();
    let text = match tokio::task::spawn_blocking(move || extract::extract_text(&name, &bytes)).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            tracing::warn!(path = %file.path_display, error = %e, "extraction failed, skipping");
            return FileOutcome::Failed;
        }
        Err(e) => {
            tracing::warn!(path = %file.path_display, error = %e, "extraction task failed, skipping");
            return FileOutcome::Failed;
        }
    };

    if text.trim().is_empty() {
        tracing::debug!(path = %file.path_display, "no text extracted, skipping");
        return FileOutcome::Empty;
    }

    let title = file
        .path_display
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(file.name.as_str())
        .to_string();

    FileOutcome::Loaded(Document {
        id: file.id,
        path: file.path_display,
        title,
        text,
        size,
    })
}

/// Path below `root_lower`, without a leading slash.
fn relative_path<'a>(path_lower: &'a str, root_lower: &str) -> &'a str {
    path_lower
        .strip_prefix(root_lower.trim_end_matches('/'))
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or_else(|| path_lower.trim_start_matches('/'))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            Glob::new(pattern).with_context(|| format!("Invalid exclude glob '{}'", pattern))?,
        );
    }
    Ok(builder.build()?)
}
