//! Remote file-store abstraction.
//!
//! The corpus loader only talks to a [`FileStore`]; the Dropbox client in
//! [`connector_dropbox`](crate::connector_dropbox) is the production
//! implementation, and tests plug in in-memory stores.
//!
//! Listings are paginated: a store returns a bounded [`ListPage`] plus a
//! continuation cursor, and callers must keep calling
//! [`list_folder_continue`](FileStore::list_folder_continue) while
//! `has_more` is set.
//!
//! # Example
//!
//! ```rust
//! use anyhow::Result;
//! use async_trait::async_trait;
//! use dropbox_rag::traits::{FileStore, ListPage};
//!
//! pub struct EmptyStore;
//!
//! #[async_trait]
//! impl FileStore for EmptyStore {
//!     fn name(&self) -> &str { "empty" }
//!
//!     async fn list_folder(&self, _path: &str) -> Result<ListPage> {
//!         Ok(ListPage::default())
//!     }
//!
//!     async fn list_folder_continue(&self, _cursor: &str) -> Result<ListPage> {
//!         Ok(ListPage::default())
//!     }
//!
//!     async fn download(&self, path: &str) -> Result<Vec<u8>> {
//!         anyhow::bail!("no such file: {}", path)
//!     }
//! }
//! ```

use anyhow::Result;
use async_trait::async_trait;

/// A hierarchical remote namespace that can be listed and downloaded from.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Short identifier used in log events (e.g. `"dropbox"`).
    fn name(&self) -> &str;

    /// List the direct children of `path` (first page).
    async fn list_folder(&self, path: &str) -> Result<ListPage>;

    /// Fetch the page following `cursor`.
    async fn list_folder_continue(&self, cursor: &str) -> Result<ListPage>;

    /// Download the full content of the file at `path`.
    async fn download(&self, path: &str) -> Result<Vec<u8>>;
}

/// One page of a folder listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub entries: Vec<RemoteEntry>,
    /// More entries are available via `cursor`.
    pub has_more: bool,
    pub cursor: String,
}

/// A listing entry, tagged as file or folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEntry {
    File(RemoteFile),
    Folder(RemoteFolder),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Store-assigned identifier, stable across renames.
    pub id: String,
    pub name: String,
    /// Lowercased path, used for downloads and ordering.
    pub path_lower: String,
    /// Path with original casing, used for display.
    pub path_display: String,
    /// Size in bytes as reported by the listing.
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFolder {
    pub name: String,
    pub path_lower: String,
    pub path_display: String,
}
