//! Dropbox connector.
//!
//! Lists and downloads files through the Dropbox HTTP API v2 and exposes
//! them as a [`FileStore`]. Listing is non-recursive; the corpus loader walks
//! sub-folders itself and follows `has_more` / `cursor` pagination.
//!
//! # Configuration
//!
//! ```toml
//! [store]
//! root_path = "/RAG_Sources"
//! access_token_env = "DROPBOX_ACCESS_TOKEN"
//! # api_url = "http://localhost:8080"       # mock server
//! # content_url = "http://localhost:8080"
//! ```
//!
//! # Environment Variables
//!
//! - `DROPBOX_ACCESS_TOKEN` (or whatever `access_token_env` names): bearer
//!   token. When unset, [`DropboxClient::from_config`] returns `None` and the
//!   index is served empty.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | list | `POST {api_url}/2/files/list_folder` |
//! | continue | `POST {api_url}/2/files/list_folder/continue` |
//! | download | `POST {content_url}/2/files/download` + `Dropbox-API-Arg` header |

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::StoreConfig;
use crate::traits::{FileStore, ListPage, RemoteEntry, RemoteFile, RemoteFolder};

/// Dropbox HTTP API client implementing [`FileStore`].
pub struct DropboxClient {
    client: reqwest::Client,
    token: String,
    api_url: String,
    content_url: String,
}

impl DropboxClient {
    /// Create a client with an explicit bearer token.
    pub fn new(token: impl Into<String>, config: &StoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build Dropbox HTTP client")?;

        Ok(Self {
            client,
            token: token.into(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            content_url: config.content_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client from configuration, reading the token from the
    /// environment. Returns `Ok(None)` when no token is available.
    pub fn from_config(config: &StoreConfig) -> Result<Option<Self>> {
        match config.access_token() {
            Some(token) => Ok(Some(Self::new(token, config)?)),
            None => Ok(None),
        }
    }

    async fn list_request(&self, endpoint: &str, body: serde_json::Value) -> Result<ListPage> {
        let url = format!("{}/2/files/{}", self.api_url, endpoint);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Dropbox {} request failed", endpoint))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "Dropbox {} failed (HTTP {}): {}",
                endpoint,
                status,
                body.chars().take(500).collect::<String>()
            );
        }

        let parsed: ListFolderResponse = resp
            .json()
            .await
            .with_context(|| format!("Invalid Dropbox {} response", endpoint))?;

        Ok(parsed.into_page())
    }
}

#[async_trait]
impl FileStore for DropboxClient {
    fn name(&self) -> &str {
        "dropbox"
    }

    async fn list_folder(&self, path: &str) -> Result<ListPage> {
        let body = serde_json::json!({
            "path": api_path(path),
            "recursive": false,
            "include_deleted": false,
        });
        self.list_request("list_folder", body).await
    }

    async fn list_folder_continue(&self, cursor: &str) -> Result<ListPage> {
        let body = serde_json::json!({ "cursor": cursor });
        self.list_request("list_folder/continue", body).await
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let url = format!("{}/2/files/download", self.content_url);
        let arg = header_safe_json(&serde_json::json!({ "path": api_path(path) }));

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", arg)
            .send()
            .await
            .with_context(|| format!("Failed to download dropbox:{}", path))?;

        if !resp.status().is_success() {
            let status = resp.status();
            bail!("Dropbox download failed (HTTP {}) for '{}'", status, path);
        }

        let bytes = resp.bytes().await?;
        Ok(bytes.to_vec())
    }
}

// ============ Wire format ============

#[derive(Debug, Deserialize)]
struct ListFolderResponse {
    entries: Vec<WireEntry>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "lowercase")]
enum WireEntry {
    File {
        id: String,
        name: String,
        #[serde(default)]
        path_lower: Option<String>,
        #[serde(default)]
        path_display: Option<String>,
        #[serde(default)]
        size: u64,
    },
    Folder {
        name: String,
        #[serde(default)]
        path_lower: Option<String>,
        #[serde(default)]
        path_display: Option<String>,
    },
    /// Deleted entries and any tag added by future API versions.
    #[serde(other)]
    Other,
}

impl ListFolderResponse {
    fn into_page(self) -> ListPage {
        let entries = self
            .entries
            .into_iter()
            .filter_map(|entry| match entry {
                WireEntry::File {
                    id,
                    name,
                    path_lower,
                    path_display,
                    size,
                } => {
                    let (path_lower, path_display) = resolve_paths(&name, path_lower, path_display);
                    Some(RemoteEntry::File(RemoteFile {
                        id,
                        name,
                        path_lower,
                        path_display,
                        size,
                    }))
                }
                WireEntry::Folder {
                    name,
                    path_lower,
                    path_display,
                } => {
                    let (path_lower, path_display) = resolve_paths(&name, path_lower, path_display);
                    Some(RemoteEntry::Folder(RemoteFolder {
                        name,
                        path_lower,
                        path_display,
                    }))
                }
                WireEntry::Other => None,
            })
            .collect();

        ListPage {
            entries,
            has_more: self.has_more,
            cursor: self.cursor,
        }
    }
}

/// Fill in whichever of the two paths Dropbox omitted.
fn resolve_paths(
    name: &str,
    path_lower: Option<String>,
    path_display: Option<String>,
) -> (String, String) {
    match (path_lower, path_display) {
        (Some(lower), Some(display)) => (lower, display),
        (Some(lower), None) => (lower.clone(), lower),
        (None, Some(display)) => (display.to_lowercase(), display),
        (None, None) => (format!("/{}", name.to_lowercase()), format!("/{}", name)),
    }
}

/// Dropbox addresses the root folder as `""`, not `"/"`.
fn api_path(path: &str) -> &str {
    if path == "/" {
        ""
    } else {
        path
    }
}

/// Serialize JSON for an HTTP header, escaping DEL and non-ASCII chars as
/// `\uXXXX` (UTF-16 units) as the `Dropbox-API-Arg` header requires.
fn header_safe_json(value: &serde_json::Value) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() && c != '\u{7f}' {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_path_maps_to_empty() {
        assert_eq!(api_path("/"), "");
        assert_eq!(api_path("/RAG_Sources"), "/RAG_Sources");
        assert_eq!(api_path(""), "");
    }

    #[test]
    fn test_header_json_escapes_non_ascii() {
        let arg = header_safe_json(&serde_json::json!({ "path": "/Café/ü.txt" }));
        assert_eq!(arg, r#"{"path":"/Caf\u00e9/\u00fc.txt"}"#);
    }

    #[test]
    fn test_header_json_escapes_astral_as_surrogates() {
        let arg = header_safe_json(&serde_json::json!({ "path": "/😀" }));
        assert_eq!(arg, r#"{"path":"/\ud83d\ude00"}"#);
    }

    #[test]
    fn test_parse_listing_skips_deleted_entries() {
        let body = serde_json::json!({
            "entries": [
                {".tag": "folder", "name": "Sub", "path_lower": "/docs/sub", "path_display": "/Docs/Sub", "id": "id:f"},
                {".tag": "file", "name": "A.md", "path_lower": "/docs/a.md", "path_display": "/Docs/A.md", "id": "id:a", "size": 12},
                {".tag": "deleted", "name": "gone.txt", "path_lower": "/docs/gone.txt"}
            ],
            "cursor": "c1",
            "has_more": true
        });
        let parsed: ListFolderResponse = serde_json::from_value(body).unwrap();
        let page = parsed.into_page();

        assert!(page.has_more);
        assert_eq!(page.cursor, "c1");
        assert_eq!(page.entries.len(), 2);
        assert_eq!(
            page.entries[1],
            RemoteEntry::File(RemoteFile {
                id: "id:a".to_string(),
                name: "A.md".to_string(),
                path_lower: "/docs/a.md".to_string(),
                path_display: "/Docs/A.md".to_string(),
                size: 12,
            })
        );
        assert!(matches!(page.entries[0], RemoteEntry::Folder(_)));
    }

    #[test]
    fn test_missing_display_path_falls_back_to_lower() {
        let (lower, display) = resolve_paths("a.md", Some("/x/a.md".to_string()), None);
        assert_eq!(lower, "/x/a.md");
        assert_eq!(display, "/x/a.md");
    }
}
