//! HTTP-level tests for the Dropbox client and the OpenAI embedding provider,
//! run against local mock servers.

use dropbox_rag::config::{EmbeddingConfig, StoreConfig};
use dropbox_rag::connector_dropbox::DropboxClient;
use dropbox_rag::embedding::{EmbeddingProvider, OpenAIProvider};
use dropbox_rag::ingest::load_corpus;
use dropbox_rag::traits::{FileStore, RemoteEntry};
use serde_json::json;
use wiremock::matchers::{bearer_token, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store_config(server: &MockServer) -> StoreConfig {
    StoreConfig {
        root_path: "/RAG_Sources".to_string(),
        api_url: server.uri(),
        content_url: server.uri(),
        ..StoreConfig::default()
    }
}

fn file_entry(name: &str, size: u64) -> serde_json::Value {
    json!({
        ".tag": "file",
        "id": format!("id:{}", name),
        "name": name,
        "path_lower": format!("/rag_sources/{}", name.to_lowercase()),
        "path_display": format!("/RAG_Sources/{}", name),
        "size": size
    })
}

#[tokio::test]
async fn test_list_folder_and_continue() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(bearer_token("tok"))
        .and(body_json(json!({
            "path": "/RAG_Sources",
            "recursive": false,
            "include_deleted": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [file_entry("A.md", 5)],
            "cursor": "cursor-1",
            "has_more": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder/continue"))
        .and(body_json(json!({ "cursor": "cursor-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [file_entry("B.txt", 7)],
            "cursor": "cursor-2",
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DropboxClient::new("tok", &store_config(&server)).unwrap();

    let first = client.list_folder("/RAG_Sources").await.unwrap();
    assert!(first.has_more);
    assert_eq!(first.entries.len(), 1);

    let second = client.list_folder_continue(&first.cursor).await.unwrap();
    assert!(!second.has_more);
    match &second.entries[0] {
        RemoteEntry::File(f) => {
            assert_eq!(f.path_display, "/RAG_Sources/B.txt");
            assert_eq!(f.size, 7);
        }
        other => panic!("expected file, got {:?}", other),
    }
}

#[tokio::test]
async fn test_download_sends_api_arg_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .and(header("Dropbox-API-Arg", r#"{"path":"/rag_sources/caf\u00e9.txt"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"bonjour".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let client = DropboxClient::new("tok", &store_config(&server)).unwrap();
    let bytes = client.download("/rag_sources/café.txt").await.unwrap();
    assert_eq!(bytes, b"bonjour");
}

#[tokio::test]
async fn test_listing_error_carries_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(
            ResponseTemplate::new(409).set_body_string(r#"{"error_summary": "path/not_found/"}"#),
        )
        .mount(&server)
        .await;

    let client = DropboxClient::new("tok", &store_config(&server)).unwrap();
    let err = client.list_folder("/missing").await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("409"), "unexpected error: {}", msg);
    assert!(msg.contains("path/not_found"), "unexpected error: {}", msg);
}

#[tokio::test]
async fn test_load_corpus_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [
                file_entry("guide.md", 12),
                file_entry("photo.png", 10),
                file_entry("broken.txt", 3)
            ],
            "cursor": "c",
            "has_more": false
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .and(header("Dropbox-API-Arg", r#"{"path":"/rag_sources/guide.md"}"#))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"# Guide\nSteps".to_vec()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/files/download"))
        .and(header("Dropbox-API-Arg", r#"{"path":"/rag_sources/broken.txt"}"#))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = store_config(&server);
    let client = DropboxClient::new("tok", &config).unwrap();
    let docs = load_corpus(&client, &config).await.unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "id:guide.md");
    assert_eq!(docs[0].title, "guide.md");
    assert_eq!(docs[0].path, "/RAG_Sources/guide.md");
    assert_eq!(docs[0].text, "# Guide\nSteps");
}

#[tokio::test]
async fn test_openai_provider_posts_batch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(bearer_token("sk-test"))
        .and(body_json(json!({
            "model": "text-embedding-3-small",
            "input": ["first", "second"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = EmbeddingConfig {
        provider: "openai".to_string(),
        model: Some("text-embedding-3-small".to_string()),
        dims: Some(2),
        url: Some(format!("{}/v1", server.uri())),
        ..EmbeddingConfig::default()
    };
    let provider = OpenAIProvider::with_api_key(&config, "sk-test").unwrap();

    let vectors = provider
        .embed_batch(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn test_openai_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let config = EmbeddingConfig {
        provider: "openai".to_string(),
        model: Some("text-embedding-3-small".to_string()),
        dims: Some(2),
        url: Some(format!("{}/v1", server.uri())),
        max_retries: 3,
        ..EmbeddingConfig::default()
    };
    let provider = OpenAIProvider::with_api_key(&config, "sk-bad").unwrap();

    let err = provider.embed_batch(&["x".to_string()]).await.unwrap_err();
    assert!(err.to_string().contains("401"));
}
