use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use bytes::Bytes;
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::io::{Cursor, Write};
use std::sync::Arc;
use tower::ServiceExt;
use unzip_ufop::error::UnzipError;
use unzip_ufop::services::charset::LegacyCharsetDecoder;
use unzip_ufop::services::dispatcher::{UploadDispatcher, UploadSettings};
use unzip_ufop::services::fetcher::SourceFetcher;
use unzip_ufop::services::memory_store::MemoryObjectStore;
use unzip_ufop::services::token::{JwtTokenSigner, TokenSigner};
use unzip_ufop::services::unzip_service::UnzipService;
use unzip_ufop::utils::hash::calculate_hash;
use unzip_ufop::{AppState, create_app};
use zip::ZipWriter;
use zip::write::FileOptions;

struct StaticFetcher(Bytes);

#[async_trait]
impl SourceFetcher for StaticFetcher {
    async fn fetch(&self, _url: &str) -> Result<Bytes, UnzipError> {
        Ok(self.0.clone())
    }
}

fn sample_zip() -> Bytes {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    writer.add_directory("photos/", options).unwrap();
    writer.start_file("photos/cat.jpg", options).unwrap();
    writer.write_all(b"not really a cat").unwrap();
    writer.start_file("notes.txt", options).unwrap();
    writer.write_all(b"remember the milk").unwrap();
    Bytes::from(writer.finish().unwrap().into_inner())
}

fn setup_app(archive: Bytes) -> (axum::Router, Arc<MemoryObjectStore>) {
    let signer: Arc<dyn TokenSigner> =
        Arc::new(JwtTokenSigner::new("test_secret", Duration::hours(1)));
    let store = Arc::new(MemoryObjectStore::new(signer.clone()));
    let dispatcher = UploadDispatcher::with_store(signer, store.clone(), UploadSettings::default());
    let unzip = Arc::new(UnzipService::new(
        Arc::new(StaticFetcher(archive)),
        Arc::new(LegacyCharsetDecoder::default()),
        dispatcher,
    ));

    let state = AppState {
        unzip,
        store: store.clone(),
    };
    (create_app(state), store)
}

async fn post_unzip(app: axum::Router, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/unzip")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

#[tokio::test]
async fn test_unzip_endpoint() {
    let _ = tracing_subscriber::fmt::try_init();
    let (app, store) = setup_app(sample_zip());

    let request = json!({
        "cmd": "unzip/bucket/bXlidWNrZXQ=",
        "src": { "url": "http://source.test/a.zip", "mimetype": "application/zip" }
    });
    let (status, json) = post_unzip(app, request.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({
            "files": [
                { "key": "photos/cat.jpg", "hash": calculate_hash(b"not really a cat") },
                { "key": "notes.txt", "hash": calculate_hash(b"remember the milk") }
            ]
        })
    );
    assert_eq!(
        store.get("mybucket", "notes.txt").unwrap(),
        Bytes::from_static(b"remember the milk")
    );
}

#[tokio::test]
async fn test_unzip_endpoint_rejects_mime_type() {
    let (app, store) = setup_app(sample_zip());

    let request = json!({
        "cmd": "unzip/bucket/bXlidWNrZXQ=",
        "src": { "url": "http://source.test/a.tar", "mimetype": "application/x-tar" }
    });
    let (status, json) = post_unzip(app, request.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({ "error": "unsupported mimetype to unzip" }));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_unzip_endpoint_rejects_command() {
    let (app, _store) = setup_app(sample_zip());

    let request = json!({
        "cmd": "unzip/bucket/bXlidWNrZXQ=/overwrite/1/now",
        "src": { "url": "http://source.test/a.zip", "mimetype": "application/zip" }
    });
    let (status, json) = post_unzip(app, request.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid unzip command format");
}

#[tokio::test]
async fn test_unzip_endpoint_corrupt_archive() {
    let (app, _store) = setup_app(Bytes::from_static(b"PK but not really"));

    let request = json!({
        "cmd": "unzip/bucket/bXlidWNrZXQ=",
        "src": { "url": "http://source.test/a.zip", "mimetype": "application/zip" }
    });
    let (status, json) = post_unzip(app, request.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, json!({ "error": "invalid zip file" }));
}

#[tokio::test]
async fn test_unzip_endpoint_malformed_body() {
    let (app, _store) = setup_app(sample_zip());

    let (status, json) = post_unzip(app, r#"{"cmd": 42}"#.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_health() {
    let (app, _store) = setup_app(sample_zip());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["store"], "memory (connected)");
}
