//! API integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;

use vpub_api::{create_router, ApiConfig, AppState};
use vpub_media::{MediaPackager, MediaResult};
use vpub_models::{master_manifest_key, Answer, AnswerId, AnswerStatus};
use vpub_publish::{AnswerRepository, InMemoryAnswerStore, PublishConfig, Publisher};
use vpub_storage::{ObjectUploader, StorageResult, StoreSettings};

const CDN: &str = "https://cdn.example.com";

fn write_package(out_dir: &Path) -> MediaResult<PathBuf> {
    std::fs::write(out_dir.join("v0_00000.ts"), b"segment")?;
    let manifest = out_dir.join("master.m3u8");
    std::fs::write(&manifest, b"#EXTM3U\n")?;
    Ok(manifest)
}

/// Writes a minimal HLS package.
struct StubPackager;

#[async_trait]
impl MediaPackager for StubPackager {
    async fn package(&self, _input: &Path, out_dir: &Path) -> MediaResult<PathBuf> {
        write_package(out_dir)
    }
}

/// Holds packaging until released.
struct GatedPackager {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl MediaPackager for GatedPackager {
    async fn package(&self, _input: &Path, out_dir: &Path) -> MediaResult<PathBuf> {
        self.entered.notify_one();
        self.release.notified().await;
        write_package(out_dir)
    }
}

/// Returns the URL an upload would produce without touching the network.
struct StubUploader;

#[async_trait]
impl ObjectUploader for StubUploader {
    async fn upload_dir(&self, _local_dir: &Path, remote_prefix: &str) -> StorageResult<String> {
        Ok(format!("{}/{}", CDN, master_manifest_key(remote_prefix)))
    }
}

struct TestApp {
    _root: TempDir,
    router: Router,
    repository: Arc<InMemoryAnswerStore>,
}

async fn create_test_app() -> TestApp {
    create_test_app_with(Arc::new(StubPackager)).await
}

async fn create_test_app_with(packager: Arc<dyn MediaPackager>) -> TestApp {
    let root = TempDir::new().unwrap();
    let media_root = root.path().join("media");
    std::fs::create_dir_all(media_root.join("answers")).unwrap();

    let source = |id: &str, len: u64| {
        let path = media_root.join("answers").join(format!("{}.mp4", id));
        std::fs::File::create(&path).unwrap().set_len(len).unwrap();
    };
    source("ready", 1024);
    source("live", 1024);
    source("huge", 25 * 1024 * 1024);

    let repository = Arc::new(InMemoryAnswerStore::from_answers([
        Answer::new(AnswerId::from("ready"), "ready", "Ready"),
        Answer::new(AnswerId::from("live"), "live", "Live").with_status(AnswerStatus::Live),
        Answer::new(AnswerId::from("huge"), "huge", "Huge"),
        Answer::new(AnswerId::from("nosource"), "nosource", "No source"),
    ]));

    let config = PublishConfig::default()
        .with_media_root(&media_root)
        .with_work_dir(root.path().join("work"));

    let publisher = Publisher::new(
        repository.clone(),
        packager,
        Arc::new(StubUploader),
        config,
    );

    let state = AppState::new(
        ApiConfig::default(),
        Arc::new(publisher),
        StoreSettings::default(),
    );

    TestApp {
        _root: root,
        router: create_router(state, None),
        repository,
    }
}

async fn send(app: &TestApp, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app().await;
    let (status, body) = send(&app, "GET", "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_reports_missing_store_config() {
    let app = create_test_app().await;
    let (status, body) = send(&app, "GET", "/ready").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["checks"]["storage"]["status"], "error");
}

#[tokio::test]
async fn test_publish_success() {
    let app = create_test_app().await;
    let (status, body) = send(&app, "POST", "/api/publish-video/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "LIVE");
    assert_eq!(body["url"], "https://cdn.example.com/answers/ready/master.m3u8");

    let (status, body) = send(&app, "GET", "/api/answers/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "LIVE");
    assert_eq!(body["hls_manifest_url"], body["video_url"]);
}

#[tokio::test]
async fn test_publish_live_answer_is_conflict() {
    let app = create_test_app().await;
    let (status, body) = send(&app, "POST", "/api/publish-video/live").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "ERROR");
    assert_eq!(body["code"], "precondition_failed");
}

#[tokio::test]
async fn test_publish_oversized_source_is_413() {
    let app = create_test_app().await;
    let (status, body) = send(&app, "POST", "/api/publish-video/huge").await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "payload_too_large");

    let (_, answer) = send(&app, "GET", "/api/answers/huge").await;
    assert_eq!(answer["status"], "READY");
}

#[tokio::test]
async fn test_publish_unknown_answer_is_404() {
    let app = create_test_app().await;
    let (status, body) = send(&app, "POST", "/api/publish-video/ghost").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_publish_missing_source_is_404_and_error_state() {
    let app = create_test_app().await;
    let (status, body) = send(&app, "POST", "/api/publish-video/nosource").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("Source file not found"));

    let (_, answer) = send(&app, "GET", "/api/answers/nosource").await;
    assert_eq!(answer["status"], "ERROR");
}

#[tokio::test]
async fn test_get_unknown_answer_is_404() {
    let app = create_test_app().await;
    let (status, body) = send(&app, "GET", "/api/answers/ghost").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "ERROR");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("X-Request-ID", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("X-Request-ID").unwrap(),
        "req-123"
    );
}

#[tokio::test]
async fn test_publish_completes_after_client_disconnects() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let app = create_test_app_with(Arc::new(GatedPackager {
        entered: entered.clone(),
        release: release.clone(),
    }))
    .await;

    let router = app.router.clone();
    let request = tokio::spawn(async move {
        router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/publish-video/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
    });

    // Drop the request while packaging is in progress.
    entered.notified().await;
    request.abort();
    let _ = request.await;
    release.notify_one();

    let id = AnswerId::from("ready");
    let answer = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let answer = app.repository.load_by_id(&id).await.unwrap().unwrap();
            if answer.status != AnswerStatus::Ready {
                return answer;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("publish never reached a terminal state");

    assert_eq!(answer.status, AnswerStatus::Live);
    assert_eq!(
        answer.hls_manifest_url.as_deref(),
        Some("https://cdn.example.com/answers/ready/master.m3u8")
    );
}
