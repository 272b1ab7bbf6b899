// packpress-core/tests/upload_tests.rs
//
// Exercises the upload client against a local mock server. The client is
// blocking, so every interaction runs inside spawn_blocking under a
// multi-threaded runtime.

use packpress_core::config::Config;
use packpress_core::upload::{RetryPolicy, UploadClient};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> Config {
    let toml = format!(
        r#"
[auth]
token = "abcdef0123456789"
did = "device-42"
d_name = "bench"
d_type = "desktop"

[url]
upload = "{base_url}/upload"
create = "{base_url}/create"
"#
    );
    toml::from_str(&toml).unwrap()
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
    }
}

fn success_body(url: &str) -> serde_json::Value {
    json!({ "code": 0, "data": [{ "url": url, "id": 7 }] })
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_recovers_after_transient_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("https://cdn/ok.webp")))
        .mount(&server)
        .await;

    let uri = server.uri();
    let asset = tokio::task::spawn_blocking(move || {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fantwo0001.webp");
        std::fs::write(&file, b"webp bytes").unwrap();

        let client = UploadClient::new(&test_config(&uri))
            .unwrap()
            .with_retry_policy(fast_retry());
        client.upload_file(&file)
    })
    .await
    .unwrap();

    let asset = asset.expect("third attempt should succeed");
    assert_eq!(asset.url, "https://cdn/ok.webp");
    assert_eq!(asset.id.as_deref(), Some("7"));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_stops_after_max_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let uri = server.uri();
    let asset = tokio::task::spawn_blocking(move || {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fantwo0001.webp");
        std::fs::write(&file, b"webp bytes").unwrap();

        let client = UploadClient::new(&test_config(&uri))
            .unwrap()
            .with_retry_policy(fast_retry());
        client.upload_file(&file)
    })
    .await
    .unwrap();

    assert!(asset.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn business_error_counts_as_failed_attempt() {
    let server = MockServer::start().await;

    // Healthy transport, failing body code.
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": 500, "message": "quota" })),
        )
        .mount(&server)
        .await;

    let uri = server.uri();
    let asset = tokio::task::spawn_blocking(move || {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fantwo0001.webp");
        std::fs::write(&file, b"webp bytes").unwrap();

        let client = UploadClient::new(&test_config(&uri))
            .unwrap()
            .with_retry_policy(fast_retry());
        client.upload_file(&file)
    })
    .await
    .unwrap();

    assert!(asset.is_none());
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_file_is_skipped_without_any_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("https://cdn/x.webp")))
        .expect(0)
        .mount(&server)
        .await;

    let uri = server.uri();
    let asset = tokio::task::spawn_blocking(move || {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("empty.webp");
        std::fs::write(&file, b"").unwrap();

        let client = UploadClient::new(&test_config(&uri)).unwrap();
        client.upload_file(&file)
    })
    .await
    .unwrap();

    assert!(asset.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_upload_aggregates_successes_concurrently() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("https://cdn/b.webp")))
        .expect(4)
        .mount(&server)
        .await;

    let uri = server.uri();
    let uploaded = tokio::task::spawn_blocking(move || {
        let dir = tempfile::tempdir().unwrap();
        for i in 1..=4 {
            std::fs::write(dir.path().join(format!("fantwo{i:04}.webp")), b"bytes").unwrap();
        }
        std::fs::write(dir.path().join("zero.webp"), b"").unwrap(); // Skipped

        let client = UploadClient::new(&test_config(&uri)).unwrap();
        client.upload_files(dir.path(), 3).unwrap()
    })
    .await
    .unwrap();

    assert_eq!(uploaded.len(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn submit_post_reports_business_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/create"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": 401, "message": "expired" })),
        )
        .mount(&server)
        .await;

    let uri = server.uri();
    let (ok, body) = tokio::task::spawn_blocking(move || {
        let client = UploadClient::new(&test_config(&uri)).unwrap();
        let post = packpress_core::post::PostRequest::new(
            "Demo",
            &["https://cdn/a.webp".to_string()],
        );
        client.submit_post(&post)
    })
    .await
    .unwrap();

    assert!(!ok);
    let body = body.expect("body should be parsed");
    assert_eq!(body["message"], "expired");
}

#[tokio::test(flavor = "multi_thread")]
async fn submit_post_succeeds_on_code_zero() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/create"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "code": 0, "data": 99 })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let (ok, body) = tokio::task::spawn_blocking(move || {
        let client = UploadClient::new(&test_config(&uri)).unwrap();
        let post = packpress_core::post::PostRequest::new(
            "Demo",
            &["https://cdn/a.webp".to_string(), "https://cdn/b.webp".to_string()],
        );
        client.submit_post(&post)
    })
    .await
    .unwrap();

    assert!(ok);
    assert_eq!(body.unwrap()["data"], 99);

    // The submitted payload carries the joined image list and the first
    // image as cover.
    let requests = server.received_requests().await.unwrap();
    let payload: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(payload["title"], "Demo");
    assert_eq!(payload["images"], "https://cdn/a.webp,https://cdn/b.webp");
    assert_eq!(payload["cover"], "https://cdn/a.webp");
    assert_eq!(payload["status"], "DRAFT");
    assert_eq!(payload["type"], "image");
    assert_eq!(payload["categoryId"], 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn probe_reflects_server_health() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let uri = server.uri();
    let reachable = tokio::task::spawn_blocking(move || {
        let client = UploadClient::new(&test_config(&uri)).unwrap();
        client.test_connection()
    })
    .await
    .unwrap();
    assert!(reachable);

    // A port nothing listens on collapses to false.
    let unreachable = tokio::task::spawn_blocking(|| {
        let client = UploadClient::new(&test_config("http://127.0.0.1:1")).unwrap();
        client.test_connection()
    })
    .await
    .unwrap();
    assert!(!unreachable);
}

#[tokio::test(flavor = "multi_thread")]
async fn requests_carry_the_device_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("https://cdn/h.webp")))
        .mount(&server)
        .await;

    let uri = server.uri();
    tokio::task::spawn_blocking(move || {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("fantwo0001.webp");
        std::fs::write(&file, b"bytes").unwrap();

        let client = UploadClient::new(&test_config(&uri)).unwrap();
        client.upload_file(&file)
    })
    .await
    .unwrap();

    let requests = server.received_requests().await.unwrap();
    let headers = &requests[0].headers;
    assert_eq!(
        headers.get("authorization").unwrap().to_str().unwrap(),
        "Bearer abcdef0123456789"
    );
    assert_eq!(headers.get("device-id").unwrap().to_str().unwrap(), "device-42");
    assert_eq!(headers.get("device-name").unwrap().to_str().unwrap(), "bench");
    assert_eq!(headers.get("device-type").unwrap().to_str().unwrap(), "desktop");
}
