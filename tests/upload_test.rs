use axum::{
    Json, Router,
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    routing::post,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;
use upload_pipeline::{UploadConfig, UploadError, UploadPipeline, UploadedFile, persist_single_from_form};

const BOUNDARY: &str = "---------------------------123456789012345678901234567";

#[derive(Clone)]
struct TestState {
    dir: PathBuf,
    pipeline: Arc<UploadPipeline>,
}

async fn upload_single(
    State(state): State<TestState>,
    request: Request,
) -> Result<Json<Option<UploadedFile>>, UploadError> {
    let uploaded = persist_single_from_form(request, &state.dir, "file").await?;
    Ok(Json(uploaded))
}

async fn upload_multiple(
    State(state): State<TestState>,
    request: Request,
) -> Result<Json<Vec<UploadedFile>>, UploadError> {
    let uploaded = state
        .pipeline
        .persist_multiple_from_form(request, &state.dir, "files")
        .await?;
    Ok(Json(uploaded))
}

fn app(dir: PathBuf, config: UploadConfig) -> Router {
    let _ = tracing_subscriber::fmt::try_init();
    Router::new()
        .route("/single", post(upload_single))
        .route("/multiple", post(upload_multiple))
        .with_state(TestState {
            dir,
            pipeline: Arc::new(UploadPipeline::new(config)),
        })
}

fn multipart_body(parts: &[(&str, &str, &str)]) -> String {
    let mut body = String::new();
    for (field, filename, content) in parts {
        body.push_str(&format!(
            "--{BOUNDARY}\r\n\
            Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
            Content-Type: application/octet-stream\r\n\r\n\
            {content}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body
}

fn upload_request(uri: &str, body: String) -> Request {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: Router, request: Request) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or_else(|_| {
        panic!(
            "Response was not JSON ({}): {:?}",
            status,
            String::from_utf8_lossy(&body)
        )
    });
    (status, json)
}

fn stored_file(dir: &Path, json: &Value) -> Vec<u8> {
    let filename = json["filename"].as_str().unwrap();
    std::fs::read(dir.join(filename)).unwrap()
}

#[tokio::test]
async fn test_single_upload_flow() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("uploads");
    let app = app(dir.clone(), UploadConfig::default());

    let body = multipart_body(&[("file", "test.txt", "Hello, this is a test file content!")]);
    let (status, json) = send(app, upload_request("/single", body)).await;

    assert_eq!(status, StatusCode::OK);
    let filename = json["filename"].as_str().unwrap();
    assert!(filename.ends_with(".txt"));
    assert_eq!(json.as_object().unwrap().len(), 1);
    assert_eq!(
        stored_file(&dir, &json),
        b"Hello, this is a test file content!"
    );
}

#[tokio::test]
async fn test_single_upload_takes_first_file_only() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path().to_path_buf(), UploadConfig::default());

    let body = multipart_body(&[("file", "a.md", "first"), ("file", "b.md", "second")]);
    let (status, json) = send(app, upload_request("/single", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored_file(tmp.path(), &json), b"first");
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_single_upload_without_field_returns_null() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("never-created");
    let app = app(dir.clone(), UploadConfig::default());

    let body = multipart_body(&[("other", "a.txt", "ignored")]);
    let (status, json) = send(app, upload_request("/single", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json.is_null());
    assert!(!dir.exists());
}

#[tokio::test]
async fn test_multiple_upload_flow() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path().to_path_buf(), UploadConfig::default());

    let body = multipart_body(&[
        ("files", "one.png", "1111"),
        ("avatar", "me.jpg", "not part of the batch"),
        ("files", "two.pdf", "2222"),
        ("files", "three", "3333"),
    ]);
    let (status, json) = send(app, upload_request("/multiple", body)).await;

    assert_eq!(status, StatusCode::OK);
    let files = json.as_array().unwrap();
    assert_eq!(files.len(), 3);
    assert!(files[0]["filename"].as_str().unwrap().ends_with(".png"));
    assert!(files[1]["filename"].as_str().unwrap().ends_with(".pdf"));
    assert!(!files[2]["filename"].as_str().unwrap().contains('.'));

    let contents: Vec<Vec<u8>> = files.iter().map(|f| stored_file(tmp.path(), f)).collect();
    assert_eq!(contents, [b"1111".to_vec(), b"2222".to_vec(), b"3333".to_vec()]);
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 3);
}

#[tokio::test]
async fn test_multiple_upload_without_field_returns_empty_list() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("created-anyway");
    let app = app(dir.clone(), UploadConfig::default());

    let body = multipart_body(&[]);
    let (status, json) = send(app, upload_request("/multiple", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!([]));
    assert!(dir.is_dir());
}

#[tokio::test]
async fn test_spilled_parts_are_persisted_intact() {
    let tmp = tempfile::tempdir().unwrap();
    let spill_dir = tempfile::tempdir().unwrap();
    let config = UploadConfig {
        max_memory: 30,
        temp_dir: Some(spill_dir.path().to_path_buf()),
        ..UploadConfig::default()
    };
    let app = app(tmp.path().to_path_buf(), config);

    let large = "abcdefghij".repeat(10_000);
    let body = multipart_body(&[("files", "small.txt", "fits"), ("files", "large.txt", &large)]);
    let (status, json) = send(app, upload_request("/multiple", body)).await;

    assert_eq!(status, StatusCode::OK);
    let files = json.as_array().unwrap();
    assert_eq!(stored_file(tmp.path(), &files[0]), b"fits");
    assert_eq!(stored_file(tmp.path(), &files[1]), large.as_bytes());
    // the parsed form is gone, and so are its temp files
    assert_eq!(std::fs::read_dir(spill_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_non_multipart_request_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(tmp.path().to_path_buf(), UploadConfig::default());

    let request = Request::builder()
        .method("POST")
        .uri("/single")
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"file": "nope"}"#))
        .unwrap();
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Content-Type is not multipart/form-data");
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_oversized_request_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let config = UploadConfig {
        max_request_size: Some(256),
        ..UploadConfig::default()
    };
    let app = app(tmp.path().to_path_buf(), config);

    let body = multipart_body(&[("files", "big.bin", &"z".repeat(4096))]);
    let (status, _) = send(app, upload_request("/multiple", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unwritable_directory_is_an_internal_error() {
    let tmp = tempfile::tempdir().unwrap();
    let blocker = tmp.path().join("blocker");
    std::fs::write(&blocker, b"regular file").unwrap();
    let app = app(blocker.join("uploads"), UploadConfig::default());

    let body = multipart_body(&[("file", "a.txt", "data")]);
    let (status, json) = send(app, upload_request("/single", body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Internal Server Error");
    assert_eq!(std::fs::read(&blocker).unwrap(), b"regular file");
}
