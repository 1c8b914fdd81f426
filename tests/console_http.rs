//! Console HTTP Integration Tests
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot` against the
//! in-memory backend. No network I/O.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use bytes::Bytes;
use s3console::api::{create_router, AppState, SESSION_COOKIE};
use s3console::notice::{NoticeBox, DEFAULT_NOTICE_TTL};
use s3console::storage::{MemoryProvider, ProviderOp, StaticResolver, StorageProvider};
use tower::ServiceExt;

const UPLOAD_LIMIT: usize = 16 * 1024 * 1024;

fn router_for(resolver: StaticResolver) -> Router {
    let state = Arc::new(AppState::new(Arc::new(resolver)));
    create_router(state, UPLOAD_LIMIT)
}

/// Router over a fresh memory provider with one `reports` bucket
async fn setup() -> (Router, Arc<MemoryProvider>) {
    let provider = Arc::new(MemoryProvider::new());
    provider.create_bucket("reports").await.unwrap();
    let app = router_for(StaticResolver::new(provider.clone()));
    (app, provider)
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, form: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

fn post_file(uri: &str, filename: &str, content: &str) -> Request<Body> {
    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
         Content-Type: text/plain\r\n\r\n{c}\r\n--{b}--\r\n",
        b = boundary,
        f = filename,
        c = content
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

/// `name=value` part of the session cookie set by the response
fn session_cookie(response: &Response<Body>) -> String {
    let value = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(value.starts_with(SESSION_COOKIE));
    value.split(';').next().unwrap().to_string()
}

async fn body_bytes(response: Response<Body>) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}

#[tokio::test]
async fn test_home_lists_buckets() {
    let (app, _provider) = setup().await;

    let response = app.oneshot(get("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_some());

    let html = body_text(response).await;
    assert!(html.contains("href=\"/bucket/reports\""));
}

#[tokio::test]
async fn test_create_bucket_notice_shown_once() {
    let (app, provider) = setup().await;

    let response = app
        .clone()
        .oneshot(post_form("/create_bucket", "bucket_name=logs", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let cookie = session_cookie(&response);
    let buckets = provider.list_buckets().await.unwrap();
    assert!(buckets.iter().any(|b| b.name == "logs"));

    let html = body_text(app.clone().oneshot(get("/", Some(&cookie))).await.unwrap()).await;
    assert!(html.contains("Bucket &#39;logs&#39; created successfully"));

    let html = body_text(app.clone().oneshot(get("/", Some(&cookie))).await.unwrap()).await;
    assert!(!html.contains("created successfully"));
}

#[tokio::test]
async fn test_notice_not_shown_to_other_session() {
    let (app, _provider) = setup().await;

    app.clone()
        .oneshot(post_form("/create_bucket", "bucket_name=logs", None))
        .await
        .unwrap();

    let html = body_text(app.oneshot(get("/", None)).await.unwrap()).await;
    assert!(!html.contains("created successfully"));
}

#[tokio::test]
async fn test_blank_bucket_name_skips_provider() {
    let (app, provider) = setup().await;
    let calls = provider.calls();

    let response = app
        .clone()
        .oneshot(post_form("/create_bucket", "bucket_name=+++", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(provider.calls(), calls);

    let cookie = session_cookie(&response);
    let html = body_text(app.oneshot(get("/", Some(&cookie))).await.unwrap()).await;
    assert!(html.contains("Failed to create bucket: Invalid request: bucket_name is required"));
}

#[tokio::test]
async fn test_upload_stores_file() {
    let (app, provider) = setup().await;

    let response = app
        .oneshot(post_file("/upload/reports", "notes.txt", "hello world"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/bucket/reports");
    assert_eq!(
        provider.peek("reports", "notes.txt"),
        Some(Bytes::from_static(b"hello world"))
    );
}

#[tokio::test]
async fn test_download_nested_key() {
    let (app, provider) = setup().await;
    let data = Bytes::from_static(b"id,total\n1,42\n");
    provider
        .put_object("reports", "a/b/report.csv", data.clone())
        .await
        .unwrap();

    for uri in [
        "/download_file/reports/a%2Fb%2Freport.csv",
        "/download_file/reports/a/b/report.csv",
    ] {
        let response = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"report.csv\""
        );
        assert_eq!(body_bytes(response).await, data);
    }
}

#[tokio::test]
async fn test_listing_encodes_reserved_keys() {
    let (app, provider) = setup().await;
    provider
        .put_object("reports", "q?x=1&y#2.txt", Bytes::from_static(b"x"))
        .await
        .unwrap();

    let html = body_text(app.clone().oneshot(get("/bucket/reports", None)).await.unwrap()).await;
    assert!(html.contains("/delete_file/reports/q%3Fx%3D1%26y%232.txt"));

    let response = app
        .oneshot(get("/delete_file/reports/q%3Fx%3D1%26y%232.txt", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(!provider.contains("reports", "q?x=1&y#2.txt"));
}

#[tokio::test]
async fn test_move_file_to_other_bucket() {
    let (app, provider) = setup().await;
    provider.create_bucket("archive").await.unwrap();
    provider
        .put_object("reports", "a/b/report.csv", Bytes::from_static(b"data"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post_form(
            "/move_file/reports/a%2Fb%2Freport.csv",
            "dest_bucket=archive&dest_key=",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/bucket/reports");
    assert!(provider.contains("archive", "a/b/report.csv"));
    assert!(!provider.contains("reports", "a/b/report.csv"));

    let cookie = session_cookie(&response);
    let html = body_text(app.oneshot(get("/bucket/reports", Some(&cookie))).await.unwrap()).await;
    assert!(html.contains("File &#39;a/b/report.csv&#39; moved to archive/a/b/report.csv"));
}

#[tokio::test]
async fn test_copy_file_with_new_key() {
    let (app, provider) = setup().await;
    provider
        .put_object("reports", "report.csv", Bytes::from_static(b"data"))
        .await
        .unwrap();

    let response = app
        .oneshot(post_form(
            "/copy_file/reports/report.csv",
            "dest_bucket=reports&dest_key=backup%2Freport.csv",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(provider.contains("reports", "backup/report.csv"));
    assert!(provider.contains("reports", "report.csv"));
}

#[tokio::test]
async fn test_create_folder() {
    let (app, provider) = setup().await;

    let response = app
        .oneshot(post_form("/create_folder/reports", "folder_name=2024", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/bucket/reports");
    assert_eq!(provider.peek("reports", "2024/"), Some(Bytes::new()));
}

#[tokio::test]
async fn test_list_failure_redirects_home() {
    let (app, provider) = setup().await;
    provider.fail_on(ProviderOp::ListObjects, "AccessDenied: Access Denied");

    let response = app
        .clone()
        .oneshot(get("/bucket/reports", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let cookie = session_cookie(&response);
    let html = body_text(app.oneshot(get("/", Some(&cookie))).await.unwrap()).await;
    assert!(html.contains("Error accessing bucket: AccessDenied: Access Denied"));
}

#[tokio::test]
async fn test_missing_credentials() {
    let app = router_for(StaticResolver::unavailable());

    let response = app.clone().oneshot(get("/", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Storage credentials not found. Please configure them."));

    let response = app
        .oneshot(post_form("/create_bucket", "bucket_name=logs", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_health() {
    let (app, _provider) = setup().await;

    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["healthy"], true);
    assert_eq!(json["backend"], "memory");
    assert_eq!(json["credentials"], true);
}

#[tokio::test]
async fn test_delete_bucket() {
    let (app, provider) = setup().await;
    provider.create_bucket("scratch").await.unwrap();

    let response = app
        .clone()
        .oneshot(get("/delete_bucket/scratch", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let buckets = provider.list_buckets().await.unwrap();
    assert!(!buckets.iter().any(|b| b.name == "scratch"));

    let cookie = session_cookie(&response);
    let html = body_text(app.oneshot(get("/", Some(&cookie))).await.unwrap()).await;
    assert!(html.contains("Bucket &#39;scratch&#39; deleted successfully"));
}

#[tokio::test]
async fn test_upload_without_file_is_noop() {
    let (app, provider) = setup().await;
    let calls = provider.calls();

    let response = app
        .oneshot(post_file("/upload/reports", "", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/bucket/reports");
    assert_eq!(provider.calls(), calls);
    assert!(provider.list_objects("reports").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_download_failure_redirects_to_listing() {
    let (app, _provider) = setup().await;

    let response = app
        .clone()
        .oneshot(get("/download_file/reports/missing.csv", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/bucket/reports");
    assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());

    let cookie = session_cookie(&response);
    let html = body_text(app.oneshot(get("/bucket/reports", Some(&cookie))).await.unwrap()).await;
    assert!(html.contains("Download failed: NoSuchKey"));
}

#[tokio::test]
async fn test_cookieless_clients_do_not_grow_notices() {
    let provider = Arc::new(MemoryProvider::new());
    provider.create_bucket("reports").await.unwrap();
    let state = Arc::new(AppState::with_notices(
        Arc::new(StaticResolver::new(provider)),
        NoticeBox::with_limits(DEFAULT_NOTICE_TTL, 50),
    ));
    let app = create_router(Arc::clone(&state), UPLOAD_LIMIT);

    for _ in 0..1000 {
        let response = app
            .clone()
            .oneshot(get("/delete_file/reports/nothing.txt", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    assert_eq!(state.notices.sessions_waiting().await, 50);
}
