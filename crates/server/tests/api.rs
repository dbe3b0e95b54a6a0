use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use filegate::{Dispatcher, FilegateConfig, FsArchiver, MemoryArchiver, MemoryPublisher};
use http_body_util::BodyExt;
use server::{build_router, ServerConfig, ServerState};
use serde_json::Value;
use tower::ServiceExt;

struct Harness {
    app: Router,
    publisher: Arc<MemoryPublisher>,
    archiver: Arc<MemoryArchiver>,
}

fn harness_with(
    publisher: MemoryPublisher,
    archiver: MemoryArchiver,
    pipeline: FilegateConfig,
    config: ServerConfig,
) -> Harness {
    let publisher = Arc::new(publisher);
    let archiver = Arc::new(archiver);
    let dispatcher = Dispatcher::from_config(&pipeline, publisher.clone(), archiver.clone());
    let state = ServerState::new(config, pipeline, dispatcher);
    Harness {
        app: build_router(Arc::new(state)),
        publisher,
        archiver,
    }
}

fn harness() -> Harness {
    harness_with(
        MemoryPublisher::new(),
        MemoryArchiver::new(),
        FilegateConfig::default(),
        ServerConfig::default(),
    )
}

fn upload(file_name: &str, content_type: Option<&str>, body: &'static str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(format!("/file/{file_name}"));
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    builder.body(Body::from(body)).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn csv_upload_is_accepted_and_published() {
    let h = harness();
    let response = h
        .app
        .oneshot(upload("orders.csv", Some("text/csv"), "id,qty\n1,2\n"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = json_body(response).await;
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["fileName"], "orders.csv");

    assert_eq!(h.publisher.sent_to("jsonQueue").len(), 1);
    assert_eq!(h.archiver.written().len(), 1);
}

#[tokio::test]
async fn accepted_upload_is_archived_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = FilegateConfig::default();
    pipeline.archive.directory = dir.path().join("outputs");

    let publisher = Arc::new(MemoryPublisher::new());
    let dispatcher = Dispatcher::from_config(&pipeline, publisher.clone(), Arc::new(FsArchiver));
    let state = ServerState::new(ServerConfig::default(), pipeline, dispatcher);
    let app = build_router(Arc::new(state));

    let response = app
        .oneshot(upload("orders.csv", Some("text/csv"), "id,qty\n1,2\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(publisher.sent_to("jsonQueue").len(), 1);

    let files: Vec<_> = std::fs::read_dir(dir.path().join("outputs"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("orders.csv-") && name.ends_with(".yaml"), "{name}");
    let content = std::fs::read_to_string(&files[0]).unwrap();
    assert!(content.starts_with("format: csv"), "{content}");
}

#[tokio::test]
async fn padded_content_type_is_415() {
    let h = harness();
    let response = h
        .app
        .oneshot(upload("a.json", Some(" application/json"), "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(h.publisher.sent().is_empty());
    assert!(h.archiver.written().is_empty());
}

#[tokio::test]
async fn request_id_header_is_reused() {
    let h = harness();
    let mut request = upload("a.json", Some("application/json"), "{\"a\":1}");
    request
        .headers_mut()
        .insert("x-request-id", "req-42".parse().unwrap());

    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-42");
    let body = json_body(response).await;
    assert_eq!(body["requestId"], "req-42");
}

#[tokio::test]
async fn malformed_body_is_still_accepted() {
    let h = harness();
    let response = h
        .app
        .oneshot(upload("orders.csv", Some("text/csv"), "a,b\n1\n"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "accepted");

    let dead = h.publisher.sent_to("deadLetterQueue");
    assert_eq!(dead.len(), 1);
    assert!(dead[0].header("errFileName").unwrap().starts_with("orders-"));
    assert!(h.publisher.sent_to("jsonQueue").is_empty());
    assert_eq!(h.archiver.written().len(), 1);
}

#[tokio::test]
async fn unsupported_content_type_is_415() {
    let h = harness();
    let response = h
        .app
        .oneshot(upload("blob.bin", Some("application/octet-stream"), "xyz"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNSUPPORTED_MEDIA_TYPE");
    assert!(h.publisher.sent().is_empty());
    assert!(h.archiver.written().is_empty());
}

#[tokio::test]
async fn missing_content_type_is_415() {
    let h = harness();
    let response = h
        .app
        .oneshot(upload("orders.csv", None, "id\n1\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn path_like_file_name_is_400() {
    let h = harness();
    let response = h
        .app
        .oneshot(upload("a%2Fb.csv", Some("text/csv"), "id\n1\n"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "INGEST_ERROR");
    assert!(h.publisher.sent().is_empty());
}

#[tokio::test]
async fn oversized_body_is_413() {
    let mut pipeline = FilegateConfig::default();
    pipeline.ingest.max_payload_bytes = Some(8);
    let h = harness_with(
        MemoryPublisher::new(),
        MemoryArchiver::new(),
        pipeline,
        ServerConfig::default(),
    );

    let response = h
        .app
        .oneshot(upload("orders.csv", Some("text/csv"), "id\n1\n2\n3\n4\n"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        json_body(response).await["error"]["code"],
        "PAYLOAD_TOO_LARGE"
    );
}

#[tokio::test]
async fn broker_failure_is_502_after_archiving() {
    let h = harness_with(
        MemoryPublisher::refusing("connection reset"),
        MemoryArchiver::new(),
        FilegateConfig::default(),
        ServerConfig::default(),
    );

    let response = h
        .app
        .oneshot(upload("orders.csv", Some("text/csv"), "id\n1\n"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["error"]["code"], "TRANSPORT_ERROR");
    assert_eq!(h.archiver.written().len(), 1);
}

#[tokio::test]
async fn storage_failure_is_500() {
    let h = harness_with(
        MemoryPublisher::new(),
        MemoryArchiver::refusing("disk full"),
        FilegateConfig::default(),
        ServerConfig::default(),
    );

    let response = h
        .app
        .oneshot(upload("orders.csv", Some("text/csv"), "id\n1\n"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"]["code"], "STORAGE_ERROR");
    assert_eq!(h.publisher.sent().len(), 1);
}

#[tokio::test]
async fn health_is_always_ok() {
    let h = harness();
    let response = h.app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn ready_follows_the_publisher() {
    let ready = harness().app.oneshot(get("/ready")).await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
    assert_eq!(json_body(ready).await["components"]["broker"], "ready");

    let down = harness_with(
        MemoryPublisher::refusing("down"),
        MemoryArchiver::new(),
        FilegateConfig::default(),
        ServerConfig::default(),
    );
    let response = down.app.oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn metrics_without_recorder_is_404() {
    let h = harness();
    let response = h.app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn root_reports_rest_component() {
    let config = ServerConfig {
        rest_component: "axum-test".into(),
        ..ServerConfig::default()
    };
    let h = harness_with(
        MemoryPublisher::new(),
        MemoryArchiver::new(),
        FilegateConfig::default(),
        config,
    );
    let response = h.app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["name"], "filegate");
    assert_eq!(body["rest_component"], "axum-test");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let h = harness();
    let response = h.app.oneshot(get("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn get_on_upload_route_is_rejected() {
    let h = harness();
    let response = h.app.oneshot(get("/file/orders.csv")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
