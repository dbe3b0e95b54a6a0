use std::sync::Arc;

use bytes::Bytes;
use filegate::{
    ConversionError, DispatchError, DispatchReport, Dispatcher, IngestConfig, IngestError,
    IngestRequest, MemoryArchiver, MemoryPublisher, PipelineSet, StorageError, TransportError,
};
use transform::{NormalizedRecord, PipelineKind, TransformError, XmlDocument};

fn request(file_name: &str, content_type: &str, body: &'static [u8]) -> IngestRequest {
    IngestRequest::new(
        file_name,
        content_type,
        Bytes::from_static(body),
        &IngestConfig::default(),
    )
    .expect("valid request")
}

#[tokio::test]
async fn transport_failure_still_archives_once() {
    let archiver = Arc::new(MemoryArchiver::new());
    let dispatcher = Dispatcher::new(
        Arc::new(MemoryPublisher::refusing("connection reset")),
        archiver.clone(),
    );

    let result = dispatcher
        .dispatch(request("orders.csv", "text/csv", b"id\n1\n"))
        .await;

    assert!(matches!(
        result,
        Err(DispatchError::Transport(TransportError::Publish { .. }))
    ));
    let written = archiver.written();
    assert_eq!(written.len(), 1);
    assert!(std::str::from_utf8(&written[0].1).unwrap().starts_with("format: csv"));
}

#[tokio::test]
async fn transport_failure_on_dead_letter_still_archives_trace() {
    let archiver = Arc::new(MemoryArchiver::new());
    let dispatcher = Dispatcher::new(
        Arc::new(MemoryPublisher::refusing("connection reset")),
        archiver.clone(),
    );

    let result = dispatcher
        .dispatch(request("orders.json", "application/json", b"{"))
        .await;

    assert!(matches!(result, Err(DispatchError::Transport(_))));
    let written = archiver.written();
    assert_eq!(written.len(), 1);
    assert!(std::str::from_utf8(&written[0].1).unwrap().contains("status: failed"));
}

#[tokio::test]
async fn storage_failure_happens_after_a_single_publish() {
    let publisher = Arc::new(MemoryPublisher::new());
    let dispatcher = Dispatcher::new(publisher.clone(), Arc::new(MemoryArchiver::refusing("disk full")));

    let result = dispatcher
        .dispatch(request("orders.csv", "text/csv", b"id\n1\n"))
        .await;

    assert!(matches!(
        result,
        Err(DispatchError::Storage(StorageError::Rejected(_)))
    ));
    assert_eq!(publisher.sent().len(), 1, "publish is not repeated");
}

#[tokio::test]
async fn transport_error_wins_when_both_sides_fail() {
    let dispatcher = Dispatcher::new(
        Arc::new(MemoryPublisher::refusing("broker down")),
        Arc::new(MemoryArchiver::refusing("disk full")),
    );

    let result = dispatcher
        .dispatch(request("a.json", "application/json", b"{}"))
        .await;

    assert!(matches!(result, Err(DispatchError::Transport(_))));
}

#[tokio::test]
async fn panicking_transformation_is_dead_lettered() {
    let publisher = Arc::new(MemoryPublisher::new());
    let archiver = Arc::new(MemoryArchiver::new());
    let pipelines = PipelineSet::default().with_xml_transformation(Arc::new(
        |_: XmlDocument| -> Result<NormalizedRecord, TransformError> {
            panic!("unexpected element layout")
        },
    ));
    let dispatcher = Dispatcher::new(publisher.clone(), archiver.clone()).with_pipelines(pipelines);

    let report = dispatcher
        .dispatch(request("orders.xml", "application/xml", b"<orders/>"))
        .await
        .unwrap();

    let DispatchReport::DeadLettered { cause, .. } = report else {
        panic!("expected dead letter, got {report:?}");
    };
    assert_eq!(
        cause,
        ConversionError::Panicked("unexpected element layout".into())
    );
    assert_eq!(publisher.sent_to("deadLetterQueue").len(), 1);
    assert_eq!(archiver.written().len(), 1);
}

#[tokio::test]
async fn deeply_nested_xml_is_dead_lettered() {
    let publisher = Arc::new(MemoryPublisher::new());
    let archiver = Arc::new(MemoryArchiver::new());
    let dispatcher = Dispatcher::new(publisher.clone(), archiver.clone());
    let body = format!("{}{}", "<a>".repeat(200_000), "</a>".repeat(200_000));
    let request = IngestRequest::new(
        "nested.xml",
        "application/xml",
        Bytes::from(body),
        &IngestConfig::default(),
    )
    .expect("valid request");

    let report = dispatcher.dispatch(request).await.unwrap();

    let DispatchReport::DeadLettered { pipeline, cause, .. } = report else {
        panic!("expected dead letter, got {report:?}");
    };
    assert_eq!(pipeline, PipelineKind::Xml);
    assert_eq!(cause.stage(), "parse");
    assert!(publisher.sent_to("jsonQueue").is_empty());
    assert_eq!(publisher.sent_to("deadLetterQueue").len(), 1);
    assert_eq!(archiver.written().len(), 1);
}

#[tokio::test]
async fn rejecting_transformation_is_dead_lettered() {
    let publisher = Arc::new(MemoryPublisher::new());
    let pipelines = PipelineSet::default().with_json_transformation(Arc::new(
        |_: Bytes| -> Result<NormalizedRecord, TransformError> {
            Err(TransformError::Rejected("missing order id".into()))
        },
    ));
    let dispatcher = Dispatcher::new(publisher.clone(), Arc::new(MemoryArchiver::new()))
        .with_pipelines(pipelines);

    let report = dispatcher
        .dispatch(request("order.json", "application/json", b"{}"))
        .await
        .unwrap();

    assert_eq!(report.pipeline(), PipelineKind::Json);
    let dead = publisher.sent_to("deadLetterQueue");
    assert_eq!(dead.len(), 1);
    assert!(dead[0].header("errCause").unwrap().contains("missing order id"));
}

#[test]
fn boundary_rejects_unsafe_file_names() {
    for name in ["", "../secret.csv", "a/b.csv", ".."] {
        let err = IngestRequest::new(name, "text/csv", Bytes::new(), &IngestConfig::default())
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidFileName(_)), "{name:?}");
        assert_eq!(err.http_status_code(), 400);
    }
}

#[test]
fn boundary_rejects_oversized_body() {
    let cfg = IngestConfig {
        max_payload_bytes: Some(4),
        ..IngestConfig::default()
    };
    let err = IngestRequest::new("a.csv", "text/csv", Bytes::from_static(b"12345"), &cfg)
        .unwrap_err();
    assert!(matches!(err, IngestError::PayloadTooLarge(_)));
    assert_eq!(err.http_status_code(), 413);
}
