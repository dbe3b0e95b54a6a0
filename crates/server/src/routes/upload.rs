use crate::error::{ServerError, ServerResult};
use crate::middleware::RequestId;
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::{Extension, Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use filegate::DispatchReport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of a `200 OK` upload response.
///
/// Returned for converted and for dead-lettered uploads alike.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub status: String,
    pub file_name: String,
    pub request_id: String,
}

/// `POST /file/{file_name}`
///
/// A missing `Content-Type` header is treated as the empty string and ends
/// up unsupported. The dispatch runs on its own task so a dropped connection
/// or the request timeout cannot cancel it halfway.
pub async fn upload_file(
    State(state): State<Arc<ServerState>>,
    Path(file_name): Path<String>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<impl IntoResponse> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let request = ingest::accept(&file_name, content_type, body, state.ingest_config())?
        .with_id(request_id.as_str());
    let file_name = request.file_name().to_string();
    let request_id = request.id().to_string();

    let dispatcher = Arc::clone(&state.dispatcher);
    let report = tokio::spawn(async move { dispatcher.dispatch(request).await })
        .await
        .map_err(|err| ServerError::Internal(format!("dispatch task failed: {err}")))??;

    match report {
        DispatchReport::Unsupported { content_type } => {
            Err(ServerError::UnsupportedMediaType(content_type))
        }
        DispatchReport::Delivered { .. } | DispatchReport::DeadLettered { .. } => {
            Ok(Json(UploadResponse {
                status: "accepted".to_string(),
                file_name,
                request_id,
            }))
        }
    }
}
