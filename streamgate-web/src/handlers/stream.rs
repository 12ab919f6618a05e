//! Stream request orchestration.
//!
//! Drives a request through its session states: resolve object metadata,
//! parse and validate the range, frame the response, pump the body. Every
//! failure before headers commit maps to a clean HTTP status; failures after
//! that point are contained inside the pump and only logged.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use streamgate_core::backend::BackendError;
use streamgate_core::streaming::{
    RangeError, StreamPump, build_stream_headers, cors_headers, parse_range,
};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::server::AppState;

/// Plain-text liveness check.
pub async fn liveness() -> &'static str {
    "Streamgate media proxy running"
}

/// CORS preflight for the stream route.
pub async fn stream_preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    response.headers_mut().extend(cors_headers());
    response
}

/// Failures that occur before response headers are committed.
#[derive(Debug, thiserror::Error)]
enum StreamRequestError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("backend timed out during {phase}")]
    Timeout { phase: &'static str },
}

impl IntoResponse for StreamRequestError {
    fn into_response(self) -> Response {
        let mut response = match self {
            StreamRequestError::Backend(
                BackendError::NotFound { .. } | BackendError::NotStreamable { .. },
            ) => (StatusCode::NOT_FOUND, "File Not Found").into_response(),
            StreamRequestError::Backend(_) | StreamRequestError::Timeout { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
            StreamRequestError::Range(RangeError::Unsatisfiable { total_size, .. }) => {
                let mut response = StatusCode::RANGE_NOT_SATISFIABLE.into_response();
                response.headers_mut().insert(
                    header::CONTENT_RANGE,
                    HeaderValue::from_str(&format!("bytes */{total_size}"))
                        .unwrap_or_else(|_| HeaderValue::from_static("bytes */0")),
                );
                response
            }
            StreamRequestError::Range(RangeError::EmptyObject) => {
                StatusCode::NO_CONTENT.into_response()
            }
        };
        response.headers_mut().extend(cors_headers());
        response
    }
}

impl StreamRequestError {
    /// Whether the failure is a routine client-side condition rather than a
    /// backend fault.
    fn is_expected(&self) -> bool {
        matches!(
            self,
            StreamRequestError::Backend(
                BackendError::NotFound { .. } | BackendError::NotStreamable { .. }
            ) | StreamRequestError::Range(_)
        )
    }
}

/// `GET /stream/{container_id}/{object_id}` - range-aware media streaming.
pub async fn stream_media(
    State(state): State<AppState>,
    Path((container_id, object_id)): Path<(i64, i64)>,
    headers: HeaderMap,
) -> Response {
    match try_stream(&state, container_id, object_id, &headers).await {
        Ok(response) => response,
        Err(error) => {
            if error.is_expected() {
                debug!(container_id, object_id, %error, "stream request rejected");
            } else {
                warn!(container_id, object_id, %error, "stream request failed");
            }
            error.into_response()
        }
    }
}

async fn try_stream(
    state: &AppState,
    container_id: i64,
    object_id: i64,
    headers: &HeaderMap,
) -> Result<Response, StreamRequestError> {
    // RESOLVING: metadata lookup, bounded so a hung backend cannot leak the
    // session.
    let object = timeout(
        state.config.backend.lookup_timeout,
        state.backend.resolve(container_id, object_id),
    )
    .await
    .map_err(|_| StreamRequestError::Timeout {
        phase: "metadata lookup",
    })??;

    if !object.kind.is_streamable() {
        return Err(BackendError::NotStreamable { object_id }.into());
    }

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let (range, is_partial) = parse_range(range_header, object.total_size)?;

    let chunk_stream = timeout(
        state.config.backend.open_timeout,
        state
            .backend
            .open_chunk_stream(&object, range.start, range.length()),
    )
    .await
    .map_err(|_| StreamRequestError::Timeout {
        phase: "chunk stream open",
    })??;

    let (pump, _handle) = StreamPump::new_with_chunk_timeout(
        chunk_stream,
        range.length(),
        state.config.backend.chunk_timeout,
    );
    let (status, header_map) = build_stream_headers(&object, range, is_partial);

    debug!(
        container_id,
        object_id,
        start = range.start,
        end = range.end,
        partial = is_partial,
        "stream session started"
    );

    // HEADERS_SENT: from here on no status-code change is possible; the pump
    // owns all remaining failure handling.
    let mut response = (status, Body::from_stream(pump)).into_response();
    response.headers_mut().extend(header_map);
    Ok(response)
}
