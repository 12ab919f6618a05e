//! HTTP response framing for stream sessions.
//!
//! Computes status code and headers from object metadata and the resolved
//! byte range. Header emission must never fail: any value that cannot be
//! represented falls back to a generic default instead of aborting the
//! request.

use std::borrow::Cow;

use axum::http::{HeaderMap, HeaderValue, StatusCode, header};

use crate::backend::MediaObject;
use crate::streaming::range::ByteRange;

/// CORS headers attached to every `/stream` response.
///
/// The consuming web front end is cross-origin by design, so the origin is
/// always wildcarded.
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Range, Content-Type"),
    );
    headers
}

/// Builds status and headers for a stream response.
///
/// Partial responses get status 206 and a `Content-Range`; full responses
/// get 200. `Content-Length` always reflects the resolved range, which the
/// pump enforces exactly on the body.
pub fn build_stream_headers(
    object: &MediaObject,
    range: ByteRange,
    is_partial: bool,
) -> (StatusCode, HeaderMap) {
    let mut headers = cors_headers();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&object.mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static(MediaObject::DEFAULT_MIME_TYPE)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(range.length()));
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition(&object.file_name),
    );
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    if is_partial {
        headers.insert(
            header::CONTENT_RANGE,
            HeaderValue::from_str(&format!(
                "bytes {}-{}/{}",
                range.start, range.end, object.total_size
            ))
            .unwrap_or_else(|_| HeaderValue::from_static("bytes */0")),
        );
    }

    let status = if is_partial {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    (status, headers)
}

/// Renders an `inline` content disposition with a transport-safe file name.
///
/// Non-ASCII, spaces and quotes are percent-encoded; an empty or otherwise
/// unrepresentable name falls back to the generic default.
fn content_disposition(file_name: &str) -> HeaderValue {
    let safe: Cow<'_, str> = if file_name.is_empty() {
        Cow::Borrowed(MediaObject::DEFAULT_FILE_NAME)
    } else {
        urlencoding::encode(file_name)
    };

    HeaderValue::from_str(&format!("inline; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("inline; filename=\"video.mp4\""))
}

#[cfg(test)]
mod tests {
    use crate::backend::MediaKind;

    use super::*;

    fn test_object() -> MediaObject {
        MediaObject::with_metadata(
            1,
            1,
            1000,
            MediaKind::Video,
            Some("video/webm".to_string()),
            Some("movie.webm".to_string()),
        )
    }

    #[test]
    fn test_full_response_framing() {
        let object = test_object();
        let range = ByteRange { start: 0, end: 999 };
        let (status, headers) = build_stream_headers(&object, range, false);

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "video/webm");
        assert_eq!(headers.get(header::CONTENT_LENGTH).unwrap(), "1000");
        assert_eq!(headers.get(header::ACCEPT_RANGES).unwrap(), "bytes");
        assert!(headers.get(header::CONTENT_RANGE).is_none());
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[test]
    fn test_partial_response_framing() {
        let object = test_object();
        let range = ByteRange {
            start: 100,
            end: 199,
        };
        let (status, headers) = build_stream_headers(&object, range, true);

        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(headers.get(header::CONTENT_LENGTH).unwrap(), "100");
        assert_eq!(
            headers.get(header::CONTENT_RANGE).unwrap(),
            "bytes 100-199/1000"
        );
    }

    #[test]
    fn test_disposition_encodes_unsafe_names() {
        let mut object = test_object();
        object.file_name = "my movie \"final\" ü.mp4".to_string();
        let (_, headers) = build_stream_headers(&object, ByteRange { start: 0, end: 999 }, false);

        let disposition = headers
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("inline; filename=\""));
        // No raw spaces, quotes or non-ASCII may survive inside the name
        let inner = &disposition["inline; filename=\"".len()..disposition.len() - 1];
        assert!(inner.is_ascii());
        assert!(!inner.contains(' '));
        assert!(!inner.contains('"'));
    }

    #[test]
    fn test_disposition_empty_name_falls_back() {
        let mut object = test_object();
        object.file_name = String::new();
        let (_, headers) = build_stream_headers(&object, ByteRange { start: 0, end: 999 }, false);

        assert_eq!(
            headers.get(header::CONTENT_DISPOSITION).unwrap(),
            "inline; filename=\"video.mp4\""
        );
    }

    #[test]
    fn test_invalid_mime_type_falls_back() {
        let mut object = test_object();
        object.mime_type = "video/\nmp4".to_string();
        let (_, headers) = build_stream_headers(&object, ByteRange { start: 0, end: 999 }, false);

        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "video/mp4");
    }
}
