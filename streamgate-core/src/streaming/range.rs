//! HTTP Range header parsing for media streaming.
//!
//! Implements the single-range subset of RFC 9110 `bytes=` ranges with a
//! deliberately lenient fallback: malformed headers degrade to the full
//! range instead of failing the request, so a broken player header never
//! aborts playback. Only a syntactically valid range that lies entirely
//! outside the object is rejected.

use thiserror::Error;

/// Validated, inclusive byte interval within an object.
///
/// Invariant: `start <= end < total_size` for the object it was parsed
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by the interval.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Errors distinct from the lenient-fallback path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    /// The range start lies beyond the last byte of the object.
    #[error("range start {start} is beyond object size {total_size}")]
    Unsatisfiable { start: u64, total_size: u64 },

    /// The object is empty, so no byte range exists at all.
    #[error("object is empty, no byte range is satisfiable")]
    EmptyObject,
}

/// Parses an optional `Range` header against a known total size.
///
/// Returns the resolved interval and whether the response should be partial
/// (206). Expects the form `bytes=<start>-<end>`; `<end>` may be omitted and
/// defaults to the last byte. Multi-range requests and any malformed input
/// degrade to the full range. The end is always clamped to the object.
///
/// # Errors
///
/// - `RangeError::Unsatisfiable` - Valid syntax but `start` is past the end
/// - `RangeError::EmptyObject` - `total_size` is zero
pub fn parse_range(
    header: Option<&str>,
    total_size: u64,
) -> Result<(ByteRange, bool), RangeError> {
    if total_size == 0 {
        return Err(RangeError::EmptyObject);
    }
    let last = total_size - 1;
    let full = (ByteRange { start: 0, end: last }, false);

    let Some(header) = header else {
        return Ok(full);
    };
    let header = header.trim();
    let Some(spec) = header.strip_prefix("bytes=") else {
        return Ok(full);
    };
    // Multi-range requests are unsupported and treated as absent.
    if spec.contains(',') {
        return Ok(full);
    }
    let Some((start_str, end_str)) = spec.split_once('-') else {
        return Ok(full);
    };
    let Ok(start) = start_str.trim().parse::<u64>() else {
        return Ok(full);
    };
    let end_str = end_str.trim();
    let end = if end_str.is_empty() {
        last
    } else {
        match end_str.parse::<u64>() {
            Ok(end) => end,
            Err(_) => return Ok(full),
        }
    };

    let end = end.min(last);
    if start > end {
        return Err(RangeError::Unsatisfiable { start, total_size });
    }

    Ok((ByteRange { start, end }, true))
}
