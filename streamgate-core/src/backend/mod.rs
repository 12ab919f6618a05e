//! Media backend abstraction.
//!
//! This module defines the contract between the streaming core and the
//! remote messaging backend holding the media. The design creates a deep
//! module boundary: the streaming logic only ever sees object metadata and
//! a lazy, finite, forward-only sequence of byte chunks, and stays entirely
//! decoupled from how the backend locates or transfers those bytes.

mod fs;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

pub use fs::FsBackend;
pub use memory::InMemoryBackend;

/// Lazy sequence of byte chunks for one stream session.
///
/// Chunk boundaries are backend-chosen; consumers must not assume a fixed
/// chunk size. The sum of chunk lengths equals the requested length unless
/// the stream fails partway, in which case an error item terminates it.
/// Restartable only by opening a new stream.
pub type ChunkStream = BoxStream<'static, Result<Bytes, BackendError>>;

/// Broad media classification of a resolved object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Document,
    /// Anything else the backend may hold (stickers, contacts, ...).
    /// Not streamable.
    Other,
}

impl MediaKind {
    /// Whether objects of this kind may be served over `/stream`.
    pub fn is_streamable(self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::Audio | MediaKind::Document)
    }
}

/// Metadata of a media object resolved from the backend.
///
/// Immutable once fully uploaded; resolved read-only per request and never
/// cached by the streaming core.
#[derive(Debug, Clone)]
pub struct MediaObject {
    pub container_id: i64,
    pub object_id: i64,
    /// Total size in bytes, fixed once known.
    pub total_size: u64,
    pub mime_type: String,
    /// Used only for the `Content-Disposition` header.
    pub file_name: String,
    pub kind: MediaKind,
}

impl MediaObject {
    /// Fallback MIME type when the backend reports none.
    pub const DEFAULT_MIME_TYPE: &'static str = "video/mp4";
    /// Fallback file name when the backend reports none.
    pub const DEFAULT_FILE_NAME: &'static str = "video.mp4";

    /// Creates an object with default media naming.
    pub fn new(container_id: i64, object_id: i64, total_size: u64, kind: MediaKind) -> Self {
        Self {
            container_id,
            object_id,
            total_size,
            mime_type: Self::DEFAULT_MIME_TYPE.to_string(),
            file_name: Self::DEFAULT_FILE_NAME.to_string(),
            kind,
        }
    }

    /// Creates an object from backend metadata, substituting defaults for
    /// absent MIME type or file name as lenient players expect.
    pub fn with_metadata(
        container_id: i64,
        object_id: i64,
        total_size: u64,
        kind: MediaKind,
        mime_type: Option<String>,
        file_name: Option<String>,
    ) -> Self {
        Self {
            container_id,
            object_id,
            total_size,
            mime_type: mime_type
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| Self::DEFAULT_MIME_TYPE.to_string()),
            file_name: file_name
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| Self::DEFAULT_FILE_NAME.to_string()),
            kind,
        }
    }
}

/// Errors that can occur when talking to a media backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No object exists under the given container/object identifiers.
    #[error("object {object_id} not found in container {container_id}")]
    NotFound { container_id: i64, object_id: i64 },

    /// The object resolved but carries no streamable media.
    #[error("object {object_id} has no streamable media")]
    NotStreamable { object_id: i64 },

    /// The requested byte range exceeds the object bounds.
    #[error("invalid range: offset {offset} + length {length} exceeds object size {total_size}")]
    InvalidRange {
        offset: u64,
        length: u64,
        total_size: u64,
    },

    /// Communication with the backend failed.
    #[error("backend transport failed: {reason}")]
    Transport { reason: String },

    /// An error occurred in the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Remote media backend consumed by the streaming core.
///
/// Implementations are the process-wide handle to the authenticated backend
/// session: read-shared across concurrent requests, never mutated per
/// request, injected into the stream handler rather than held as ambient
/// state.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Resolves object metadata by container/object identifier.
    ///
    /// # Errors
    ///
    /// - `BackendError::NotFound` - No such object
    /// - `BackendError::Transport` - Lookup failed
    async fn resolve(&self, container_id: i64, object_id: i64)
    -> Result<MediaObject, BackendError>;

    /// Opens a chunk stream covering `length` bytes starting at `offset`.
    ///
    /// The stream is lazy: no bytes are fetched until it is polled.
    ///
    /// # Errors
    ///
    /// - `BackendError::InvalidRange` - Range exceeds the object bounds
    /// - `BackendError::Transport` - Stream could not be opened
    async fn open_chunk_stream(
        &self,
        object: &MediaObject,
        offset: u64,
        length: u64,
    ) -> Result<ChunkStream, BackendError>;
}
