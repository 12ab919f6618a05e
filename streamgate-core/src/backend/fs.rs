//! Filesystem-backed media backend.
//!
//! Serves the files of a local media directory as container 1, which makes
//! the server runnable end to end without a remote messaging backend. Files
//! are assigned object ids in name order at scan time; ranges are read in
//! bounded chunks so no file is ever fully materialized in memory.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use super::{BackendError, ChunkStream, MediaBackend, MediaKind, MediaObject};

#[derive(Debug, Clone)]
struct FsEntry {
    object: MediaObject,
    path: Arc<PathBuf>,
}

/// Media backend mapping object ids to files under a local directory.
pub struct FsBackend {
    entries: HashMap<i64, FsEntry>,
    chunk_size: usize,
}

impl FsBackend {
    /// All filesystem objects live in this single container.
    pub const CONTAINER_ID: i64 = 1;

    const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

    /// Scans `root` and builds the object table, ids assigned in name order
    /// starting at 1.
    ///
    /// # Errors
    ///
    /// - `BackendError::Io` - Directory or file metadata could not be read
    pub async fn scan(root: impl AsRef<Path>) -> Result<Self, BackendError> {
        Self::scan_with_chunk_size(root, Self::DEFAULT_CHUNK_SIZE).await
    }

    /// Scans `root`, reading ranges in chunks of the given size.
    pub async fn scan_with_chunk_size(
        root: impl AsRef<Path>,
        chunk_size: usize,
    ) -> Result<Self, BackendError> {
        assert!(chunk_size > 0, "chunk size must be non-zero");

        let mut paths = Vec::new();
        let mut dir = fs::read_dir(root.as_ref()).await?;
        while let Some(dir_entry) = dir.next_entry().await? {
            if dir_entry.file_type().await?.is_file() {
                paths.push(dir_entry.path());
            }
        }
        paths.sort();

        let mut entries = HashMap::new();
        for (index, path) in paths.into_iter().enumerate() {
            let object_id = index as i64 + 1;
            let total_size = fs::metadata(&path).await?.len();
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string);
            let mime_type = mime_guess::from_path(&path)
                .first()
                .map(|m| m.essence_str().to_string());
            let kind = kind_for_mime(mime_type.as_deref());

            debug!(
                object_id,
                size = total_size,
                path = %path.display(),
                "registered media file"
            );

            entries.insert(
                object_id,
                FsEntry {
                    object: MediaObject::with_metadata(
                        Self::CONTAINER_ID,
                        object_id,
                        total_size,
                        kind,
                        mime_type,
                        file_name,
                    ),
                    path: Arc::new(path),
                },
            );
        }

        Ok(Self {
            entries,
            chunk_size,
        })
    }

    /// All registered objects, ordered by object id.
    pub fn objects(&self) -> Vec<MediaObject> {
        let mut objects: Vec<_> = self
            .entries
            .values()
            .map(|entry| entry.object.clone())
            .collect();
        objects.sort_by_key(|o| o.object_id);
        objects
    }
}

fn kind_for_mime(mime_type: Option<&str>) -> MediaKind {
    match mime_type {
        Some(m) if m.starts_with("video/") => MediaKind::Video,
        Some(m) if m.starts_with("audio/") => MediaKind::Audio,
        _ => MediaKind::Document,
    }
}

#[async_trait]
impl MediaBackend for FsBackend {
    async fn resolve(
        &self,
        container_id: i64,
        object_id: i64,
    ) -> Result<MediaObject, BackendError> {
        if container_id != Self::CONTAINER_ID {
            return Err(BackendError::NotFound {
                container_id,
                object_id,
            });
        }
        self.entries
            .get(&object_id)
            .map(|entry| entry.object.clone())
            .ok_or(BackendError::NotFound {
                container_id,
                object_id,
            })
    }

    async fn open_chunk_stream(
        &self,
        object: &MediaObject,
        offset: u64,
        length: u64,
    ) -> Result<ChunkStream, BackendError> {
        let entry = self
            .entries
            .get(&object.object_id)
            .ok_or(BackendError::NotFound {
                container_id: object.container_id,
                object_id: object.object_id,
            })?;

        let total_size = entry.object.total_size;
        if offset + length > total_size {
            return Err(BackendError::InvalidRange {
                offset,
                length,
                total_size,
            });
        }

        let mut file = fs::File::open(entry.path.as_ref()).await?;
        file.seek(SeekFrom::Start(offset)).await?;

        let chunk_size = self.chunk_size;
        let stream = stream::try_unfold((file, length), move |(mut file, remaining)| async move {
            if remaining == 0 {
                return Ok(None);
            }
            let take = chunk_size.min(remaining as usize);
            let mut buf = vec![0u8; take];
            // The file size is fixed at scan time; hitting EOF early means
            // the file changed underneath us and counts as a transport fault.
            file.read_exact(&mut buf).await?;
            Ok(Some((Bytes::from(buf), (file, remaining - take as u64))))
        });

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;

    async fn backend_with_file(name: &str, data: &[u8]) -> (tempfile::TempDir, FsBackend) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(name), data).unwrap();
        let backend = FsBackend::scan_with_chunk_size(dir.path(), 32).await.unwrap();
        (dir, backend)
    }

    #[tokio::test]
    async fn test_scan_assigns_ids_and_metadata() {
        let data: Vec<u8> = (0..200).map(|i| (i % 256) as u8).collect();
        let (_dir, backend) = backend_with_file("clip.mp4", &data).await;

        let objects = backend.objects();
        assert_eq!(objects.len(), 1);

        let object = backend.resolve(FsBackend::CONTAINER_ID, 1).await.unwrap();
        assert_eq!(object.total_size, 200);
        assert_eq!(object.mime_type, "video/mp4");
        assert_eq!(object.file_name, "clip.mp4");
        assert_eq!(object.kind, MediaKind::Video);
    }

    #[tokio::test]
    async fn test_read_range_in_chunks() {
        let data: Vec<u8> = (0..200).map(|i| (i % 256) as u8).collect();
        let (_dir, backend) = backend_with_file("clip.mp4", &data).await;
        let object = backend.resolve(FsBackend::CONTAINER_ID, 1).await.unwrap();

        let stream = backend.open_chunk_stream(&object, 50, 100).await.unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(joined, &data[50..150]);
        // 100 bytes in 32-byte chunks
        assert_eq!(chunks.len(), 4);
    }

    #[tokio::test]
    async fn test_wrong_container_is_not_found() {
        let (_dir, backend) = backend_with_file("clip.mp4", b"abc").await;
        let result = backend.resolve(2, 1).await;
        assert!(matches!(result, Err(BackendError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_non_media_file_is_document() {
        let (_dir, backend) = backend_with_file("notes.txt", b"hello").await;
        let object = backend.resolve(FsBackend::CONTAINER_ID, 1).await.unwrap();
        assert_eq!(object.kind, MediaKind::Document);
    }
}
