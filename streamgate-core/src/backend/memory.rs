//! In-memory media backend for tests and simulation.
//!
//! Objects are registered with their raw bytes up front; chunk streams slice
//! the stored data at a configurable chunk size. A mid-stream failure can be
//! injected to exercise the post-header error path of the pump.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use tokio::sync::RwLock;

use super::{BackendError, ChunkStream, MediaBackend, MediaObject};

struct StoredObject {
    object: MediaObject,
    data: Bytes,
    /// Number of chunks delivered before an injected transport failure.
    fail_after_chunks: Option<usize>,
}

/// Media backend serving objects held entirely in memory.
pub struct InMemoryBackend {
    objects: RwLock<HashMap<(i64, i64), StoredObject>>,
    chunk_size: usize,
}

impl InMemoryBackend {
    const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

    pub fn new() -> Self {
        Self::with_chunk_size(Self::DEFAULT_CHUNK_SIZE)
    }

    /// Creates a backend that splits streams into chunks of the given size.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be non-zero");
        Self {
            objects: RwLock::new(HashMap::new()),
            chunk_size,
        }
    }

    /// Registers an object with its content.
    pub async fn add_object(&self, object: MediaObject, data: Bytes) {
        self.insert(object, data, None).await;
    }

    /// Registers an object whose chunk stream fails after delivering
    /// `fail_after_chunks` chunks.
    pub async fn add_failing_object(
        &self,
        object: MediaObject,
        data: Bytes,
        fail_after_chunks: usize,
    ) {
        self.insert(object, data, Some(fail_after_chunks)).await;
    }

    async fn insert(&self, object: MediaObject, data: Bytes, fail_after_chunks: Option<usize>) {
        let key = (object.container_id, object.object_id);
        self.objects.write().await.insert(
            key,
            StoredObject {
                object,
                data,
                fail_after_chunks,
            },
        );
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaBackend for InMemoryBackend {
    async fn resolve(
        &self,
        container_id: i64,
        object_id: i64,
    ) -> Result<MediaObject, BackendError> {
        let objects = self.objects.read().await;
        objects
            .get(&(container_id, object_id))
            .map(|stored| stored.object.clone())
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
        let objects = self.objects.read().await;
        let stored = objects
            .get(&(object.container_id, object.object_id))
            .ok_or(BackendError::NotFound {
                container_id: object.container_id,
                object_id: object.object_id,
            })?;

        let total_size = stored.data.len() as u64;
        if offset + length > total_size {
            return Err(BackendError::InvalidRange {
                offset,
                length,
                total_size,
            });
        }

        let window = stored
            .data
            .slice(offset as usize..(offset + length) as usize);
        let mut chunks: Vec<Result<Bytes, BackendError>> = (0..window.len())
            .step_by(self.chunk_size)
            .map(|start| {
                let end = (start + self.chunk_size).min(window.len());
                Ok(window.slice(start..end))
            })
            .collect();

        if let Some(fail_after) = stored.fail_after_chunks {
            chunks.truncate(fail_after);
            chunks.push(Err(BackendError::Transport {
                reason: "injected chunk failure".to_string(),
            }));
        }

        Ok(stream::iter(chunks).boxed())
    }
}
