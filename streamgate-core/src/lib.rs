//! Streamgate Core - Range-aware streaming over remote media backends
//!
//! This crate provides the fundamental building blocks for exposing media
//! objects held in a remote messaging backend as HTTP-seekable resources:
//! the backend abstraction, HTTP range parsing, partial-content response
//! framing, the chunk pump, and configuration management.

pub mod backend;
pub mod config;
pub mod streaming;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use backend::{BackendError, ChunkStream, MediaBackend, MediaKind, MediaObject};
pub use config::StreamgateConfig;
pub use streaming::{ByteRange, RangeError, StreamOutcome, StreamPump};
