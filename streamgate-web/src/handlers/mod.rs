//! Request handlers for the Streamgate HTTP surface.

mod stream;

pub use stream::{liveness, stream_media, stream_preflight};
