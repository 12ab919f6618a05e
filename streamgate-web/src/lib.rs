//! Streamgate Web - HTTP surface for the streaming proxy
//!
//! Provides the axum router, app state and the stream handler that drives a
//! request through metadata resolution, range parsing, response framing and
//! body pumping.

pub mod handlers;
pub mod server;

pub use server::{AppState, router, run_server};
