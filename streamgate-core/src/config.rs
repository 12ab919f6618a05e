//! Centralized configuration for Streamgate.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::time::Duration;

/// Central configuration for all Streamgate components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct StreamgateConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listening socket binds to
    pub bind_address: String,
    /// Listening port
    pub port: u16,
    /// Base URL under which stream links are reachable by clients.
    /// Used only for startup reporting; the core never builds user URLs.
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            public_base_url: "http://localhost:8080".to_string(),
        }
    }
}

/// Media backend interaction configuration.
///
/// Bounds every suspend point against the backend so a hung lookup or
/// chunk fetch cannot leak sessions indefinitely.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Timeout for resolving object metadata
    pub lookup_timeout: Duration,
    /// Timeout for opening a chunk stream
    pub open_timeout: Duration,
    /// Timeout for each individual chunk fetch while a body is streaming
    pub chunk_timeout: Duration,
    /// Preferred chunk size for backends that let us choose one
    pub chunk_size: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_secs(10),
            open_timeout: Duration::from_secs(10),
            chunk_timeout: Duration::from_secs(30),
            chunk_size: 1024 * 1024, // 1 MiB
        }
    }
}

impl StreamgateConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(bind) = std::env::var("STREAMGATE_BIND") {
            config.server.bind_address = bind;
        }

        if let Ok(port) = std::env::var("STREAMGATE_PORT")
            && let Ok(port) = port.parse::<u16>()
        {
            config.server.port = port;
        }

        if let Ok(url) = std::env::var("STREAMGATE_PUBLIC_BASE_URL") {
            config.server.public_base_url = url;
        }

        if let Ok(timeout) = std::env::var("STREAMGATE_LOOKUP_TIMEOUT")
            && let Ok(seconds) = timeout.parse::<u64>()
        {
            config.backend.lookup_timeout = Duration::from_secs(seconds);
            config.backend.open_timeout = Duration::from_secs(seconds);
        }

        if let Ok(timeout) = std::env::var("STREAMGATE_CHUNK_TIMEOUT")
            && let Ok(seconds) = timeout.parse::<u64>()
        {
            config.backend.chunk_timeout = Duration::from_secs(seconds);
        }

        if let Ok(size) = std::env::var("STREAMGATE_CHUNK_SIZE")
            && let Ok(bytes) = size.parse::<usize>()
            && bytes > 0
        {
            config.backend.chunk_size = bytes;
        }

        config
    }

    /// Creates a configuration optimized for testing.
    pub fn for_testing() -> Self {
        Self {
            backend: BackendConfig {
                lookup_timeout: Duration::from_millis(500),
                open_timeout: Duration::from_millis(500),
                chunk_timeout: Duration::from_millis(500),
                chunk_size: 4096,
            },
            ..Default::default()
        }
    }
}
